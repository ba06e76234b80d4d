//! End-to-end ingestion: archive in intake -> documents in the destination tree.

mod common;

use common::{ArchiveBuilder, DocumentBuilder, TestHarness};
use nfce_ingest::JobOutcome;

#[test]
fn single_tenant_archive_lands_in_tenant_directory() {
    let harness = TestHarness::with_tenants(&[("ACME", "123456789"), ("Beta", "555")]);
    let archive = harness.drop_archive(
        "NFCE_XML_20240101.zip",
        ArchiveBuilder::new()
            .document("NFCE_1.xml", DocumentBuilder::issued("123456789", "2024-01-01"))
            .document("NFCE_2.xml", DocumentBuilder::issued("123456789", "2024-01-02"))
            .document("NFCE_3.xml", DocumentBuilder::issued("123456789", "2024-01-03")),
    );

    let outcome = harness.ingest(&archive).unwrap();

    let expected = harness
        .dest_dir
        .join("ACME_123456789/20240101_20240103_123456789");
    assert_eq!(
        outcome,
        JobOutcome::Completed {
            destination: expected.clone()
        }
    );
    assert_eq!(
        TestHarness::children(&expected),
        vec!["NFCE_1.xml", "NFCE_2.xml", "NFCE_3.xml"]
    );
    assert!(!archive.exists());
    assert!(harness.pending_jobs().is_empty());
    assert!(TestHarness::children(&harness.failed()).is_empty());
}

#[test]
fn mixed_tenants_go_to_error_bucket() {
    let harness = TestHarness::with_tenants(&[("ACME", "123456789"), ("Beta", "987654321")]);
    let archive = harness.drop_archive(
        "NFCE_XML_20240101.zip",
        ArchiveBuilder::new()
            .document("NFCE_1.xml", DocumentBuilder::issued("123456789", "2024-01-01"))
            .document("NFCE_2.xml", DocumentBuilder::issued("123456789", "2024-01-02"))
            .document("NFCE_3.xml", DocumentBuilder::issued("123456789", "2024-01-03"))
            .document("NFCE_4.xml", DocumentBuilder::issued("987654321", "2024-01-02")),
    );

    harness.ingest(&archive).unwrap();

    assert_eq!(
        TestHarness::children(&harness.bucket()),
        vec!["ERR_20240101_20240103_123456789_987654321"]
    );
    assert!(TestHarness::children(&harness.dest_dir.join("ACME_123456789")).is_empty());
    assert!(TestHarness::children(&harness.dest_dir.join("Beta_987654321")).is_empty());
}

#[test]
fn archive_without_documents_is_quarantined() {
    let harness = TestHarness::new();
    let archive = harness.drop_archive(
        "NFCE_XML_empty.zip",
        ArchiveBuilder::new().entry("readme.txt", "no documents"),
    );

    let outcome = harness.ingest(&archive).unwrap();

    let (reason, quarantined) = match outcome {
        JobOutcome::Failed {
            reason,
            quarantined: Some(quarantined),
        } => (reason, quarantined),
        other => panic!("Expected quarantined failure, got {:?}", other),
    };
    assert_eq!(reason, "nenhum_xml_encontrado");
    let job_id = quarantined.file_name().unwrap().to_str().unwrap().to_string();
    assert_eq!(harness.failed_reason(&job_id), "nenhum_xml_encontrado");
    assert!(quarantined.join("NFCE_XML_empty.zip").is_file());
    assert!(archive.exists(), "failed originals stay in intake");
}

#[test]
fn unknown_tenant_goes_to_error_bucket() {
    let harness = TestHarness::with_tenants(&[("ACME", "1")]);
    let archive = harness.drop_archive(
        "NFCE_XML_x.zip",
        ArchiveBuilder::new().document("NFCE_1.xml", DocumentBuilder::issued("2", "2024-03-10")),
    );

    harness.ingest(&archive).unwrap();

    assert_eq!(
        TestHarness::children(&harness.bucket()),
        vec!["20240310_20240310_2"]
    );
}

#[test]
fn documents_without_data_use_sentinels() {
    let harness = TestHarness::with_tenants(&[("ACME", "77")]);
    let archive = harness.drop_archive(
        "NFCE_XML_s.zip",
        ArchiveBuilder::new()
            .document("NFCE_1.xml", DocumentBuilder::new().tenant("77"))
            .document("NFCE_2.xml", DocumentBuilder::new().d_emi("2024-02-01")),
    );

    let outcome = harness.ingest(&archive).unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Completed {
            destination: harness.dest_dir.join("ACME_77/20240201_20240201_77"),
        }
    );

    let only_dates = harness.drop_archive(
        "NFCE_XML_t.zip",
        ArchiveBuilder::new().document("NFCE_1.xml", DocumentBuilder::new().d_emi("2024-02-02")),
    );
    harness.ingest(&only_dates).unwrap();
    assert!(harness.bucket().join("20240202_20240202_SEM_IE").is_dir());
}

#[test]
fn colliding_entry_names_are_all_kept() {
    let harness = TestHarness::with_tenants(&[("ACME", "9")]);
    let archive = harness.drop_archive(
        "NFCE_XML_c.zip",
        ArchiveBuilder::new()
            .document("loja1/NFCE_1.xml", DocumentBuilder::issued("9", "2024-04-01"))
            .document("loja2/NFCE_1.xml", DocumentBuilder::issued("9", "2024-04-02"))
            .entry("loja2/image.png", [0u8, 1, 2]),
    );

    harness.ingest(&archive).unwrap();

    let destination = harness.dest_dir.join("ACME_9/20240401_20240402_9");
    assert_eq!(
        TestHarness::children(&destination),
        vec!["NFCE_1.xml", "NFCE_1_2.xml"]
    );
}

#[test]
fn same_canonical_name_replaces_tenant_result() {
    let harness = TestHarness::with_tenants(&[("ACME", "5")]);
    let first = harness.drop_archive(
        "NFCE_XML_a.zip",
        ArchiveBuilder::new()
            .document("NFCE_1.xml", DocumentBuilder::issued("5", "2024-05-01"))
            .document("NFCE_2.xml", DocumentBuilder::issued("5", "2024-05-01")),
    );
    harness.ingest(&first).unwrap();

    let second = harness.drop_archive(
        "NFCE_XML_b.zip",
        ArchiveBuilder::new().document("NFCE_9.xml", DocumentBuilder::issued("5", "2024-05-01")),
    );
    harness.ingest(&second).unwrap();

    let destination = harness.dest_dir.join("ACME_5/20240501_20240501_5");
    assert_eq!(TestHarness::children(&destination), vec!["NFCE_9.xml"]);
    assert_eq!(
        TestHarness::children(&harness.dest_dir.join("ACME_5")),
        vec!["20240501_20240501_5"]
    );
}

#[test]
fn repeated_error_names_get_numbered() {
    let harness = TestHarness::new();
    for name in ["NFCE_XML_1.zip", "NFCE_XML_2.zip", "NFCE_XML_3.zip"] {
        let archive = harness.drop_archive(
            name,
            ArchiveBuilder::new()
                .document("NFCE_1.xml", DocumentBuilder::issued("1", "2024-01-01"))
                .document("NFCE_2.xml", DocumentBuilder::issued("2", "2024-01-01")),
        );
        harness.ingest(&archive).unwrap();
    }

    assert_eq!(
        TestHarness::children(&harness.bucket()),
        vec![
            "ERR_20240101_20240101_1_2",
            "ERR_20240101_20240101_1_2 (1)",
            "ERR_20240101_20240101_1_2 (2)",
        ]
    );
}

#[test]
fn corrupt_archive_is_quarantined() {
    let harness = TestHarness::new();
    let archive = harness.incoming().join("NFCE_XML_bad.zip");
    std::fs::write(&archive, b"PK\x03\x04 truncated").unwrap();

    let outcome = harness.ingest(&archive).unwrap();

    assert!(matches!(outcome, JobOutcome::Failed { ref reason, .. } if reason == "zip_invalido"));
    assert_eq!(TestHarness::children(&harness.failed()).len(), 1);
}

#[test]
fn unaccepted_names_never_become_jobs() {
    let harness = TestHarness::new();
    for name in ["nfce_xml_lower.zip", "NFCE_XML_1.rar", "OTHER.zip"] {
        let path = harness.drop_archive(
            name,
            ArchiveBuilder::new().document("NFCE_1.xml", DocumentBuilder::issued("1", "2024-01-01")),
        );
        assert!(harness.ingest(&path).is_none());
        assert!(path.exists());
    }
    assert!(harness.pending_jobs().is_empty());
    assert!(TestHarness::children(&harness.failed()).is_empty());
}

#[test]
fn tenant_id_with_path_components_stays_inside_destination() {
    let harness = TestHarness::with_tenants(&[("ACME", "1")]);
    let outside_name = format!(
        "escaped_{}",
        harness.temp_path().file_name().unwrap().to_string_lossy()
    );
    let outside = harness.temp_path().parent().unwrap().join(&outside_name);
    let archive = harness.drop_archive(
        "NFCE_XML_evil.zip",
        ArchiveBuilder::new().document(
            "NFCE_1.xml",
            DocumentBuilder::issued(&format!("1/../../../../{}", outside_name), "2024-01-01"),
        ),
    );

    let outcome = harness.ingest(&archive).unwrap();

    let expected = harness.bucket().join("20240101_20240101_SEM_IE");
    assert_eq!(
        outcome,
        JobOutcome::Completed {
            destination: expected.clone()
        }
    );
    assert!(expected.join("NFCE_1.xml").is_file());
    assert!(!outside.exists());
    assert!(TestHarness::children(&harness.dest_dir.join("ACME_1")).is_empty());
}
