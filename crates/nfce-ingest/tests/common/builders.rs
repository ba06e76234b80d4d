//! Builders for test archives, documents and configurations.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use nfce_ingest::config::{Config, DEFAULT_NAMESPACE};

/// Builder for a single NFC-e XML document.
pub struct DocumentBuilder {
    tenant_id: Option<String>,
    dh_emi: Option<String>,
    d_emi: Option<String>,
    namespace: String,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            tenant_id: None,
            dh_emi: None,
            d_emi: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Document of `tenant_id` issued on `date` (`YYYY-MM-DD`) at 10:00 local time.
    pub fn issued(tenant_id: &str, date: &str) -> Self {
        Self::new()
            .tenant(tenant_id)
            .dh_emi(&format!("{}T10:00:00-03:00", date))
    }

    pub fn tenant(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.to_string());
        self
    }

    pub fn dh_emi(mut self, value: &str) -> Self {
        self.dh_emi = Some(value.to_string());
        self
    }

    pub fn d_emi(mut self, value: &str) -> Self {
        self.d_emi = Some(value.to_string());
        self
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn build(&self) -> String {
        let mut ide = String::from("<cUF>25</cUF><mod>65</mod>");
        if let Some(dh) = &self.dh_emi {
            ide.push_str(&format!("<dhEmi>{}</dhEmi>", dh));
        }
        if let Some(d) = &self.d_emi {
            ide.push_str(&format!("<dEmi>{}</dEmi>", d));
        }
        let emit = match &self.tenant_id {
            Some(ie) => format!("<CNPJ>00000000000191</CNPJ><IE>{}</IE>", ie),
            None => "<CNPJ>00000000000191</CNPJ>".to_string(),
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<nfeProc xmlns="{ns}" versao="4.00">
  <NFe>
    <infNFe Id="NFe25240100000000000191650010000000011000000010" versao="4.00">
      <ide>{ide}</ide>
      <emit>{emit}</emit>
      <dest><IE>000000000</IE></dest>
    </infNFe>
  </NFe>
</nfeProc>
"#,
            ns = self.namespace,
            ide = ide,
            emit = emit
        )
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a zip archive.
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self { entries: vec![] }
    }

    /// Adds an entry with arbitrary content.
    pub fn entry(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_string(), content.as_ref().to_vec()));
        self
    }

    /// Adds a document entry.
    pub fn document(self, name: &str, document: DocumentBuilder) -> Self {
        let xml = document.build();
        self.entry(name, xml)
    }

    pub fn write_to(&self, path: &Path) {
        let file = std::fs::File::create(path).expect("Failed to create archive");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in &self.entries {
            writer
                .start_file(name.as_str(), options)
                .expect("Failed to start entry");
            writer.write_all(content).expect("Failed to write entry");
        }
        writer.finish().expect("Failed to finish archive");
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Config` instances rooted in test directories.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(base: &Path, destination: &Path) -> Self {
        let mut config = Config::new(base, destination);
        config.watch.settle_delay_ms = 0;
        config.watch.poll_interval_secs = 1;
        config.watch.debounce_ms = 100;
        Self { config }
    }

    pub fn archive_prefix(mut self, prefix: &str) -> Self {
        self.config.archive_prefix = prefix.to_string();
        self
    }

    pub fn error_bucket(mut self, bucket: &str) -> Self {
        self.config.error_bucket = bucket.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
