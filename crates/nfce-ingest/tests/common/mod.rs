//! Shared test utilities for nfce-ingest integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs over a temporary base and destination tree
//! - Builders for NFC-e documents, archives and configurations

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
