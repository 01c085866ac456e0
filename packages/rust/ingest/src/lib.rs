//! Ingestion worker and sink for confeed.
//!
//! This crate provides:
//! - [`IngestSink`] — the collaborator accepting `(identifier, text)` pairs
//! - [`HttpIngestSink`] — sink posting JSON to an HTTP ingestion service
//! - [`SpaceIngestor`] — the linear source → hash → sink pass

pub mod sink;
pub mod worker;

pub use sink::{HttpIngestSink, IngestSink};
pub use worker::{IngestSummary, NoProgress, ProgressReporter, SpaceIngestor};
