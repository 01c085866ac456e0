//! Shared types, error model, and configuration for confeed.
//!
//! This crate is the foundation depended on by the other confeed crates.
//! It provides:
//! - [`ConfeedError`] — the unified error type
//! - Domain types ([`Document`], [`DocId`], [`LoadOptions`])
//! - The [`ContentSource`] seam implemented by the Confluence client
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, IngestConfig, RetrievalConfig, config_dir, config_file_path, load_config,
    load_config_from,
};
pub use error::{ConfeedError, Result};
pub use types::{ContentSource, DocId, Document, LoadOptions};
