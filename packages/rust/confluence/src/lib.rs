//! Confluence Cloud content source for confeed.
//!
//! This crate provides:
//! - [`ConfluenceClient`] — an authenticated REST client implementing
//!   [`confeed_shared::ContentSource`]
//! - [`text`] — deterministic plain-text extraction from storage-format HTML

pub mod client;
pub mod text;

pub use client::{ConfluenceClient, ConfluenceConfig};
pub use text::storage_to_text;
