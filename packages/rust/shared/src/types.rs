//! Core domain types for confeed ingestion runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::Result;

// ---------------------------------------------------------------------------
// DocId
// ---------------------------------------------------------------------------

/// Content-addressed document identifier: the SHA-1 digest of the document's
/// UTF-8 text, as 40 lowercase hex characters.
///
/// This is a pure function of content. Identical text always yields the same
/// identifier, which is what makes re-runs idempotent at the ingestion layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Compute the identifier for a document's text content.
    pub fn from_content(text: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A single retrieved document (a Confluence page or a text attachment).
///
/// Documents live only for the duration of one ingestion pass and are never
/// mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Where the document came from (page URL or attachment download URL).
    pub source: String,
    /// Title of the owning page or attachment file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Plain-text content. Hashed to derive the [`DocId`].
    pub content: String,
    /// When the document was retrieved.
    pub fetched_at: DateTime<Utc>,
}

impl Document {
    /// Identifier derived from this document's content.
    pub fn doc_id(&self) -> DocId {
        DocId::from_content(&self.content)
    }
}

// ---------------------------------------------------------------------------
// LoadOptions / ContentSource
// ---------------------------------------------------------------------------

/// Retrieval options passed to a [`ContentSource`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Whether to also download text attachments of each page.
    pub include_attachments: bool,
    /// Page-listing batch size per request.
    pub limit: u32,
    /// Ceiling on the total number of pages retrieved in one pass.
    pub max_pages: u32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            include_attachments: true,
            limit: 50,
            max_pages: 100_000,
        }
    }
}

/// A source of documents for a named space.
///
/// The ingestor takes an already-authenticated source so tests can substitute
/// an in-memory fake without network access.
pub trait ContentSource {
    /// Retrieve all documents of `space_key`, in the source's return order.
    ///
    /// An empty space yields `Ok(vec![])`, not an error.
    fn load(
        &self,
        space_key: &str,
        opts: &LoadOptions,
    ) -> impl std::future::Future<Output = Result<Vec<Document>>> + Send;
}
