//! Trait definition and types for the remote metadata transport.
//!
//! This module defines the [`MediaTransport`] trait that transport backends
//! must implement, along with the document types returned by transport calls.
//! The pipeline only ever talks to the remote media server through this seam,
//! so tests can substitute a stub and the HTTP backend stays swappable.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use reelsync_common::{ItemId, ItemKind, SectionId};

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A reference from an item to a collection/set it belongs to.
///
/// The remote server identifies collections within a section by a small
/// per-section `index`; resolving the index to full collection metadata is a
/// separate fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    /// Per-section collection index.
    pub index: u32,
    /// Display title of the collection.
    pub title: String,
}

/// Full metadata for a single library item as returned by the remote server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDocument {
    /// Server-assigned rating key.
    pub id: ItemId,
    /// Kind of item (movie, show, episode, ...).
    pub kind: ItemKind,
    /// Display title.
    pub title: String,
    /// Section the item belongs to, when the server reports one.
    pub section_id: Option<SectionId>,
    /// Collection/set references carried by this item.
    #[serde(default)]
    pub collection_refs: Vec<CollectionRef>,
    /// Remaining item attributes, passed through verbatim for the downstream
    /// writer.
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl MediaDocument {
    /// Whether this document declares any collection/set references.
    #[must_use]
    pub fn has_collections(&self) -> bool {
        !self.collection_refs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a metadata transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server has no item with this rating key.
    #[error("item {0} not found on the server")]
    NotFound(ItemId),

    /// The server rejected the request outright (HTTP 401/429). The server is
    /// either refusing our token or shedding load; callers treat this as
    /// fatal for the current sync pass.
    #[error("server rejected the request (unauthorized or overloaded)")]
    Unauthorized,

    /// The response arrived but is missing the expected structure.
    #[error("malformed server response: {0}")]
    Malformed(String),

    /// The request could not be completed (connection, timeout, unexpected
    /// status).
    #[error("http error: {0}")]
    Http(String),
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Async trait for fetching metadata from the remote media server.
///
/// Implementations are expected to be wrapped in an `Arc` and shared across
/// fetch workers. Connection/read timeouts and any retry policy live inside
/// the implementation; the pipeline never retries on its own.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Fetch the full metadata document for a single item.
    async fn fetch_one(&self, id: ItemId) -> Result<MediaDocument, TransportError>;

    /// Fetch metadata documents for up to `max_batch_size` items in one
    /// request. Items the server does not know are simply absent from the
    /// returned list, not an error.
    async fn fetch_batch(
        &self,
        ids: &[ItemId],
        max_batch_size: usize,
    ) -> Result<Vec<MediaDocument>, TransportError>;

    /// Fetch the direct children of an item (e.g. all episodes of a show).
    async fn fetch_children(&self, id: ItemId) -> Result<Vec<MediaDocument>, TransportError>;

    /// Fetch the collection index of a section: `(index, rating key)` pairs
    /// for every collection defined in the section.
    async fn fetch_collection_index(
        &self,
        section_id: SectionId,
    ) -> Result<Vec<(u32, ItemId)>, TransportError>;

    /// Fetch the full metadata document for a collection.
    async fn fetch_collection(&self, id: ItemId) -> Result<MediaDocument, TransportError>;
}
