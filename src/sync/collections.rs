//! Collection/set resolution with per-section memoization.
//!
//! Resolving a collection reference takes two lookups on the remote server:
//! the section's collection index (index → rating key), then the full
//! collection document. Both are memoized per section so a collection shared
//! by many movies is fetched once per sync pass.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use reelsync_common::{ItemId, SectionId};

use crate::transport::{MediaDocument, MediaTransport};

use super::section::SectionContext;

#[derive(Default)]
struct SectionCollections {
    /// `(index, rating key)` pairs for the section, fetched on first need.
    index: Option<Vec<(u32, ItemId)>>,
    /// Resolved collection documents keyed by collection index.
    resolved: HashMap<u32, MediaDocument>,
}

/// Resolves collection references to full collection metadata.
///
/// All resolution state sits behind one lock shared across every section:
/// resolution is rare and short, so serializing attempts through a single
/// coarse lock keeps duplicate fetches impossible without per-section lock
/// bookkeeping. Built once per sync pass and dropped with it, taking the
/// memoized state along.
pub struct CollectionResolver {
    transport: Arc<dyn MediaTransport>,
    state: Mutex<HashMap<SectionId, SectionCollections>>,
}

impl CollectionResolver {
    /// Create a resolver for one sync pass.
    pub fn new(transport: Arc<dyn MediaTransport>) -> Self {
        Self {
            transport,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the collection references carried by `document`.
    ///
    /// Returns `None` when the section's collection index could not be
    /// fetched, otherwise a map of whatever references could be resolved.
    /// Failures here never fail the item: unknown indexes and malformed
    /// collection documents are logged and skipped.
    pub async fn resolve(
        &self,
        section: &SectionContext,
        document: &MediaDocument,
        cancel: &CancellationToken,
    ) -> Option<HashMap<u32, MediaDocument>> {
        let mut state = self.state.lock().await;
        let entry = state.entry(section.section_id).or_default();

        if entry.index.is_none() {
            match self
                .transport
                .fetch_collection_index(section.section_id)
                .await
            {
                Ok(pairs) => {
                    debug!(
                        section_id = %section.section_id,
                        collections = pairs.len(),
                        "Fetched collection index"
                    );
                    entry.index = Some(pairs);
                }
                Err(e) => {
                    error!(
                        section_id = %section.section_id,
                        error = %e,
                        "Could not download collection index"
                    );
                    return None;
                }
            }
        }

        let mut resolved_refs = HashMap::new();
        for coll in &document.collection_refs {
            if cancel.is_cancelled() {
                break;
            }

            if !entry.resolved.contains_key(&coll.index) {
                let collection_id = entry.index.as_ref().and_then(|pairs| {
                    pairs
                        .iter()
                        .find(|(index, _)| *index == coll.index)
                        .map(|(_, id)| *id)
                });
                let Some(collection_id) = collection_id else {
                    error!(
                        index = coll.index,
                        title = %coll.title,
                        "Collection missing from section index"
                    );
                    continue;
                };

                match self.transport.fetch_collection(collection_id).await {
                    Ok(doc) => {
                        entry.resolved.insert(coll.index, doc);
                    }
                    Err(e) => {
                        error!(
                            collection_id = %collection_id,
                            title = %coll.title,
                            error = %e,
                            "Could not get collection metadata"
                        );
                        continue;
                    }
                }
            }

            if let Some(doc) = entry.resolved.get(&coll.index) {
                resolved_refs.insert(coll.index, doc.clone());
            }
        }

        Some(resolved_refs)
    }
}
