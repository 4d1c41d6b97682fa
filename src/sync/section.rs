//! Per-section sync context shared across fetch workers.

use std::sync::atomic::{AtomicBool, Ordering};

use reelsync_common::{ItemKind, SectionId};

/// Sync context for one library section.
///
/// Created at the start of a section's sync pass, shared as an
/// `Arc<SectionContext>` by every work item of that section, and discarded
/// when the pass ends. All fields except the success flag are fixed at
/// creation; the lazily resolved collection state lives in
/// [`CollectionResolver`](super::CollectionResolver).
#[derive(Debug)]
pub struct SectionContext {
    /// Section key on the remote server.
    pub section_id: SectionId,
    /// Kind of items this section holds.
    pub item_kind: ItemKind,
    /// Whether items of this section need their child listing fetched
    /// (e.g. seasons of a show).
    pub fetch_children: bool,
    /// One-way flag: starts `true`, flipped to `false` on the first per-item
    /// failure and never back. Racing writers are benign.
    sync_successful: AtomicBool,
}

impl SectionContext {
    /// Create a context for one section sync pass.
    pub fn new(section_id: SectionId, item_kind: ItemKind, fetch_children: bool) -> Self {
        Self {
            section_id,
            item_kind,
            fetch_children,
            sync_successful: AtomicBool::new(true),
        }
    }

    /// Whether every item of this section has synced cleanly so far.
    pub fn sync_successful(&self) -> bool {
        self.sync_successful.load(Ordering::Relaxed)
    }

    /// Record that at least one item of this section failed to sync.
    pub fn mark_sync_failed(&self) {
        self.sync_successful.store(false, Ordering::Relaxed);
    }
}
