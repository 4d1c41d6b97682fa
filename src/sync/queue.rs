//! Work-queue and result-queue message types.
//!
//! Both queues are bounded `tokio::sync::mpsc` channels. The work queue
//! carries an explicit [`WorkMessage::Shutdown`] sentinel instead of closing
//! the channel, so a worker that observes it can re-enqueue it for its
//! siblings before exiting.

use std::collections::HashMap;
use std::sync::Arc;

use reelsync_common::ItemId;

use crate::transport::MediaDocument;

use super::section::SectionContext;

/// One unit of work: fetch metadata for `item_id`.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Position in the original enumeration; unique per sync pass. Carried
    /// through to the result queue so the downstream writer can restore the
    /// original order.
    pub sequence: u64,
    /// Rating key of the item to fetch.
    pub item_id: ItemId,
    /// Sync context of the section this item belongs to.
    pub section: Arc<SectionContext>,
}

impl WorkItem {
    /// Create a work item at the given enumeration position.
    pub fn new(sequence: u64, item_id: ItemId, section: Arc<SectionContext>) -> Self {
        Self {
            sequence,
            item_id,
            section,
        }
    }
}

/// Message on the work queue.
#[derive(Debug, Clone)]
pub enum WorkMessage {
    /// An item to fetch.
    Item(WorkItem),
    /// Shutdown sentinel. The worker that pops it re-enqueues it so every
    /// sibling worker also observes it and exits.
    Shutdown,
}

/// Outcome of one work item.
#[derive(Debug, Clone)]
pub struct ResultItem {
    /// The fetched document, or `None` for a failure placeholder.
    pub document: Option<MediaDocument>,
    /// Child listing, when the section asked for children.
    pub children: Option<Vec<MediaDocument>>,
    /// Resolved collection documents keyed by collection index, when the
    /// item referenced collections.
    pub collections: Option<HashMap<u32, MediaDocument>>,
    /// Sync context of the section this item belongs to.
    pub section: Arc<SectionContext>,
}

impl ResultItem {
    /// A successfully fetched document without enrichment.
    pub fn completed(document: MediaDocument, section: Arc<SectionContext>) -> Self {
        Self {
            document: Some(document),
            children: None,
            collections: None,
            section,
        }
    }

    /// A failure placeholder keeping the item's sequence slot occupied.
    pub fn skipped(section: Arc<SectionContext>) -> Self {
        Self {
            document: None,
            children: None,
            collections: None,
            section,
        }
    }

    /// Whether this outcome is a failure placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.document.is_none()
    }
}

/// Message on the result queue.
#[derive(Debug, Clone)]
pub enum ResultMessage {
    /// Outcome for the work item with this sequence number.
    Outcome(u64, ResultItem),
    /// Terminal sentinel: all workers have exited and no further outcomes
    /// will arrive.
    Shutdown,
}
