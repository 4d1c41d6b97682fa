//! The metadata-fetch pipeline.
//!
//! Turns a stream of item identifiers into enriched metadata documents.
//! Worker tasks drain a shared work queue, batch simple items into one
//! transport request each, route complex items (children, collections)
//! through individual fetches, and publish every outcome (real document or
//! failure placeholder) onto a result queue tagged with the item's original
//! sequence number.

mod collections;
mod fetcher;
mod queue;
mod section;

pub use collections::CollectionResolver;
pub use fetcher::{BatchFetcher, SyncPipeline};
pub use queue::{ResultItem, ResultMessage, WorkItem, WorkMessage};
pub use section::SectionContext;
