//! Batch metadata fetch workers and pipeline wiring.
//!
//! Each [`BatchFetcher`] is one worker loop. Workers share the work-queue
//! receiver behind an async mutex and accumulate pulled items into a batch.
//! A batch is flushed when it reaches `batch_size`, when the work queue looks
//! momentarily empty (latency/throughput tradeoff, not a hard guarantee),
//! when the shutdown sentinel arrives, or when cancellation is observed.
//!
//! Simple items go to the server in one batch request; items whose section
//! needs child listings or whose kind may carry collection references are
//! fetched individually. Every pulled item produces exactly one outcome on
//! the result queue, either a document or a failure placeholder, so the
//! downstream writer never loses sequence accounting.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use reelsync_common::{Error, ItemId, Result};

use crate::config::SyncConfig;
use crate::transport::{MediaDocument, MediaTransport, TransportError};

use super::collections::CollectionResolver;
use super::queue::{ResultItem, ResultMessage, WorkItem, WorkMessage};

/// What a worker pulled off the work queue.
enum Pulled {
    /// An item, plus whether the queue looked empty right after the pop.
    Item(WorkItem, bool),
    Shutdown,
    Closed,
    Cancelled,
}

#[derive(Debug, PartialEq, Eq)]
enum FlushOutcome {
    Continue,
    /// Auth/overload from the server: stop this worker and tell the others.
    Abort,
}

/// One metadata fetch worker.
pub struct BatchFetcher {
    worker: usize,
    transport: Arc<dyn MediaTransport>,
    resolver: Arc<CollectionResolver>,
    work_tx: mpsc::Sender<WorkMessage>,
    work_rx: Arc<Mutex<mpsc::Receiver<WorkMessage>>>,
    result_tx: mpsc::Sender<ResultMessage>,
    cancel: CancellationToken,
    batch_size: usize,
}

impl BatchFetcher {
    /// Worker loop: pull, batch, flush, publish. Runs until the shutdown
    /// sentinel, cancellation, a fatal server rejection, or queue closure.
    pub async fn run(self) {
        debug!(worker = self.worker, "Metadata fetch worker started");

        let mut batch: Vec<WorkItem> = Vec::new();
        loop {
            let pulled = {
                let mut rx = self.work_rx.lock().await;
                tokio::select! {
                    _ = self.cancel.cancelled() => Pulled::Cancelled,
                    message = rx.recv() => match message {
                        Some(WorkMessage::Item(item)) => {
                            let queue_empty = rx.is_empty();
                            Pulled::Item(item, queue_empty)
                        }
                        Some(WorkMessage::Shutdown) => Pulled::Shutdown,
                        None => Pulled::Closed,
                    },
                }
            };

            match pulled {
                Pulled::Item(item, queue_empty) => {
                    batch.push(item);
                    if batch.len() >= self.batch_size || queue_empty {
                        if self.flush(&mut batch).await == FlushOutcome::Abort {
                            self.broadcast_shutdown().await;
                            break;
                        }
                    }
                }
                Pulled::Shutdown => {
                    let _ = self.flush(&mut batch).await;
                    self.broadcast_shutdown().await;
                    break;
                }
                Pulled::Closed => {
                    let _ = self.flush(&mut batch).await;
                    break;
                }
                Pulled::Cancelled => {
                    // Flush drains the buffered items with their sequence
                    // accounting intact before the worker honors cancellation.
                    let _ = self.flush(&mut batch).await;
                    debug!(worker = self.worker, "Metadata fetch worker cancelled");
                    break;
                }
            }
        }

        debug!(worker = self.worker, "Metadata fetch worker stopped");
    }

    /// Routing rule, evaluated per item before batching.
    ///
    /// An item is complex iff its section needs child listings or its
    /// section's item kind may carry collection references. Routing is by
    /// section flags alone: a simple item that happens to carry a collection
    /// reference is intentionally left unenriched.
    fn is_complex(item: &WorkItem) -> bool {
        item.section.fetch_children || item.section.item_kind.may_have_collections()
    }

    /// Process the accumulated batch: simple items via one batch request,
    /// complex items individually.
    async fn flush(&self, batch: &mut Vec<WorkItem>) -> FlushOutcome {
        if batch.is_empty() {
            return FlushOutcome::Continue;
        }

        let items = std::mem::take(batch);
        let (complex, simple): (Vec<WorkItem>, Vec<WorkItem>) =
            items.into_iter().partition(Self::is_complex);

        if self.process_batch(simple).await == FlushOutcome::Abort {
            self.skip_all(complex).await;
            return FlushOutcome::Abort;
        }

        let mut remaining = complex.into_iter();
        while let Some(item) = remaining.next() {
            if self.process_single(item).await == FlushOutcome::Abort {
                self.skip_all(remaining.collect()).await;
                return FlushOutcome::Abort;
            }
        }

        FlushOutcome::Continue
    }

    /// Batch path: one transport call for all simple items.
    async fn process_batch(&self, simple: Vec<WorkItem>) -> FlushOutcome {
        if simple.is_empty() {
            return FlushOutcome::Continue;
        }
        if self.cancel.is_cancelled() {
            self.skip_all(simple).await;
            return FlushOutcome::Continue;
        }

        let ids: Vec<ItemId> = simple.iter().map(|item| item.item_id).collect();
        debug!(worker = self.worker, count = ids.len(), "Batch-loading metadata");

        match self.transport.fetch_batch(&ids, self.batch_size).await {
            Ok(documents) => {
                let mut by_id: HashMap<ItemId, MediaDocument> =
                    documents.into_iter().map(|doc| (doc.id, doc)).collect();

                for item in simple {
                    if self.cancel.is_cancelled() {
                        self.skip_item(item).await;
                        continue;
                    }
                    match by_id.remove(&item.item_id) {
                        Some(document) => {
                            let section = item.section.clone();
                            self.emit(item.sequence, ResultItem::completed(document, section))
                                .await;
                        }
                        None => {
                            error!(
                                item_id = %item.item_id,
                                "Could not get metadata, skipping item"
                            );
                            self.skip_item(item).await;
                        }
                    }
                }
                FlushOutcome::Continue
            }
            Err(TransportError::Unauthorized) => {
                error!(
                    worker = self.worker,
                    "Server rejected batch metadata request, cancelling section sync"
                );
                self.skip_all(simple).await;
                FlushOutcome::Abort
            }
            Err(e) => {
                error!(worker = self.worker, error = %e, "Batch metadata request failed");
                self.skip_all(simple).await;
                FlushOutcome::Continue
            }
        }
    }

    /// Individual path for complex items: full document, then collection and
    /// child enrichment.
    async fn process_single(&self, item: WorkItem) -> FlushOutcome {
        if self.cancel.is_cancelled() {
            self.skip_item(item).await;
            return FlushOutcome::Continue;
        }

        let document = match self.transport.fetch_one(item.item_id).await {
            Ok(document) => document,
            Err(TransportError::NotFound(_)) => {
                error!(item_id = %item.item_id, "Could not get metadata, skipping item");
                self.skip_item(item).await;
                return FlushOutcome::Continue;
            }
            Err(TransportError::Unauthorized) => {
                error!(
                    item_id = %item.item_id,
                    "Server rejected metadata request, cancelling section sync"
                );
                self.skip_item(item).await;
                return FlushOutcome::Abort;
            }
            Err(e) => {
                error!(item_id = %item.item_id, error = %e, "Could not get metadata, skipping item");
                self.skip_item(item).await;
                return FlushOutcome::Continue;
            }
        };

        let mut collections = None;
        if item.section.item_kind.may_have_collections() && document.has_collections() {
            collections = self
                .resolver
                .resolve(&item.section, &document, &self.cancel)
                .await;
        }

        let mut children = None;
        if item.section.fetch_children {
            if self.cancel.is_cancelled() {
                self.skip_item(item).await;
                return FlushOutcome::Continue;
            }
            match self.transport.fetch_children(item.item_id).await {
                Ok(list) if !list.is_empty() => children = Some(list),
                Ok(_) => {
                    error!(item_id = %item.item_id, "Empty child listing, skipping item");
                    self.skip_item(item).await;
                    return FlushOutcome::Continue;
                }
                Err(e) => {
                    error!(
                        item_id = %item.item_id,
                        error = %e,
                        "Could not get children, skipping item"
                    );
                    self.skip_item(item).await;
                    return FlushOutcome::Continue;
                }
            }
        }

        let WorkItem {
            sequence, section, ..
        } = item;
        self.emit(
            sequence,
            ResultItem {
                document: Some(document),
                children,
                collections,
                section,
            },
        )
        .await;
        FlushOutcome::Continue
    }

    /// Emit a failure placeholder for `item` and flag its section.
    async fn skip_item(&self, item: WorkItem) {
        let WorkItem {
            sequence, section, ..
        } = item;
        section.mark_sync_failed();
        self.emit(sequence, ResultItem::skipped(section)).await;
    }

    async fn skip_all(&self, items: Vec<WorkItem>) {
        for item in items {
            self.skip_item(item).await;
        }
    }

    async fn emit(&self, sequence: u64, result: ResultItem) {
        if self
            .result_tx
            .send(ResultMessage::Outcome(sequence, result))
            .await
            .is_err()
        {
            warn!(sequence, "Result queue closed, dropping outcome");
        }
    }

    /// Re-enqueue the shutdown sentinel so sibling workers observe it too.
    async fn broadcast_shutdown(&self) {
        let _ = self.work_tx.send(WorkMessage::Shutdown).await;
    }
}

/// Handle to a running metadata fetch pipeline.
///
/// [`start`](Self::start) wires both queues, spawns the fetch workers, and
/// hands back the result receiver. Submit work via
/// [`submit`](Self::submit), then either call [`shutdown`](Self::shutdown)
/// to let the workers drain and exit, or trigger the cancellation token.
/// After the last worker exits, exactly one [`ResultMessage::Shutdown`] is
/// emitted on the result queue.
pub struct SyncPipeline {
    work_tx: mpsc::Sender<WorkMessage>,
}

impl SyncPipeline {
    /// Start the pipeline with `config.worker_count` fetch workers.
    pub fn start(
        transport: Arc<dyn MediaTransport>,
        config: &SyncConfig,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<ResultMessage>) {
        let (work_tx, work_rx) = mpsc::channel(config.work_queue_capacity.max(1));
        let (result_tx, result_rx) = mpsc::channel(config.result_queue_capacity.max(1));
        let work_rx = Arc::new(Mutex::new(work_rx));
        let resolver = Arc::new(CollectionResolver::new(transport.clone()));

        let mut handles = Vec::with_capacity(config.worker_count.max(1));
        for worker in 0..config.worker_count.max(1) {
            let fetcher = BatchFetcher {
                worker,
                transport: transport.clone(),
                resolver: resolver.clone(),
                work_tx: work_tx.clone(),
                work_rx: work_rx.clone(),
                result_tx: result_tx.clone(),
                cancel: cancel.clone(),
                batch_size: config.batch_size.max(1),
            };
            handles.push(tokio::spawn(fetcher.run()));
        }

        info!(
            workers = handles.len(),
            batch_size = config.batch_size,
            "Metadata fetch pipeline started"
        );

        tokio::spawn(async move {
            for handle in handles {
                let _ = handle.await;
            }
            let _ = result_tx.send(ResultMessage::Shutdown).await;
            info!("Metadata fetch pipeline drained");
        });

        (Self { work_tx }, result_rx)
    }

    /// Submit one work item to the pipeline.
    pub async fn submit(&self, item: WorkItem) -> Result<()> {
        self.work_tx
            .send(WorkMessage::Item(item))
            .await
            .map_err(|_| Error::pipeline_closed("work queue"))
    }

    /// Place the shutdown sentinel on the work queue. Workers flush their
    /// partial batches, propagate the sentinel to each other, and exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.work_tx
            .send(WorkMessage::Shutdown)
            .await
            .map_err(|_| Error::pipeline_closed("work queue"))
    }
}
