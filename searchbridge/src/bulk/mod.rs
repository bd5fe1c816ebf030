//! Bulk executor
//!
//! Document operations queue up per execution context and leave in `_bulk`
//! requests, in queue order. Each queued operation gets a [`WorkHandle`]
//! that resolves with its own result: one rejected document never fails the
//! others of its batch.
//!
//! A flush sends everything queued when it starts, split into batches of at
//! most `max_items` operations and `max_bytes` payload. Operations queued
//! while a flush runs wait for the next one. Only one flush runs at a time
//! per executor.

mod failure;
mod handle;

pub use failure::{FailureHandler, LoggingFailureHandler};
pub use handle::WorkHandle;

use crate::config::BulkConfig;
use crate::metrics;
use crate::orchestrator::execute;
use crate::transport::Transport;
use crate::work::{BulkableWork, WorkFactory};
use crate::{Error, Result};
use handle::ResultSender;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

struct QueuedWork {
    work: Arc<dyn BulkableWork>,
    size: usize,
    sender: ResultSender,
}

#[derive(Default)]
struct PendingQueue {
    items: VecDeque<QueuedWork>,
    bytes: usize,
}

impl PendingQueue {
    fn push_back(&mut self, item: QueuedWork) {
        self.bytes += item.size;
        self.items.push_back(item);
    }

    /// Take up to `max_items` from the front, stopping before `max_bytes`
    /// would be exceeded. Always takes at least one item.
    fn drain_batch(&mut self, max_items: usize, max_bytes: usize) -> Vec<QueuedWork> {
        let mut batch = Vec::new();
        let mut bytes = 0;
        while batch.len() < max_items {
            let Some(next) = self.items.front() else {
                break;
            };
            if !batch.is_empty() && bytes + next.size > max_bytes {
                break;
            }
            if let Some(item) = self.items.pop_front() {
                bytes += item.size;
                self.bytes -= item.size;
                batch.push(item);
            }
        }
        batch
    }

    /// Put an unsent batch back in front, in its original order.
    fn requeue_front(&mut self, batch: Vec<QueuedWork>) {
        for item in batch.into_iter().rev() {
            self.bytes += item.size;
            self.items.push_front(item);
        }
    }
}

/// Outcome of one flush
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// `_bulk` requests sent
    pub batches: usize,
    pub items: usize,
    pub failures: usize,
    pub bytes: usize,
    pub elapsed: Duration,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    pub fn succeeded(&self) -> usize {
        self.items - self.failures
    }
}

pub struct BulkExecutor {
    transport: Arc<dyn Transport>,
    factory: WorkFactory,
    config: BulkConfig,
    failure_handler: Arc<dyn FailureHandler>,
    queue: Mutex<PendingQueue>,
    flusher: tokio::sync::Mutex<()>,
}

impl BulkExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        factory: WorkFactory,
        config: BulkConfig,
        failure_handler: Arc<dyn FailureHandler>,
    ) -> Self {
        Self {
            transport,
            factory,
            config,
            failure_handler,
            queue: Mutex::new(PendingQueue::default()),
            flusher: tokio::sync::Mutex::new(()),
        }
    }

    /// Queue an operation. The returned flag tells whether a threshold is
    /// reached and the caller should flush.
    pub fn enqueue(&self, work: Arc<dyn BulkableWork>) -> (WorkHandle, bool) {
        let (sender, handle) = WorkHandle::channel();
        let size = work.estimated_size();
        let mut queue = self.queue.lock();
        queue.push_back(QueuedWork { work, size, sender });
        let threshold_reached =
            queue.items.len() >= self.config.max_items || queue.bytes >= self.config.max_bytes;
        metrics::record_queue_depth(queue.items.len());
        (handle, threshold_reached)
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().items.len()
    }

    pub fn pending_bytes(&self) -> usize {
        self.queue.lock().bytes
    }

    /// Send everything queued so far. An empty queue sends nothing.
    ///
    /// On cancellation the batch in flight and everything after it go back
    /// to the queue unsent, their handles stay pending, and
    /// [`Error::Cancelled`] is returned.
    pub async fn flush(&self, cancel: Option<&CancellationToken>) -> Result<FlushReport> {
        let _flusher = self.flusher.lock().await;
        let start = Instant::now();
        let mut report = FlushReport::default();

        let mut remaining = self.queue.lock().items.len();
        while remaining > 0 {
            let batch = self
                .queue
                .lock()
                .drain_batch(remaining.min(self.config.max_items), self.config.max_bytes);
            if batch.is_empty() {
                break;
            }
            remaining -= batch.len();
            self.send_batch(batch, cancel, &mut report).await?;
        }

        report.elapsed = start.elapsed();
        if !report.is_empty() {
            tracing::debug!(
                "Flushed {} operations in {} batches ({} failed, {} bytes) in {:?}",
                report.items,
                report.batches,
                report.failures,
                report.bytes,
                report.elapsed
            );
        }
        metrics::record_queue_depth(self.pending());
        Ok(report)
    }

    async fn send_batch(
        &self,
        batch: Vec<QueuedWork>,
        cancel: Option<&CancellationToken>,
        report: &mut FlushReport,
    ) -> Result<()> {
        let start = Instant::now();
        let items = batch.len();
        let bytes: usize = batch.iter().map(|q| q.size).sum();
        let works = batch.iter().map(|q| q.work.clone()).collect();
        let bulk = self.factory.bulk(works, self.config.refresh);

        let mut failures = 0;
        match execute(self.transport.as_ref(), bulk, cancel).await {
            Err(Error::Cancelled) => {
                tracing::debug!("Flush cancelled; {} operations requeued", batch.len());
                self.queue.lock().requeue_front(batch);
                return Err(Error::Cancelled);
            }
            Err(e) => {
                tracing::warn!("Bulk request of {} operations failed: {}", items, e);
                failures = items;
                for queued in batch {
                    self.report_failure(queued.work.as_ref(), &e);
                    let _ = queued.sender.send(Err(e.duplicate()));
                }
            }
            Ok(result) => {
                if result.has_errors() {
                    tracing::debug!("Bulk response reports item errors");
                }
                for (position, queued) in batch.into_iter().enumerate() {
                    let outcome = result.extract(queued.work.as_ref(), position);
                    if let Err(e) = &outcome {
                        failures += 1;
                        self.report_failure(queued.work.as_ref(), e);
                    }
                    // The caller may have dropped its handle
                    let _ = queued.sender.send(outcome);
                }
            }
        }

        report.batches += 1;
        report.items += items;
        report.failures += failures;
        report.bytes += bytes;
        metrics::record_bulk_flush(items, bytes, failures, start.elapsed());
        Ok(())
    }

    fn report_failure(&self, work: &dyn BulkableWork, error: &Error) {
        let error_type = match error {
            Error::ItemFailure { error_type, .. } => error_type.as_str(),
            other => other.error_type(),
        };
        metrics::record_item_failure(error_type);
        self.failure_handler.handle_item_failure(work, error);
    }
}

impl Drop for BulkExecutor {
    fn drop(&mut self) {
        let pending = self.queue.get_mut().items.len();
        if pending > 0 {
            tracing::warn!(
                "Execution context dropped with {} unsent operations; their handles resolve as cancelled",
                pending
            );
        }
    }
}

impl std::fmt::Debug for BulkExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkExecutor")
            .field("config", &self.config)
            .field("pending", &self.pending())
            .finish()
    }
}
