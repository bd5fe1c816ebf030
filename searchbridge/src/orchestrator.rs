//! Work orchestration
//!
//! Non-bulk works are sent immediately through [`execute`]. Document writes
//! go through an [`ExecutionContext`], which owns one bulk queue: writes
//! queued in one context reach the engine in queue order, with no ordering
//! promised across contexts.

use crate::bulk::{BulkExecutor, FailureHandler, FlushReport, LoggingFailureHandler, WorkHandle};
use crate::config::BulkConfig;
use crate::dialect::Dialect;
use crate::metrics::RequestTimer;
use crate::transport::Transport;
use crate::work::{BulkableWork, Work};
use crate::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Send one work and decode its response.
///
/// Returns [`Error::Cancelled`] without waiting for the answer once `cancel`
/// fires; a token cancelled beforehand prevents the request from being sent.
pub async fn execute<W: Work>(
    transport: &dyn Transport,
    work: W,
    cancel: Option<&CancellationToken>,
) -> Result<W::Output> {
    let kind = work.kind();
    let request = work.request();
    tracing::debug!("Sending {} ({})", request, kind);

    let timer = RequestTimer::new(kind.as_str());
    let sent = match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => {
                timer.error(Error::Cancelled.error_type());
                return Err(Error::Cancelled);
            }
            response = transport.send(&request) => response,
        },
        None => transport.send(&request).await,
    };

    let result = sent.map_err(Error::from).and_then(|response| {
        tracing::trace!("{} answered with status {}", kind, response.status);
        work.handle_response(response)
    });
    match &result {
        Ok(_) => timer.success(),
        Err(e) => timer.error(e.error_type()),
    }
    result
}

/// Entry point for sending works against one cluster with one dialect.
#[derive(Clone)]
pub struct WorkOrchestrator {
    transport: Arc<dyn Transport>,
    dialect: Arc<Dialect>,
    bulk: BulkConfig,
    failure_handler: Arc<dyn FailureHandler>,
    shutdown: CancellationToken,
}

impl WorkOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, dialect: Arc<Dialect>, bulk: BulkConfig) -> Self {
        Self {
            transport,
            dialect,
            bulk,
            failure_handler: Arc::new(LoggingFailureHandler),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.failure_handler = handler;
        self
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn bulk_config(&self) -> &BulkConfig {
        &self.bulk
    }

    /// Token cancelled when the orchestrator shuts down
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Cancel every in-flight request sent through this orchestrator
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Send a non-bulk work immediately
    pub async fn submit<W: Work>(&self, work: W) -> Result<W::Output> {
        execute(self.transport.as_ref(), work, Some(&self.shutdown)).await
    }

    /// Send a non-bulk work, giving up when `cancel` fires
    pub async fn submit_with<W: Work>(&self, work: W, cancel: &CancellationToken) -> Result<W::Output> {
        execute(self.transport.as_ref(), work, Some(cancel)).await
    }

    /// A new execution context with its own bulk queue
    pub fn create_context(&self) -> ExecutionContext {
        ExecutionContext {
            orchestrator: self.clone(),
            executor: Arc::new(BulkExecutor::new(
                self.transport.clone(),
                self.dialect.work_factory().clone(),
                self.bulk.clone(),
                self.failure_handler.clone(),
            )),
        }
    }
}

impl std::fmt::Debug for WorkOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkOrchestrator")
            .field("dialect", &self.dialect.kind())
            .field("bulk", &self.bulk)
            .finish()
    }
}

/// One unit of work: a bulk queue plus immediate submission.
///
/// Clones share the same queue, so several tasks may feed one context.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    orchestrator: WorkOrchestrator,
    executor: Arc<BulkExecutor>,
}

impl ExecutionContext {
    pub fn dialect(&self) -> &Arc<Dialect> {
        self.orchestrator.dialect()
    }

    /// Send a non-bulk work immediately, bypassing the queue
    pub async fn submit<W: Work>(&self, work: W) -> Result<W::Output> {
        self.orchestrator.submit(work).await
    }

    /// Queue a document operation.
    ///
    /// When the queue reaches a size threshold it is flushed right here, on
    /// the caller's task, before the handle is returned. Fails with
    /// [`Error::Cancelled`] without queueing anything once the orchestrator
    /// is shut down.
    ///
    /// Once queued, the operation is always handed back: if the threshold
    /// flush is cancelled the operation stays queued and its handle reports
    /// whatever a later flush does with it.
    pub async fn enqueue<B: BulkableWork + 'static>(&self, work: B) -> Result<WorkHandle> {
        self.enqueue_shared(Arc::new(work)).await
    }

    pub async fn enqueue_shared(&self, work: Arc<dyn BulkableWork>) -> Result<WorkHandle> {
        if self.orchestrator.shutdown_token().is_cancelled() {
            return Err(Error::Cancelled);
        }
        let (handle, threshold_reached) = self.executor.enqueue(work);
        if threshold_reached {
            if let Err(e) = self.flush().await {
                tracing::debug!(
                    "Threshold flush stopped ({}); {} operations stay queued",
                    e,
                    self.pending()
                );
            }
        }
        Ok(handle)
    }

    pub async fn flush(&self) -> Result<FlushReport> {
        self.executor
            .flush(Some(self.orchestrator.shutdown_token()))
            .await
    }

    /// Flush, giving up when `cancel` fires; unsent operations stay queued
    pub async fn flush_with(&self, cancel: &CancellationToken) -> Result<FlushReport> {
        self.executor.flush(Some(cancel)).await
    }

    /// Make everything written through this context visible to searches.
    ///
    /// Queued operations are flushed first, since a refresh cannot cover
    /// writes that were never sent.
    pub async fn refresh(&self, indexes: &[String]) -> Result<FlushReport> {
        let report = self.flush().await?;
        self.submit(self.dialect().work_factory().refresh(indexes))
            .await?;
        Ok(report)
    }

    pub fn pending(&self) -> usize {
        self.executor.pending()
    }
}
