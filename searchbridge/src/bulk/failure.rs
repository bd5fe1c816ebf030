use crate::work::BulkableWork;
use crate::Error;

/// Told about every document operation that failed inside a bulk flush.
///
/// Called in addition to resolving the operation's handle, so failures are
/// reported even when nobody awaits the handle.
pub trait FailureHandler: Send + Sync {
    fn handle_item_failure(&self, work: &dyn BulkableWork, error: &Error);
}

/// Logs each failure through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LoggingFailureHandler;

impl FailureHandler for LoggingFailureHandler {
    fn handle_item_failure(&self, work: &dyn BulkableWork, error: &Error) {
        tracing::error!(
            operation = work.operation().as_str(),
            index = work.target_index(),
            id = work.document_id(),
            "Bulk operation failed: {}",
            error
        );
    }
}
