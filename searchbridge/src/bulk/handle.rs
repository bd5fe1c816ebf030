use crate::work::DocumentWriteResult;
use crate::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

pub(crate) type ResultSender = oneshot::Sender<Result<DocumentWriteResult>>;

/// Pending result of one queued document operation.
///
/// Resolves once the batch carrying the operation has been answered. If the
/// operation is discarded without ever being sent (its execution context was
/// dropped), it resolves to [`Error::Cancelled`].
#[derive(Debug)]
pub struct WorkHandle {
    receiver: oneshot::Receiver<Result<DocumentWriteResult>>,
}

impl WorkHandle {
    pub(crate) fn channel() -> (ResultSender, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    /// The result if it is already available, without waiting.
    pub fn try_result(&mut self) -> Option<Result<DocumentWriteResult>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(Error::Cancelled)),
        }
    }
}

impl Future for WorkHandle {
    type Output = Result<DocumentWriteResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
