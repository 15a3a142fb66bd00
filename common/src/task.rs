use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

/// A thin wrapper around [`tokio::task::JoinHandle`] that adds the
/// `#[must_use]` lint, ensuring every spawned background task is joined (or
/// explicitly dropped) rather than silently forgotten.
#[must_use]
pub struct LxTask<T>(JoinHandle<T>);

impl<T> LxTask<T> {
    pub fn spawn<F>(future: F) -> LxTask<F::Output>
    where
        F: Future<Output = T> + Send + 'static,
        F::Output: Send + 'static,
    {
        LxTask(tokio::spawn(future))
    }

    /// Spawn a task instrumented with the given [`tracing::Span`], so every
    /// log line emitted inside carries the task's identity.
    pub fn spawn_with_span<F>(span: tracing::Span, future: F) -> LxTask<F::Output>
    where
        F: Future<Output = T> + Send + 'static,
        F::Output: Send + 'static,
    {
        LxTask(tokio::spawn(future.instrument(span)))
    }

    pub fn abort(&self) {
        self.0.abort();
    }
}

impl<T> Future for LxTask<T> {
    type Output = Result<T, JoinError>;
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}
