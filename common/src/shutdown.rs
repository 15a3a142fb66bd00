use std::sync::Arc;

use tokio::sync::Semaphore;

/// A synchronization utility for sending / receiving shutdown signals to the
/// background sweep loops (payment-window enforcement, payout
/// pre-generation, gold-status expiry).
///
/// Features:
///
/// - Multi-producer and multi-consumer - simply clone to get another handle
/// - Consumers can receive shutdown signals that were sent prior to
///   'subscribing' to the channel (unlike [`tokio::sync::broadcast`])
/// - It is safe to send a shutdown signal multiple times (e.g. by accident)
///
/// The underlying implementation (ab)uses the fact that calling [`acquire`]
/// on a [`Semaphore`] with 0 permits only returns once the [`Semaphore`] has
/// been closed. Closing the semaphore is equivalent to sending a shutdown
/// signal, and receiving an `AcquireError` (indicating the semaphore has
/// been closed) from a call to [`acquire`] is equivalent to receiving one.
///
/// [`acquire`]: Semaphore::acquire
#[derive(Clone, Debug)]
pub struct ShutdownChannel {
    inner: Arc<Semaphore>,
}

impl ShutdownChannel {
    /// Construct a new [`ShutdownChannel`]. Should be constructed once in
    /// the lifetime of the program and cloned to every background task.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Semaphore::new(0)),
        }
    }

    /// Send a shutdown signal, causing all tasks waiting on this channel to
    /// complete their call to [`recv`].
    ///
    /// [`recv`]: ShutdownChannel::recv
    pub fn send(&self) {
        self.inner.close()
    }

    /// Wait for a shutdown signal. If one was already sent, returns
    /// immediately.
    pub async fn recv(&self) {
        self.inner
            .acquire()
            .await
            .map_err(|_| ())
            .expect_err("Shouldn't've been able to acquire a permit")
    }

    /// Immediately returns whether a shutdown signal has been sent.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_closed()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::time;

    use super::*;

    #[test]
    fn multiple_sends_doesnt_panic() {
        let shutdown = ShutdownChannel::new();
        shutdown.send();
        shutdown.send();
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_after_close_is_ok() {
        let shutdown1 = ShutdownChannel::new();
        let shutdown2 = shutdown1.clone();
        time::sleep(Duration::from_secs(1)).await;
        shutdown1.send();
        time::timeout(Duration::from_nanos(1), shutdown2.recv())
            .await
            .expect("Did not finish immediately");

        let shutdown3 = shutdown2.clone();
        assert!(shutdown3.is_shutdown());
        time::timeout(Duration::from_nanos(1), shutdown3.recv())
            .await
            .expect("Did not finish immediately");
    }
}
