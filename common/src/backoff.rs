use std::cmp::min;
use std::time::Duration;

use crate::const_assert;

const INITIAL_WAIT_MS: u64 = 50;
const MAXIMUM_WAIT_MS: u64 = 2_000;
const EXP_BASE: u64 = 2;
/// Storage transactions are retried at most this many times before failing
/// the caller with `Contention` (see the concurrency & resource model).
pub const MAX_STORAGE_RETRIES: u32 = 3;

const_assert!(INITIAL_WAIT_MS != 0);

/// Get an iterator of jittered [`Duration`]s which can be passed into e.g.
/// [`tokio::time::sleep`] to observe exponential backoff between retries of a
/// contended storage transaction.
///
/// ```
/// # use common::backoff;
/// # #[tokio::test(start_paused = true)]
/// # async fn backoff_example() {
/// let mut backoff_durations = backoff::get_backoff_iter();
/// for _ in 0..backoff::MAX_STORAGE_RETRIES {
///     tokio::time::sleep(backoff_durations.next().unwrap()).await;
/// }
/// # }
/// ```
pub fn get_backoff_iter() -> impl Iterator<Item = Duration> {
    (0u32..).map(|index| {
        let factor = EXP_BASE.saturating_pow(index);
        let wait_ms = INITIAL_WAIT_MS.saturating_mul(factor);
        let bounded_wait_ms = min(wait_ms, MAXIMUM_WAIT_MS);
        Duration::from_millis(bounded_wait_ms)
    })
}
