//! Shared, domain-agnostic building blocks used across the earnings engine:
//! fixed-point money, timestamps, ids, backoff, shutdown signaling, task
//! spawning, randomness, and the wire error envelope.

pub mod backoff;
pub mod error;
pub mod ids;
pub mod money;
pub mod rng;
pub mod shutdown;
pub mod task;
pub mod time;

/// `assert!` that only runs at compile time; panics during const-eval if the
/// condition is false. Used to catch constant misconfigurations early.
#[macro_export]
macro_rules! const_assert {
    ($cond:expr) => {
        const _: () = assert!($cond);
    };
}
