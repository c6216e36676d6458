//! Resilient execution primitives.
//!
//! - `retry`: per-attempt timeout, exponential backoff and retry budget
//!   around a single remote operation.
//! - `batch`: windowed fan-out of many operations whose individual
//!   failures are collected instead of aborting the batch.

mod batch;
mod policy;
mod retry;

pub use batch::{run_batch, BatchOutcome, BatchResult};
pub use policy::{BatchOptions, RetryPolicy, DEFAULT_WINDOW_SIZE};
pub use retry::{
    backoff_delay, execute_with_retry, ignore_retries, OnRetry, RetryExecutor, Sleeper,
    TokioSleeper,
};
