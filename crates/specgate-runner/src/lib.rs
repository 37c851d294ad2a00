//! Subprocess execution engine for specgate.

pub mod process;
pub mod retry;

pub use process::{OutputStream, TokioProcessExecutor};
pub use retry::{MAX_RETRY_DELAY, RetryPolicy, retry, retry_with};
