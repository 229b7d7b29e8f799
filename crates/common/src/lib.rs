//! Shared plumbing for the futures bot crates.

mod backoff;
mod environment;
mod logging;

pub use backoff::{retry_with_backoff, ExponentialBackoff, RetryPolicy, Retryable};
pub use environment::{BinanceEnvironment, ParseEnvironmentError};
pub use logging::init_logging;
