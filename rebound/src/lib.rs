//! Retry an operation with backoff, then fall back to a recovery.
//!
//! # Overview
//!
//! Every retried call follows the same algorithm: run the operation; on
//! success return at once; on a failure the [`RetryPolicy`] refuses to retry,
//! return that failure; on a failure of the final attempt hand it to the
//! recovery and return whatever recovery returns; otherwise wait and try again.
//! The wait before attempt `n` is `initial_delay * multiplier^(n - 2)`.
//!
//! The algorithm is reachable in two styles:
//!
//! - imperative: [`RetryExecutor::execute`] and
//!   [`RetryExecutor::execute_async`] take the operation and the recovery at
//!   the call site, or the fluent [`BlockingRetryable`] / [`Retryable`]
//!   extensions on closures;
//! - declarative: [`Retrying`] binds an operation to a policy and a recovery
//!   once, and the `#[retryable]` attribute from `rebound-macros` does the
//!   same for a function at compile time.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use rebound::RetryExecutor;
//! use rebound::RetryPolicy;
//!
//! #[derive(Debug)]
//! struct SendError;
//!
//! let policy = RetryPolicy::builder()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(1))
//!     .multiplier(2.0)
//!     .build()
//!     .unwrap();
//! let executor = RetryExecutor::new(policy);
//!
//! let sent = executor.execute(|| Err::<bool, _>(SendError), |_| Ok(false));
//! assert!(!sent.unwrap());
//! ```
//!
//! # Sleep
//!
//! Async retries sleep with [`DefaultSleeper`], chosen by feature:
//!
//! - `tokio-sleep` (default): [`TokioSleeper`]
//! - `futures-timer-sleep`: [`FuturesTimerSleeper`]
//! - `gloo-timers-sleep` (default, wasm32 only): [`GlooTimersSleep`]
//!
//! Blocking retries use [`StdSleeper`] under `std-blocking-sleep`. Any
//! `Fn(Duration) -> impl Future` or `Fn(Duration)` can be passed instead.

#![deny(missing_docs)]

mod backoff;
pub use backoff::Backoff;
pub use backoff::BackoffBuilder;
pub use backoff::ExponentialBackoff;
pub use backoff::ExponentialBuilder;

mod error;
pub use error::PolicyError;

mod policy;
pub use policy::RetryPolicy;
pub use policy::RetryPolicyBuilder;

mod config;
pub use config::PolicyConfig;

mod retry_core;

mod retry;
pub use retry::Retry;
pub use retry::Retryable;

mod blocking_retry;
pub use blocking_retry::BlockingRetry;
pub use blocking_retry::BlockingRetryable;

mod executor;
pub use executor::RetryExecutor;

mod declarative;
pub use declarative::Retrying;
pub use declarative::Wrapped;

mod sleep;
#[cfg(feature = "futures-timer-sleep")]
pub use sleep::FuturesTimerSleeper;
#[cfg(all(target_arch = "wasm32", feature = "gloo-timers-sleep"))]
pub use sleep::GlooTimersSleep;
#[cfg(all(not(target_arch = "wasm32"), feature = "tokio-sleep"))]
pub use sleep::TokioSleeper;
pub use sleep::{DefaultSleeper, MaybeSleeper, PleaseEnableAFeatureOrProvideACustomSleeper, Sleeper};

mod blocking_sleep;
pub use blocking_sleep::{
    BlockingSleeper, DefaultBlockingSleeper, MaybeBlockingSleeper,
    PleaseEnableAFeatureOrProvideACustomBlockingSleeper,
};
#[cfg(feature = "std-blocking-sleep")]
pub use blocking_sleep::StdSleeper;
