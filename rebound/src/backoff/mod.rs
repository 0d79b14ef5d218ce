use core::fmt::Debug;
use core::time::Duration;

mod exponential;
pub use exponential::ExponentialBackoff;
pub use exponential::ExponentialBuilder;

/// Builds a fresh [`Backoff`] for every retried call.
///
/// Builders are configuration and may be shared freely; the backoff they
/// produce carries the per-call state and is consumed by a single call.
pub trait BackoffBuilder: Debug + Send + Sync + Unpin {
    /// The backoff this builder produces.
    type Backoff: Backoff;

    /// Start a new sequence of delays.
    fn build(&self) -> Self::Backoff;
}

/// A sequence of delays to wait between attempts.
///
/// `None` means no further attempt is allowed.
pub trait Backoff: Iterator<Item = Duration> + Send + Sync + Unpin {}
impl<T> Backoff for T where T: Iterator<Item = Duration> + Debug + Send + Sync + Unpin {}
