use core::time::Duration;

use thiserror::Error;

/// Reasons a [`RetryPolicy`](crate::RetryPolicy) refuses to build.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// `max_attempts` counts the first attempt, so it can never be zero.
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    /// The multiplier was NaN, infinite, or below 1.0.
    #[error("multiplier must be a finite number >= 1.0 (got {0})")]
    InvalidMultiplier(f32),
    /// The delay cap would cut the very first delay.
    #[error("max_delay ({max:?}) is shorter than initial_delay ({initial:?})")]
    MaxDelayBelowInitial {
        /// The configured first delay.
        initial: Duration,
        /// The configured cap.
        max: Duration,
    },
}
