use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use crate::backoff::BackoffBuilder;
use crate::backoff::ExponentialBackoff;
use crate::backoff::ExponentialBuilder;
use crate::error::PolicyError;

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// How often, how patiently, and on which failures to retry.
///
/// A policy is immutable once built and cheap to clone; share it by reference
/// between any number of concurrent calls. Every call builds its own backoff
/// from it, so calls never observe each other's attempt counts.
///
/// ```
/// use std::time::Duration;
///
/// use rebound::RetryPolicy;
///
/// #[derive(Debug)]
/// enum SendError {
///     Timeout,
///     Rejected,
/// }
///
/// let policy = RetryPolicy::builder()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(2000))
///     .multiplier(2.0)
///     .retry_if(|err: &SendError| matches!(err, SendError::Timeout))
///     .build()
///     .unwrap();
///
/// assert_eq!(policy.max_attempts(), 5);
/// assert!(policy.is_retryable(&SendError::Timeout));
/// assert!(!policy.is_retryable(&SendError::Rejected));
/// ```
pub struct RetryPolicy<E> {
    max_attempts: usize,
    backoff: ExponentialBuilder,
    retryable: Option<Predicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Start from the defaults: 3 attempts, 1s fixed delay, every failure retryable.
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    /// Total number of attempts, the first one included.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before the second attempt.
    pub fn initial_delay(&self) -> Duration {
        self.backoff.initial_delay()
    }

    /// Growth factor applied to the delay after each failed attempt.
    pub fn multiplier(&self) -> f32 {
        self.backoff.factor()
    }

    /// Upper bound of any single delay, if any.
    pub fn max_delay(&self) -> Option<Duration> {
        self.backoff.max_delay()
    }

    /// Whether delays are randomly stretched.
    pub fn jitter(&self) -> bool {
        self.backoff.jitter()
    }

    /// Whether `err` may be retried.
    pub fn is_retryable(&self, err: &E) -> bool {
        match &self.retryable {
            Some(predicate) => predicate(err),
            None => true,
        }
    }

    /// The backoff configuration, yielding `max_attempts - 1` delays.
    pub fn backoff_builder(&self) -> ExponentialBuilder {
        self.backoff
    }

    /// A fresh delay sequence for one call.
    pub fn backoff(&self) -> ExponentialBackoff {
        self.backoff.build()
    }

    /// Nominal wait before `attempt` (1-based), ignoring jitter.
    ///
    /// Returns `None` for the first attempt and for attempts beyond
    /// `max_attempts`.
    pub fn delay_before(&self, attempt: usize) -> Option<Duration> {
        if attempt < 2 || attempt > self.max_attempts {
            return None;
        }
        self.backoff
            .without_jitter()
            .with_max_times(attempt - 1)
            .build()
            .last()
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            retryable: self.retryable.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay())
            .field("multiplier", &self.multiplier())
            .field("max_delay", &self.max_delay())
            .field("jitter", &self.jitter())
            .field("retryable", &"<predicate>")
            .finish()
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: ExponentialBuilder::new().with_max_times(DEFAULT_MAX_ATTEMPTS - 1),
            retryable: None,
        }
    }
}

pub(crate) const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub(crate) const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Builder for [`RetryPolicy`]; validation happens in [`build`](Self::build).
pub struct RetryPolicyBuilder<E> {
    max_attempts: usize,
    initial_delay: Duration,
    multiplier: f32,
    max_delay: Option<Duration>,
    jitter: bool,
    retryable: Option<Predicate<E>>,
}

impl<E> RetryPolicyBuilder<E> {
    fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_DELAY,
            multiplier: 1.0,
            max_delay: None,
            jitter: false,
            retryable: None,
        }
    }

    /// Total number of attempts, the first one included. Must be at least 1.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before the second attempt.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Wait the same `delay` between all attempts.
    pub fn fixed_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self.multiplier = 1.0;
        self
    }

    /// Growth factor of the delay. Must be finite and at least 1.0.
    pub fn multiplier(mut self, multiplier: f32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Cap any single delay.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Stretch every delay by a random factor in `[1.0, 2.0)`.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Only retry failures accepted by `predicate`; others surface at once.
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retryable = Some(Arc::new(predicate));
        self
    }

    /// Validate and freeze the policy.
    pub fn build(self) -> Result<RetryPolicy<E>, PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(PolicyError::InvalidMultiplier(self.multiplier));
        }

        let mut backoff = ExponentialBuilder::new()
            .with_initial_delay(self.initial_delay)
            .with_factor(self.multiplier)
            .with_max_times(self.max_attempts - 1);
        if let Some(max) = self.max_delay {
            if max < self.initial_delay {
                return Err(PolicyError::MaxDelayBelowInitial {
                    initial: self.initial_delay,
                    max,
                });
            }
            backoff = backoff.with_max_delay(max);
        }
        if self.jitter {
            backoff = backoff.with_jitter();
        }

        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            backoff,
            retryable: self.retryable,
        })
    }
}

impl<E> fmt::Debug for RetryPolicyBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicyBuilder")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("multiplier", &self.multiplier)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}
