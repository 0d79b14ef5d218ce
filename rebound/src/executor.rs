use core::fmt;
use core::future::Future;

use tracing::Instrument;
use tracing::debug_span;

use crate::blocking_retry::BlockingRetryable;
use crate::blocking_sleep::BlockingSleeper;
use crate::blocking_sleep::DefaultBlockingSleeper;
use crate::policy::RetryPolicy;
use crate::retry::Retryable;
use crate::sleep::DefaultSleeper;
use crate::sleep::Sleeper;

/// Runs operations under one [`RetryPolicy`], with an explicit recovery per call.
///
/// The executor holds no per-call state, so a single instance can serve any
/// number of concurrent calls; each call gets its own attempt counter and
/// backoff.
///
/// ```
/// use std::time::Duration;
///
/// use rebound::RetryExecutor;
/// use rebound::RetryPolicy;
///
/// let executor = RetryExecutor::new(
///     RetryPolicy::builder()
///         .max_attempts(6)
///         .fixed_delay(Duration::from_millis(1))
///         .build()
///         .unwrap(),
/// );
///
/// let mut attempts = 0;
/// let sent = executor.execute(
///     || {
///         attempts += 1;
///         if attempts <= 3 { Err("connection reset") } else { Ok(true) }
///     },
///     |_| Ok(false),
/// );
/// assert_eq!(sent, Ok(true));
/// ```
pub struct RetryExecutor<E, S = DefaultBlockingSleeper, A = DefaultSleeper> {
    policy: RetryPolicy<E>,
    sleeper: S,
    async_sleeper: A,
}

impl<E, S: Clone, A: Clone> Clone for RetryExecutor<E, S, A> {
    fn clone(&self) -> Self {
        RetryExecutor {
            policy: self.policy.clone(),
            sleeper: self.sleeper.clone(),
            async_sleeper: self.async_sleeper.clone(),
        }
    }
}

impl<E, S, A> fmt::Debug for RetryExecutor<E, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<E> RetryExecutor<E> {
    /// Create an executor using the default sleepers.
    pub fn new(policy: RetryPolicy<E>) -> Self {
        RetryExecutor {
            policy,
            sleeper: DefaultBlockingSleeper::default(),
            async_sleeper: DefaultSleeper::default(),
        }
    }
}

impl<E> From<RetryPolicy<E>> for RetryExecutor<E> {
    fn from(policy: RetryPolicy<E>) -> Self {
        Self::new(policy)
    }
}

impl<E> Default for RetryExecutor<E> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<E, S, A> RetryExecutor<E, S, A> {
    /// The policy every call runs under.
    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    /// Use `sleeper` between blocking attempts.
    pub fn with_sleeper<SN>(self, sleeper: SN) -> RetryExecutor<E, SN, A>
    where
        SN: BlockingSleeper + Clone,
    {
        RetryExecutor {
            policy: self.policy,
            sleeper,
            async_sleeper: self.async_sleeper,
        }
    }

    /// Use `sleeper` between async attempts.
    pub fn with_async_sleeper<AN>(self, sleeper: AN) -> RetryExecutor<E, S, AN>
    where
        AN: Sleeper + Clone,
    {
        RetryExecutor {
            policy: self.policy,
            sleeper: self.sleeper,
            async_sleeper: sleeper,
        }
    }

    /// Run `op` on the current thread until it succeeds, fails with a
    /// non-retryable error, or runs out of attempts.
    ///
    /// On exhaustion `recovery` gets the last failure and its result, error
    /// included, is returned as is.
    pub fn execute<T, F, R>(&self, op: F, recovery: R) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        R: FnOnce(E) -> Result<T, E>,
        S: BlockingSleeper + Clone,
    {
        let _span = debug_span!("retry", max_attempts = self.policy.max_attempts()).entered();
        op.retry(&self.policy)
            .sleep(self.sleeper.clone())
            .recover(recovery)
            .call()
    }

    /// Async version of [`execute`](Self::execute).
    ///
    /// Dropping the returned future cancels the call without running recovery.
    pub fn execute_async<T, Fut, F, R>(
        &self,
        op: F,
        recovery: R,
    ) -> impl Future<Output = Result<T, E>>
    where
        Fut: Future<Output = Result<T, E>>,
        F: FnMut() -> Fut,
        R: FnOnce(E) -> Result<T, E>,
        A: Sleeper + Clone,
    {
        op.retry(&self.policy)
            .sleep(self.async_sleeper.clone())
            .recover(recovery)
            .instrument(debug_span!(
                "retry",
                max_attempts = self.policy.max_attempts()
            ))
    }
}
