use core::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::backoff::ExponentialBackoff;
use crate::policy::RetryPolicy;

pub(crate) fn noop_notify<E>(_: &E, _: Duration) {}

pub(crate) fn propagate<T, E>(err: E) -> Result<T, E> {
    Err(err)
}

/// What to do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    /// Wait this long, then run the next attempt.
    Retry(Duration),
    /// The final attempt failed; hand the failure to recovery.
    Recover,
    /// The policy refuses to retry this failure; surface it as is.
    Reject,
}

/// Per-call retry state shared by the async and blocking executors.
///
/// Owns the attempt counter and the backoff of exactly one call; only the
/// policy is borrowed, and it is never mutated.
pub(crate) struct RetryConfig<'p, E, Sleep, NotifyFn, RecoverFn> {
    pub(crate) policy: &'p RetryPolicy<E>,
    pub(crate) sleep: Sleep,
    pub(crate) notify: NotifyFn,
    pub(crate) recover: Option<RecoverFn>,
    backoff: ExponentialBackoff,
    attempt: usize,
}

impl<'p, E, Sleep, NotifyFn, RecoverFn> RetryConfig<'p, E, Sleep, NotifyFn, RecoverFn> {
    pub(crate) fn new(
        policy: &'p RetryPolicy<E>,
        sleep: Sleep,
        notify: NotifyFn,
        recover: RecoverFn,
    ) -> Self {
        RetryConfig {
            policy,
            sleep,
            notify,
            recover: Some(recover),
            backoff: policy.backoff(),
            attempt: 0,
        }
    }

    pub(crate) fn with_sleep<S>(self, sleep: S) -> RetryConfig<'p, E, S, NotifyFn, RecoverFn> {
        RetryConfig {
            policy: self.policy,
            sleep,
            notify: self.notify,
            recover: self.recover,
            backoff: self.backoff,
            attempt: self.attempt,
        }
    }

    pub(crate) fn with_notify<N>(self, notify: N) -> RetryConfig<'p, E, Sleep, N, RecoverFn> {
        RetryConfig {
            policy: self.policy,
            sleep: self.sleep,
            notify,
            recover: self.recover,
            backoff: self.backoff,
            attempt: self.attempt,
        }
    }

    pub(crate) fn with_recover<R>(self, recover: R) -> RetryConfig<'p, E, Sleep, NotifyFn, R> {
        RetryConfig {
            policy: self.policy,
            sleep: self.sleep,
            notify: self.notify,
            recover: Some(recover),
            backoff: self.backoff,
            attempt: self.attempt,
        }
    }

    /// Account for a new attempt about to run.
    pub(crate) fn begin_attempt(&mut self) {
        self.attempt += 1;
        debug!(
            attempt = self.attempt,
            max_attempts = self.policy.max_attempts(),
            "running attempt"
        );
    }

    pub(crate) fn succeeded(&self) {
        if self.attempt > 1 {
            debug!(attempt = self.attempt, "attempt succeeded after retries");
        }
    }

    pub(crate) fn decide(&mut self, err: &E) -> Decision
    where
        NotifyFn: FnMut(&E, Duration),
    {
        if !self.policy.is_retryable(err) {
            debug!(attempt = self.attempt, "failure is not retryable");
            return Decision::Reject;
        }

        if self.attempt >= self.policy.max_attempts() {
            return Decision::Recover;
        }
        match self.backoff.next() {
            Some(dur) => {
                debug!(attempt = self.attempt, delay = ?dur, "attempt failed, backing off");
                (self.notify)(err, dur);
                Decision::Retry(dur)
            }
            None => Decision::Recover,
        }
    }

    /// Run recovery for the failure of the final attempt. Recovery runs at
    /// most once and its result is returned untouched.
    pub(crate) fn recover<T>(&mut self, err: E) -> Result<T, E>
    where
        RecoverFn: FnOnce(E) -> Result<T, E>,
    {
        match self.recover.take() {
            Some(recover) => {
                warn!(attempts = self.attempt, "retries exhausted, invoking recovery");
                recover(err)
            }
            None => {
                warn!(attempts = self.attempt, "retries exhausted");
                Err(err)
            }
        }
    }
}
