use core::marker::PhantomData;
use core::time::Duration;

use crate::blocking_sleep::BlockingSleeper;
use crate::blocking_sleep::DefaultBlockingSleeper;
use crate::blocking_sleep::MaybeBlockingSleeper;
use crate::policy::RetryPolicy;
use crate::retry_core::Decision;
use crate::retry_core::RetryConfig;
use crate::retry_core::noop_notify;
use crate::retry_core::propagate;

/// Retry a blocking closure under a [`RetryPolicy`].
///
/// ```
/// use std::time::Duration;
///
/// use rebound::BlockingRetryable;
/// use rebound::RetryPolicy;
///
/// let policy = RetryPolicy::builder()
///     .max_attempts(3)
///     .fixed_delay(Duration::from_millis(1))
///     .build()
///     .unwrap();
///
/// let mut attempts = 0;
/// let result = (|| {
///     attempts += 1;
///     if attempts < 3 { Err("busy") } else { Ok(attempts) }
/// })
/// .retry(&policy)
/// .call();
/// assert_eq!(result, Ok(3));
/// ```
pub trait BlockingRetryable<'p, T, E, F>
where
    F: FnMut() -> Result<T, E>,
{
    /// Generate a new blocking retry.
    fn retry(self, policy: &'p RetryPolicy<E>) -> BlockingRetry<'p, T, E, F>;
}

impl<'p, T, E, F> BlockingRetryable<'p, T, E, F> for F
where
    F: FnMut() -> Result<T, E>,
{
    fn retry(self, policy: &'p RetryPolicy<E>) -> BlockingRetry<'p, T, E, F> {
        BlockingRetry::new(self, policy)
    }
}

/// Blocking retry built by [`BlockingRetryable::retry`]; run it with
/// [`call`](Self::call).
pub struct BlockingRetry<
    'p,
    T,
    E,
    F,
    SF: MaybeBlockingSleeper = DefaultBlockingSleeper,
    NF = fn(&E, Duration),
    RF = fn(E) -> Result<T, E>,
> {
    config: RetryConfig<'p, E, SF, NF, RF>,
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<'p, T, E, F> BlockingRetry<'p, T, E, F>
where
    F: FnMut() -> Result<T, E>,
{
    fn new(f: F, policy: &'p RetryPolicy<E>) -> Self {
        BlockingRetry {
            config: RetryConfig::new(
                policy,
                DefaultBlockingSleeper::default(),
                noop_notify::<E> as fn(&E, Duration),
                propagate::<T, E> as fn(E) -> Result<T, E>,
            ),
            f,
            _marker: PhantomData,
        }
    }
}

impl<'p, T, E, F, SF, NF, RF> BlockingRetry<'p, T, E, F, SF, NF, RF>
where
    F: FnMut() -> Result<T, E>,
    SF: MaybeBlockingSleeper,
    NF: FnMut(&E, Duration),
    RF: FnOnce(E) -> Result<T, E>,
{
    /// Set the sleeper used between attempts.
    pub fn sleep<SN: BlockingSleeper>(
        self,
        sleep_fn: SN,
    ) -> BlockingRetry<'p, T, E, F, SN, NF, RF> {
        BlockingRetry {
            config: self.config.with_sleep(sleep_fn),
            f: self.f,
            _marker: PhantomData,
        }
    }

    /// Call `notify` with the failure and the upcoming delay before every wait.
    pub fn notify<NN>(self, notify: NN) -> BlockingRetry<'p, T, E, F, SF, NN, RF>
    where
        NN: FnMut(&E, Duration),
    {
        BlockingRetry {
            config: self.config.with_notify(notify),
            f: self.f,
            _marker: PhantomData,
        }
    }

    /// Produce a fallback from the failure of the final attempt.
    ///
    /// Runs at most once. Whatever it returns, including an error, is the
    /// result of the call. Without it the final failure is returned.
    pub fn recover<RN>(self, recover: RN) -> BlockingRetry<'p, T, E, F, SF, NF, RN>
    where
        RN: FnOnce(E) -> Result<T, E>,
    {
        BlockingRetry {
            config: self.config.with_recover(recover),
            f: self.f,
            _marker: PhantomData,
        }
    }
}

impl<T, E, F, SF, NF, RF> BlockingRetry<'_, T, E, F, SF, NF, RF>
where
    F: FnMut() -> Result<T, E>,
    SF: BlockingSleeper,
    NF: FnMut(&E, Duration),
    RF: FnOnce(E) -> Result<T, E>,
{
    /// Run attempts on the current thread until one succeeds, a failure is
    /// rejected, or recovery has produced the result.
    pub fn call(mut self) -> Result<T, E> {
        loop {
            self.config.begin_attempt();
            let err = match (self.f)() {
                Ok(v) => {
                    self.config.succeeded();
                    return Ok(v);
                }
                Err(err) => err,
            };

            match self.config.decide(&err) {
                Decision::Retry(dur) => self.config.sleep.sleep(dur),
                Decision::Recover => return self.config.recover(err),
                Decision::Reject => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Instant;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum StoreError {
        Locked,
        Corrupt,
    }

    fn recording_sleeper() -> (Arc<Mutex<Vec<Duration>>>, impl BlockingSleeper) {
        let slept = Arc::new(Mutex::new(Vec::new()));
        let recorded = slept.clone();
        (slept, move |dur: Duration| recorded.lock().unwrap().push(dur))
    }

    #[test]
    fn test_succeeds_after_failures() {
        let policy = RetryPolicy::builder()
            .max_attempts(5)
            .fixed_delay(Duration::from_millis(2000))
            .build()
            .unwrap();
        let (slept, sleeper) = recording_sleeper();
        let mut attempts = 0;
        let mut recovered = false;

        let result = (|| {
            attempts += 1;
            if attempts <= 3 {
                Err(StoreError::Locked)
            } else {
                Ok(attempts)
            }
        })
        .retry(&policy)
        .sleep(sleeper)
        .recover(|_| {
            recovered = true;
            Ok(0)
        })
        .call();

        assert_eq!(result, Ok(4));
        assert_eq!(attempts, 4);
        assert!(!recovered);
        assert_eq!(*slept.lock().unwrap(), vec![Duration::from_millis(2000); 3]);
    }

    #[test]
    fn test_single_attempt_never_sleeps() {
        let policy = RetryPolicy::builder().max_attempts(1).build().unwrap();
        let (slept, sleeper) = recording_sleeper();
        let mut attempts = 0;

        let result = (|| {
            attempts += 1;
            Err::<u8, _>(StoreError::Locked)
        })
        .retry(&policy)
        .sleep(sleeper)
        .recover(|err| {
            assert_eq!(err, StoreError::Locked);
            Ok(42)
        })
        .call();

        assert_eq!(result, Ok(42));
        assert_eq!(attempts, 1);
        assert!(slept.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rejected_failure_skips_recovery() {
        let policy = RetryPolicy::builder()
            .retry_if(|err: &StoreError| *err == StoreError::Locked)
            .build()
            .unwrap();
        let (slept, sleeper) = recording_sleeper();

        let result = (|| Err::<(), _>(StoreError::Corrupt))
            .retry(&policy)
            .sleep(sleeper)
            .recover(|_| panic!("recovery must not run"))
            .call();

        assert_eq!(result, Err(StoreError::Corrupt));
        assert!(slept.lock().unwrap().is_empty());
    }

    #[test]
    fn test_retryable_then_rejected() {
        let policy = RetryPolicy::builder()
            .fixed_delay(Duration::from_millis(5))
            .max_attempts(5)
            .retry_if(|err: &StoreError| *err == StoreError::Locked)
            .build()
            .unwrap();
        let (slept, sleeper) = recording_sleeper();
        let mut attempts = 0;

        let result = (|| {
            attempts += 1;
            Err::<(), _>(if attempts == 1 {
                StoreError::Locked
            } else {
                StoreError::Corrupt
            })
        })
        .retry(&policy)
        .sleep(sleeper)
        .call();

        assert_eq!(result, Err(StoreError::Corrupt));
        assert_eq!(attempts, 2);
        assert_eq!(slept.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_recovery_error_propagates() {
        let policy = RetryPolicy::builder()
            .max_attempts(2)
            .fixed_delay(Duration::ZERO)
            .build()
            .unwrap();
        let mut recoveries = 0;

        let result: Result<(), _> = (|| Err(StoreError::Locked))
            .retry(&policy)
            .recover(|_| {
                recoveries += 1;
                Err(StoreError::Corrupt)
            })
            .call();

        assert_eq!(result, Err(StoreError::Corrupt));
        assert_eq!(recoveries, 1);
    }

    #[test]
    fn test_wall_clock_backoff() {
        let policy = RetryPolicy::builder()
            .max_attempts(3)
            .initial_delay(Duration::from_millis(20))
            .multiplier(2.0)
            .build()
            .unwrap();
        let start = Instant::now();

        let result = (|| Err::<(), _>(StoreError::Locked))
            .retry(&policy)
            .recover(|_| Ok(()))
            .call();

        let elapsed = start.elapsed();
        assert_eq!(result, Ok(()));
        assert!(elapsed >= Duration::from_millis(60), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1000), "{elapsed:?}");
    }
}
