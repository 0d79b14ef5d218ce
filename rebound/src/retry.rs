use core::future::Future;
use core::marker::PhantomData;
use core::pin::Pin;
use core::task::Context;
use core::task::Poll;
use core::task::ready;
use core::time::Duration;

use crate::policy::RetryPolicy;
use crate::retry_core::Decision;
use crate::retry_core::RetryConfig;
use crate::retry_core::noop_notify;
use crate::retry_core::propagate;
use crate::sleep::DefaultSleeper;
use crate::sleep::MaybeSleeper;
use crate::sleep::Sleeper;

/// Retry an async closure under a [`RetryPolicy`].
///
/// ```no_run
/// use std::time::Duration;
///
/// use anyhow::Result;
/// use rebound::RetryPolicy;
/// use rebound::Retryable;
///
/// async fn send_message(message: &str) -> Result<bool> {
///     Ok(!message.is_empty())
/// }
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<()> {
///     let policy = RetryPolicy::builder()
///         .max_attempts(5)
///         .initial_delay(Duration::from_millis(2000))
///         .multiplier(2.0)
///         .build()?;
///
///     let sent = (|| send_message("hello world"))
///         .retry(&policy)
///         .recover(|_| Ok(false))
///         .await?;
///     println!("sent: {sent}");
///     Ok(())
/// }
/// ```
pub trait Retryable<'p, T, E, Fut, FutureFn>
where
    Fut: Future<Output = Result<T, E>>,
    FutureFn: FnMut() -> Fut,
{
    /// Generate a new retry future.
    fn retry(self, policy: &'p RetryPolicy<E>) -> Retry<'p, T, E, Fut, FutureFn>;
}

impl<'p, T, E, Fut, FutureFn> Retryable<'p, T, E, Fut, FutureFn> for FutureFn
where
    Fut: Future<Output = Result<T, E>>,
    FutureFn: FnMut() -> Fut,
{
    fn retry(self, policy: &'p RetryPolicy<E>) -> Retry<'p, T, E, Fut, FutureFn> {
        Retry::new(self, policy)
    }
}

/// Future that runs attempts, backs off between them, and falls back to
/// recovery once the policy's attempts are used up.
///
/// Dropping it while it waits between attempts cancels the call: no further
/// attempt runs and recovery is not invoked.
pub struct Retry<
    'p,
    T,
    E,
    Fut,
    FutureFn,
    SF: MaybeSleeper = DefaultSleeper,
    NF = fn(&E, Duration),
    RF = fn(E) -> Result<T, E>,
> {
    config: RetryConfig<'p, E, SF, NF, RF>,
    future_fn: FutureFn,
    state: State<Fut, SF::Sleep>,
    _marker: PhantomData<fn() -> T>,
}

// Inner futures are boxed, so nothing is ever pinned in place.
impl<T, E, Fut, FutureFn, SF: MaybeSleeper, NF, RF> Unpin
    for Retry<'_, T, E, Fut, FutureFn, SF, NF, RF>
{
}

impl<'p, T, E, Fut, FutureFn> Retry<'p, T, E, Fut, FutureFn>
where
    Fut: Future<Output = Result<T, E>>,
    FutureFn: FnMut() -> Fut,
{
    fn new(future_fn: FutureFn, policy: &'p RetryPolicy<E>) -> Self {
        Retry {
            config: RetryConfig::new(
                policy,
                DefaultSleeper::default(),
                noop_notify::<E> as fn(&E, Duration),
                propagate::<T, E> as fn(E) -> Result<T, E>,
            ),
            future_fn,
            state: State::Idle,
            _marker: PhantomData,
        }
    }
}

impl<'p, T, E, Fut, FutureFn, SF, NF, RF> Retry<'p, T, E, Fut, FutureFn, SF, NF, RF>
where
    Fut: Future<Output = Result<T, E>>,
    FutureFn: FnMut() -> Fut,
    SF: MaybeSleeper,
    NF: FnMut(&E, Duration),
    RF: FnOnce(E) -> Result<T, E>,
{
    /// Set the sleeper used between attempts.
    ///
    /// ```no_run
    /// use rebound::RetryPolicy;
    /// use rebound::Retryable;
    ///
    /// async fn fetch() -> Result<String, std::io::Error> {
    ///     Ok("hello".to_string())
    /// }
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() -> Result<(), std::io::Error> {
    ///     let policy = RetryPolicy::default();
    ///     let content = fetch.retry(&policy).sleep(tokio::time::sleep).await?;
    ///     println!("fetch succeeded: {content}");
    ///     Ok(())
    /// }
    /// ```
    pub fn sleep<SN: Sleeper>(self, sleep_fn: SN) -> Retry<'p, T, E, Fut, FutureFn, SN, NF, RF> {
        Retry {
            config: self.config.with_sleep(sleep_fn),
            future_fn: self.future_fn,
            state: State::Idle,
            _marker: PhantomData,
        }
    }

    /// Call `notify` with the failure and the upcoming delay before every wait.
    pub fn notify<NN>(self, notify: NN) -> Retry<'p, T, E, Fut, FutureFn, SF, NN, RF>
    where
        NN: FnMut(&E, Duration),
    {
        Retry {
            config: self.config.with_notify(notify),
            future_fn: self.future_fn,
            state: self.state,
            _marker: PhantomData,
        }
    }

    /// Produce a fallback from the failure of the final attempt.
    ///
    /// Runs at most once. Whatever it returns, including an error, is the
    /// result of the call. Without it the final failure is returned.
    pub fn recover<RN>(self, recover: RN) -> Retry<'p, T, E, Fut, FutureFn, SF, NF, RN>
    where
        RN: FnOnce(E) -> Result<T, E>,
    {
        Retry {
            config: self.config.with_recover(recover),
            future_fn: self.future_fn,
            state: self.state,
            _marker: PhantomData,
        }
    }
}

/// Attempting (`Idle` then `Polling`), backing off (`Sleeping`), or finished.
/// Recovery is synchronous and happens on the way to `Done`.
enum State<Fut, SleepFut> {
    Idle,
    Polling(Pin<Box<Fut>>),
    Sleeping(Pin<Box<SleepFut>>),
    Done,
}

impl<T, E, Fut, FutureFn, SF, NF, RF> Future for Retry<'_, T, E, Fut, FutureFn, SF, NF, RF>
where
    Fut: Future<Output = Result<T, E>>,
    FutureFn: FnMut() -> Fut,
    SF: Sleeper,
    NF: FnMut(&E, Duration),
    RF: FnOnce(E) -> Result<T, E>,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                State::Idle => {
                    this.config.begin_attempt();
                    let fut = (this.future_fn)();
                    this.state = State::Polling(Box::pin(fut));
                }
                State::Polling(fut) => match ready!(fut.as_mut().poll(cx)) {
                    Ok(v) => {
                        this.state = State::Done;
                        this.config.succeeded();
                        return Poll::Ready(Ok(v));
                    }
                    Err(err) => match this.config.decide(&err) {
                        Decision::Retry(dur) => {
                            this.state = State::Sleeping(Box::pin(this.config.sleep.sleep(dur)));
                        }
                        Decision::Recover => {
                            this.state = State::Done;
                            return Poll::Ready(this.config.recover(err));
                        }
                        Decision::Reject => {
                            this.state = State::Done;
                            return Poll::Ready(Err(err));
                        }
                    },
                },
                State::Sleeping(sl) => {
                    ready!(sl.as_mut().poll(cx));
                    this.state = State::Idle;
                }
                State::Done => panic!("`Retry` polled after completion"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use tokio::time::Instant;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum SendError {
        Busy,
        Refused,
    }

    fn policy(max_attempts: usize, delay_ms: u64, multiplier: f32) -> RetryPolicy<SendError> {
        RetryPolicy::builder()
            .max_attempts(max_attempts)
            .initial_delay(Duration::from_millis(delay_ms))
            .multiplier(multiplier)
            .retry_if(|err: &SendError| *err == SendError::Busy)
            .build()
            .unwrap()
    }

    async fn always_busy() -> Result<&'static str, SendError> {
        Err(SendError::Busy)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let attempts = AtomicUsize::new(0);
        let policy = policy(3, 1000, 1.0);

        let result = (|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok::<_, SendError>("sent")
        })
        .retry(&policy)
        .recover(|_| panic!("recovery must not run"))
        .await;

        assert_eq!(result, Ok("sent"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_without_recovery_returns_last_error() {
        let policy = policy(3, 10, 1.0);
        let result = always_busy.retry(&policy).await;
        assert_eq!(result, Err(SendError::Busy));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exponential_waits_then_recovers() {
        let attempts = AtomicUsize::new(0);
        let recoveries = AtomicUsize::new(0);
        let policy = policy(3, 1000, 2.0);
        let start = Instant::now();

        let result = (|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            always_busy().await
        })
        .retry(&policy)
        .recover(|err| {
            recoveries.fetch_add(1, Ordering::SeqCst);
            assert_eq!(err, SendError::Busy);
            Ok("fallback")
        })
        .await;

        assert_eq!(result, Ok("fallback"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(recoveries.load(Ordering::SeqCst), 1);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(3050), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_surfaces_immediately() {
        let attempts = AtomicUsize::new(0);
        let policy = policy(5, 1000, 1.0);
        let start = Instant::now();

        let result = (|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(SendError::Refused)
        })
        .retry(&policy)
        .recover(|_| panic!("recovery must not run"))
        .await;

        assert_eq!(result, Err(SendError::Refused));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_error_is_returned_unmodified() {
        let attempts = AtomicUsize::new(0);
        let policy = policy(2, 10, 1.0);

        let result: Result<(), _> = (|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(SendError::Busy)
        })
        .retry(&policy)
        .recover(|_| Err(SendError::Refused))
        .await;

        assert_eq!(result, Err(SendError::Refused));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_and_custom_sleeper() {
        let notified = Mutex::new(Vec::new());
        let slept = Arc::new(Mutex::new(Vec::new()));
        let policy = policy(4, 100, 2.0);

        let recorded = slept.clone();
        let result = always_busy
            .retry(&policy)
            .sleep(move |dur: Duration| {
                recorded.lock().unwrap().push(dur);
                tokio::time::sleep(dur)
            })
            .notify(|_: &SendError, dur| notified.lock().unwrap().push(dur))
            .await;

        assert_eq!(result, Err(SendError::Busy));
        let expected = [100, 200, 400].map(Duration::from_millis).to_vec();
        assert_eq!(*slept.lock().unwrap(), expected);
        assert_eq!(*notified.lock().unwrap(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_during_backoff_cancels() {
        let attempts = AtomicUsize::new(0);
        let recoveries = AtomicUsize::new(0);
        let policy = policy(5, 1000, 1.0);

        let outcome = tokio::time::timeout(
            Duration::from_millis(1500),
            (|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(SendError::Busy)
            })
            .retry(&policy)
            .recover(|_| {
                recoveries.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(recoveries.load(Ordering::SeqCst), 0);
    }
}
