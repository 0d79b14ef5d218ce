//! Operations bound ahead of time to a policy and a recovery.

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

/// An operation that always runs under its policy, falling back to its
/// recovery.
///
/// The wrapping is decided once, where the value is built; callers just
/// [`call`](Self::call) it like the operation itself. Each call re-supplies a
/// clone of its input to every attempt. This is the plain-value counterpart of
/// the `#[retryable]` attribute from `rebound-macros`.
///
/// ```
/// use std::time::Duration;
///
/// use rebound::RetryPolicy;
/// use rebound::Retrying;
///
/// #[derive(Debug)]
/// struct Unreachable;
///
/// fn deliver(message: String) -> Result<bool, Unreachable> {
///     if message.is_empty() { Err(Unreachable) } else { Ok(true) }
/// }
///
/// fn give_up(_: Unreachable) -> Result<bool, Unreachable> {
///     Ok(false)
/// }
///
/// let policy = RetryPolicy::builder()
///     .max_attempts(2)
///     .fixed_delay(Duration::from_millis(1))
///     .build()
///     .unwrap();
/// let send_message = policy.wrap(deliver).recover_with(give_up);
///
/// assert_eq!(send_message.call("hello world".to_string()).unwrap(), true);
/// assert_eq!(send_message.call(String::new()).unwrap(), false);
/// ```
pub struct Retrying<E, Op, Rec, S = DefaultBlockingSleeper, A = DefaultSleeper> {
    name: &'static str,
    policy: RetryPolicy<E>,
    op: Op,
    recover: Rec,
    sleeper: S,
    async_sleeper: A,
}

impl<E> RetryPolicy<E> {
    /// Bind `op` to this policy; name its recovery with
    /// [`recover_with`](Wrapped::recover_with).
    pub fn wrap<Op>(self, op: Op) -> Wrapped<E, Op> {
        Wrapped { policy: self, op }
    }
}

/// An operation bound to a policy, still missing its recovery.
pub struct Wrapped<E, Op> {
    policy: RetryPolicy<E>,
    op: Op,
}

impl<E, Op> Wrapped<E, Op> {
    /// Recover with `recover` once attempts run out.
    pub fn recover_with<Rec>(self, recover: Rec) -> Retrying<E, Op, Rec> {
        Retrying::new(self.policy, self.op, recover)
    }
}

impl<E, Op> fmt::Debug for Wrapped<E, Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<E, Op, Rec> Retrying<E, Op, Rec> {
    /// Bind `op` to `policy`, recovering with `recover` on exhaustion.
    pub fn new(policy: RetryPolicy<E>, op: Op, recover: Rec) -> Self {
        Retrying {
            name: "operation",
            policy,
            op,
            recover,
            sleeper: DefaultBlockingSleeper::default(),
            async_sleeper: DefaultSleeper::default(),
        }
    }
}

impl<E, Op, Rec, S, A> Retrying<E, Op, Rec, S, A> {
    /// Name the operation in log spans.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// The policy every call runs under.
    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    /// Use `sleeper` between blocking attempts.
    pub fn with_sleeper<SN>(self, sleeper: SN) -> Retrying<E, Op, Rec, SN, A>
    where
        SN: BlockingSleeper + Clone,
    {
        Retrying {
            name: self.name,
            policy: self.policy,
            op: self.op,
            recover: self.recover,
            sleeper,
            async_sleeper: self.async_sleeper,
        }
    }

    /// Use `sleeper` between async attempts.
    pub fn with_async_sleeper<AN>(self, sleeper: AN) -> Retrying<E, Op, Rec, S, AN>
    where
        AN: Sleeper + Clone,
    {
        Retrying {
            name: self.name,
            policy: self.policy,
            op: self.op,
            recover: self.recover,
            sleeper: self.sleeper,
            async_sleeper: sleeper,
        }
    }

    /// Run the blocking operation with `input`.
    pub fn call<I, T>(&self, input: I) -> Result<T, E>
    where
        I: Clone,
        Op: Fn(I) -> Result<T, E>,
        Rec: Fn(E) -> Result<T, E>,
        S: BlockingSleeper + Clone,
    {
        let _span = debug_span!("retry", operation = self.name).entered();
        (|| (self.op)(input.clone()))
            .retry(&self.policy)
            .sleep(self.sleeper.clone())
            .recover(|err| (self.recover)(err))
            .call()
    }

    /// Run the async operation with `input`.
    pub fn call_async<I, T, Fut>(&self, input: I) -> impl Future<Output = Result<T, E>>
    where
        I: Clone,
        Op: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Rec: Fn(E) -> Result<T, E>,
        A: Sleeper + Clone,
    {
        let op = &self.op;
        let recover = &self.recover;
        (move || op(input.clone()))
            .retry(&self.policy)
            .sleep(self.async_sleeper.clone())
            .recover(move |err| recover(err))
            .instrument(debug_span!("retry", operation = self.name))
    }
}

impl<E, Op, Rec, S, A> fmt::Debug for Retrying<E, Op, Rec, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
