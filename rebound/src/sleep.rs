use core::future::Future;
use core::future::Ready;
use core::time::Duration;

/// Async sleeper used between attempts of a [`Retry`](crate::Retry).
///
/// Any `Fn(Duration) -> impl Future<Output = ()>` is a sleeper, so
/// `tokio::time::sleep` can be passed directly.
pub trait Sleeper: 'static {
    /// The future returned by [`sleep`](Self::sleep).
    type Sleep: Future<Output = ()>;

    /// Create a future that completes after `dur`.
    fn sleep(&self, dur: Duration) -> Self::Sleep;
}

/// Sealed marker so `Sleeper` closures don't overlap with the provided sleepers.
#[doc(hidden)]
pub trait MaybeSleeper: 'static {
    /// The future returned by the sleeper, if there is one.
    type Sleep: Future<Output = ()>;
}

impl<T: Sleeper + ?Sized> MaybeSleeper for T {
    type Sleep = <T as Sleeper>::Sleep;
}

impl<F: Fn(Duration) -> Fut + 'static, Fut: Future<Output = ()>> Sleeper for F {
    type Sleep = Fut;

    fn sleep(&self, dur: Duration) -> Self::Sleep {
        self(dur)
    }
}

/// The default async sleeper for the enabled features.
///
/// Prefers tokio, then futures-timer, then gloo-timers on wasm32.
#[cfg(all(not(target_arch = "wasm32"), feature = "tokio-sleep"))]
pub type DefaultSleeper = TokioSleeper;
/// The default async sleeper for the enabled features.
#[cfg(all(
    not(target_arch = "wasm32"),
    not(feature = "tokio-sleep"),
    feature = "futures-timer-sleep"
))]
pub type DefaultSleeper = FuturesTimerSleeper;
/// The default async sleeper for the enabled features.
#[cfg(all(target_arch = "wasm32", feature = "gloo-timers-sleep"))]
pub type DefaultSleeper = GlooTimersSleep;
/// The default async sleeper for the enabled features.
#[cfg(all(
    target_arch = "wasm32",
    not(feature = "gloo-timers-sleep"),
    feature = "futures-timer-sleep"
))]
pub type DefaultSleeper = FuturesTimerSleeper;
/// No sleeper feature is enabled; supply one with `.sleep(...)`.
#[cfg(not(any(
    all(not(target_arch = "wasm32"), feature = "tokio-sleep"),
    all(target_arch = "wasm32", feature = "gloo-timers-sleep"),
    feature = "futures-timer-sleep"
)))]
pub type DefaultSleeper = PleaseEnableAFeatureOrProvideACustomSleeper;

/// Placeholder that implements no sleeper; compile errors mentioning it mean
/// a sleeper feature has to be enabled or a custom sleeper passed in.
#[derive(Clone, Copy, Debug, Default)]
pub struct PleaseEnableAFeatureOrProvideACustomSleeper;

impl MaybeSleeper for PleaseEnableAFeatureOrProvideACustomSleeper {
    type Sleep = Ready<()>;
}

/// Sleeper backed by `tokio::time::sleep`.
#[cfg(all(not(target_arch = "wasm32"), feature = "tokio-sleep"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[cfg(all(not(target_arch = "wasm32"), feature = "tokio-sleep"))]
impl Sleeper for TokioSleeper {
    type Sleep = tokio::time::Sleep;

    fn sleep(&self, dur: Duration) -> Self::Sleep {
        tokio::time::sleep(dur)
    }
}

/// Sleeper backed by `futures_timer::Delay`.
#[cfg(feature = "futures-timer-sleep")]
#[derive(Clone, Copy, Debug, Default)]
pub struct FuturesTimerSleeper;

#[cfg(feature = "futures-timer-sleep")]
impl Sleeper for FuturesTimerSleeper {
    type Sleep = futures_timer::Delay;

    fn sleep(&self, dur: Duration) -> Self::Sleep {
        futures_timer::Delay::new(dur)
    }
}

/// Sleeper backed by `gloo_timers::future::sleep` for browsers.
#[cfg(all(target_arch = "wasm32", feature = "gloo-timers-sleep"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct GlooTimersSleep;

#[cfg(all(target_arch = "wasm32", feature = "gloo-timers-sleep"))]
impl Sleeper for GlooTimersSleep {
    type Sleep = gloo_timers::future::TimeoutFuture;

    fn sleep(&self, dur: Duration) -> Self::Sleep {
        gloo_timers::future::sleep(dur)
    }
}
