use core::time::Duration;

/// Sleeper used between attempts of a [`BlockingRetry`](crate::BlockingRetry).
///
/// Any `Fn(Duration)` is a blocking sleeper, e.g. `std::thread::sleep`.
pub trait BlockingSleeper: 'static {
    /// Block the current thread for `dur`.
    fn sleep(&self, dur: Duration);
}

impl<F: Fn(Duration) + 'static> BlockingSleeper for F {
    fn sleep(&self, dur: Duration) {
        self(dur)
    }
}

/// Sealed marker so a missing blocking sleeper shows up as a named type.
#[doc(hidden)]
pub trait MaybeBlockingSleeper: 'static {}

impl<T: BlockingSleeper + ?Sized> MaybeBlockingSleeper for T {}

/// The default blocking sleeper for the enabled features.
#[cfg(feature = "std-blocking-sleep")]
pub type DefaultBlockingSleeper = StdSleeper;
/// No blocking sleeper feature is enabled; supply one with `.sleep(...)`.
#[cfg(not(feature = "std-blocking-sleep"))]
pub type DefaultBlockingSleeper = PleaseEnableAFeatureOrProvideACustomBlockingSleeper;

/// Placeholder that implements no blocking sleeper.
#[derive(Clone, Copy, Debug, Default)]
pub struct PleaseEnableAFeatureOrProvideACustomBlockingSleeper;

impl MaybeBlockingSleeper for PleaseEnableAFeatureOrProvideACustomBlockingSleeper {}

/// Sleeper backed by `std::thread::sleep`.
#[cfg(feature = "std-blocking-sleep")]
#[derive(Clone, Copy, Debug, Default)]
pub struct StdSleeper;

#[cfg(feature = "std-blocking-sleep")]
impl BlockingSleeper for StdSleeper {
    fn sleep(&self, dur: Duration) {
        std::thread::sleep(dur)
    }
}
