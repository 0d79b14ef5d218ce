use core::time::Duration;

use crate::backoff::BackoffBuilder;

/// Builder for [`ExponentialBackoff`].
///
/// The n-th delay (starting at zero) is `initial_delay * factor^n`, optionally
/// scaled by a random factor in `[1.0, 2.0)` and capped by `max_delay`. A
/// factor of `1.0` gives a fixed backoff.
///
/// ```
/// use std::time::Duration;
///
/// use rebound::{BackoffBuilder, ExponentialBuilder};
///
/// let delays: Vec<_> = ExponentialBuilder::default()
///     .with_initial_delay(Duration::from_millis(100))
///     .with_factor(2.0)
///     .with_max_times(3)
///     .build()
///     .collect();
/// assert_eq!(
///     delays,
///     [100, 200, 400].map(Duration::from_millis).to_vec()
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBuilder {
    initial_delay: Duration,
    factor: f32,
    max_delay: Option<Duration>,
    jitter: bool,
    max_times: usize,
}

impl Default for ExponentialBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExponentialBuilder {
    /// One second, fixed, two retries.
    pub const fn new() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            factor: 1.0,
            max_delay: None,
            jitter: false,
            max_times: 2,
        }
    }

    /// Set the first delay.
    pub const fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Set the growth factor applied after every delay.
    pub const fn with_factor(mut self, factor: f32) -> Self {
        self.factor = factor;
        self
    }

    /// Cap every single delay.
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Remove the delay cap.
    pub const fn without_max_delay(mut self) -> Self {
        self.max_delay = None;
        self
    }

    /// Scale every delay by a random factor in `[1.0, 2.0)`.
    pub const fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub(crate) const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Set how many delays are produced, i.e. the number of retries.
    pub const fn with_max_times(mut self, max_times: usize) -> Self {
        self.max_times = max_times;
        self
    }

    pub(crate) fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub(crate) fn factor(&self) -> f32 {
        self.factor
    }

    pub(crate) fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    pub(crate) fn jitter(&self) -> bool {
        self.jitter
    }
}

impl BackoffBuilder for ExponentialBuilder {
    type Backoff = ExponentialBackoff;

    fn build(&self) -> Self::Backoff {
        ExponentialBackoff {
            initial_delay: self.initial_delay,
            factor: self.factor,
            max_delay: self.max_delay,
            jitter: self.jitter,
            max_times: self.max_times,

            current_delay: None,
            attempts: 0,
        }
    }
}

/// Delays produced by an [`ExponentialBuilder`].
#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    factor: f32,
    max_delay: Option<Duration>,
    jitter: bool,
    max_times: usize,

    current_delay: Option<Duration>,
    attempts: usize,
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_times {
            return None;
        }
        self.attempts += 1;

        let base = match self.current_delay {
            None => self.initial_delay,
            Some(prev) => mul_saturating(prev, self.factor),
        };
        self.current_delay = Some(base);

        let mut delay = base;
        if self.jitter {
            delay = mul_saturating(delay, 1.0 + fastrand::f32());
        }
        if let Some(max_delay) = self.max_delay {
            delay = delay.min(max_delay);
        }
        Some(delay)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.max_times - self.attempts;
        (left, Some(left))
    }
}

fn mul_saturating(delay: Duration, factor: f32) -> Duration {
    if factor == 1.0 {
        return delay;
    }
    Duration::try_from_secs_f64(delay.as_secs_f64() * f64::from(factor)).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delays(builder: ExponentialBuilder) -> Vec<Duration> {
        builder.build().collect()
    }

    #[test]
    fn test_fixed_by_default() {
        assert_eq!(
            delays(ExponentialBuilder::default()),
            vec![Duration::from_secs(1); 2]
        );
    }

    #[test]
    fn test_grows_by_factor() {
        let builder = ExponentialBuilder::new()
            .with_initial_delay(Duration::from_millis(2000))
            .with_factor(2.0)
            .with_max_times(4);
        assert_eq!(
            delays(builder),
            [2000, 4000, 8000, 16000].map(Duration::from_millis).to_vec()
        );
    }

    #[test]
    fn test_max_delay_caps_each_delay() {
        let builder = ExponentialBuilder::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_factor(3.0)
            .with_max_delay(Duration::from_millis(500))
            .with_max_times(4);
        assert_eq!(
            delays(builder),
            [100, 300, 500, 500].map(Duration::from_millis).to_vec()
        );
    }

    #[test]
    fn test_zero_max_times_yields_nothing() {
        let mut backoff = ExponentialBuilder::new().with_max_times(0).build();
        assert_eq!(backoff.size_hint(), (0, Some(0)));
        assert_eq!(backoff.next(), None);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let builder = ExponentialBuilder::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_jitter()
            .with_max_times(50);
        for delay in delays(builder) {
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(200));
        }
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let builder = ExponentialBuilder::new()
            .with_initial_delay(Duration::MAX / 2)
            .with_factor(1000.0)
            .with_max_times(3);
        assert_eq!(delays(builder).last(), Some(&Duration::MAX));
    }
}
