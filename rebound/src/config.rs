use core::time::Duration;

use crate::error::PolicyError;
use crate::policy::DEFAULT_DELAY;
use crate::policy::DEFAULT_MAX_ATTEMPTS;
use crate::policy::RetryPolicy;

/// Plain-data form of a [`RetryPolicy`], for loading from configuration files.
///
/// Delays are whole milliseconds: converting a policy drops any sub-millisecond
/// part and saturates at `u64::MAX`. Missing fields take the defaults of
/// [`RetryPolicy::default`]; unknown fields are rejected.
///
/// ```
/// use rebound::PolicyConfig;
/// use rebound::RetryPolicy;
///
/// let config: PolicyConfig =
///     serde_json::from_str(r#"{ "max_attempts": 5, "delay_ms": 2000, "multiplier": 2.0 }"#)
///         .unwrap();
/// let policy: RetryPolicy<std::io::Error> = config.into_policy().unwrap();
/// assert_eq!(policy.max_attempts(), 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct PolicyConfig {
    /// Total attempts, the first one included.
    pub max_attempts: usize,
    /// Delay before the second attempt, in milliseconds.
    pub delay_ms: u64,
    /// Growth factor of the delay.
    pub multiplier: f32,
    /// Cap of any single delay, in milliseconds.
    pub max_delay_ms: Option<u64>,
    /// Randomly stretch delays.
    pub jitter: bool,
}

fn whole_millis(dur: Duration) -> u64 {
    u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: whole_millis(DEFAULT_DELAY),
            multiplier: 1.0,
            max_delay_ms: None,
            jitter: false,
        }
    }
}

impl PolicyConfig {
    /// Validate into a policy that treats every failure as retryable.
    ///
    /// Use [`RetryPolicy::builder`] instead when a retry predicate is needed.
    pub fn into_policy<E>(self) -> Result<RetryPolicy<E>, PolicyError> {
        let mut builder = RetryPolicy::builder()
            .max_attempts(self.max_attempts)
            .initial_delay(Duration::from_millis(self.delay_ms))
            .multiplier(self.multiplier)
            .jitter(self.jitter);
        if let Some(max_delay_ms) = self.max_delay_ms {
            builder = builder.max_delay(Duration::from_millis(max_delay_ms));
        }
        builder.build()
    }
}

impl<E> From<&RetryPolicy<E>> for PolicyConfig {
    fn from(policy: &RetryPolicy<E>) -> Self {
        PolicyConfig {
            max_attempts: policy.max_attempts(),
            delay_ms: whole_millis(policy.initial_delay()),
            multiplier: policy.multiplier(),
            max_delay_ms: policy.max_delay().map(whole_millis),
            jitter: policy.jitter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_default_policy() {
        let policy: RetryPolicy<()> = PolicyConfig::default().into_policy().unwrap();
        let default = RetryPolicy::<()>::default();
        assert_eq!(policy.backoff_builder(), default.backoff_builder());
        assert_eq!(policy.max_attempts(), default.max_attempts());
    }

    #[test]
    fn test_into_policy() {
        let config = PolicyConfig {
            max_attempts: 6,
            delay_ms: 5000,
            multiplier: 1.0,
            max_delay_ms: Some(5000),
            jitter: false,
        };
        let policy: RetryPolicy<()> = config.clone().into_policy().unwrap();
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.initial_delay(), Duration::from_secs(5));
        assert_eq!(policy.max_delay(), Some(Duration::from_secs(5)));
        assert_eq!(PolicyConfig::from(&policy), config);
    }

    #[test]
    fn test_from_policy_keeps_whole_millis() {
        let policy: RetryPolicy<()> = RetryPolicy::builder()
            .initial_delay(Duration::from_micros(2500))
            .max_delay(Duration::MAX)
            .build()
            .unwrap();
        let config = PolicyConfig::from(&policy);
        assert_eq!(config.delay_ms, 2);
        assert_eq!(config.max_delay_ms, Some(u64::MAX));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PolicyConfig {
            max_attempts: 0,
            ..PolicyConfig::default()
        };
        assert_eq!(
            config.into_policy::<()>().unwrap_err(),
            PolicyError::ZeroAttempts
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_with_defaults() {
        let config: PolicyConfig =
            serde_json::from_str(r#"{ "max_attempts": 5, "multiplier": 2.0 }"#).unwrap();
        assert_eq!(
            config,
            PolicyConfig {
                max_attempts: 5,
                multiplier: 2.0,
                ..PolicyConfig::default()
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let err = serde_json::from_str::<PolicyConfig>(r#"{ "retries": 5 }"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"), "{err}");
    }
}
