use anyhow::Result;
use anyhow::anyhow;
use rebound::PolicyConfig;
use rebound::RetryExecutor;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Sends messages through a [`RetryExecutor`] built from JSON configuration.
struct ImperativeRetryService {
    executor: RetryExecutor<anyhow::Error>,
}

impl ImperativeRetryService {
    fn from_json(raw: &str) -> Result<Self> {
        let config: PolicyConfig = serde_json::from_str(raw)?;
        Ok(ImperativeRetryService {
            executor: RetryExecutor::new(config.into_policy()?),
        })
    }

    fn send_message(&self, message: &str) -> bool {
        let mut attempts = 0;
        let sent = self.executor.execute(
            || {
                attempts += 1;
                if attempts <= 3 {
                    Err(anyhow!("connection reset on attempt {attempts}"))
                } else {
                    info!(message, "message sent");
                    Ok(true)
                }
            },
            |err| {
                warn!(%err, "giving up on message");
                Ok(false)
            },
        );
        sent.unwrap_or(false)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rebound=debug".parse()?))
        .init();

    let service = ImperativeRetryService::from_json(r#"{ "max_attempts": 6, "delay_ms": 100 }"#)?;
    let sent = service.send_message("hello world");
    info!(sent, "done");
    Ok(())
}
