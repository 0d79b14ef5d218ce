use std::sync::atomic::{AtomicUsize, Ordering};

use rebound_macros::retryable;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum SendError {
    Unavailable,
}

/// Sends messages, retrying up to five times with exponential backoff and
/// reporting `false` once every attempt failed.
struct DeclarativeRetryService {
    attempts: AtomicUsize,
}

impl DeclarativeRetryService {
    fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }

    #[retryable(
        max_attempts = 5,
        delay = 200,
        multiplier = 2.0,
        sleep = tokio::time::sleep,
        recover = Self::send_message_callback
    )]
    async fn send_message(&self, message: String) -> Result<bool, SendError> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt <= 3 {
            info!(attempt, "send failed");
            return Err(SendError::Unavailable);
        }
        info!(message, "message sent");
        Ok(true)
    }

    fn send_message_callback(&self, err: SendError) -> Result<bool, SendError> {
        error!(?err, "message send failed");
        Ok(false)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("rebound=debug".parse().unwrap()),
        )
        .init();

    let service = DeclarativeRetryService::new();
    let sent = service.send_message("hello world".to_string()).await;
    info!(?sent, "finished");
}
