use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rebound_macros::retryable;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn log_retry(err: &FetchError, dur: Duration) {
    warn!(?err, ?dur, "retrying");
}

#[derive(Debug)]
struct FetchError {
    retryable: bool,
}

impl FetchError {
    fn retryable(err: &Self) -> bool {
        err.retryable
    }
}

static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

#[retryable(
    max_attempts = 4,
    delay = 200,
    multiplier = 2.0,
    sleep = tokio::time::sleep,
    when = FetchError::retryable,
    notify = log_retry
)]
async fn fetch_value(key: String) -> Result<String, FetchError> {
    let attempt = ATTEMPTS.fetch_add(1, Ordering::Relaxed);
    if attempt < 2 {
        Err(FetchError { retryable: true })
    } else {
        Ok(format!("value of {key}"))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("rebound=debug".parse().unwrap()),
        )
        .init();

    match fetch_value("greeting".to_string()).await {
        Ok(value) => info!(value, "fetched"),
        Err(err) => warn!(?err, "fetch failed"),
    }
}
