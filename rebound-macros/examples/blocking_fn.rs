use std::sync::atomic::{AtomicUsize, Ordering};

use rebound_macros::retryable;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct StoreError;

static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

fn store_failed(err: StoreError) -> Result<&'static str, StoreError> {
    error!(?err, "store aborted");
    Ok("not stored")
}

#[retryable(max_attempts = 6, delay = 500, recover = store_failed)]
fn store_value() -> Result<&'static str, StoreError> {
    let attempt = ATTEMPTS.fetch_add(1, Ordering::Relaxed) + 1;
    if attempt <= 3 {
        info!(attempt, "store failed");
        Err(StoreError)
    } else {
        Ok("stored")
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("rebound=debug".parse().unwrap()),
        )
        .init();

    match store_value() {
        Ok(value) => info!(value, "done"),
        Err(err) => error!(?err, "store failed"),
    }
}
