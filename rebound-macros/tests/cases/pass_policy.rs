use std::time::Duration;

use rebound::RetryPolicy;
use rebound_macros::retryable;

#[derive(Debug, PartialEq)]
enum StoreError {
    Locked,
    Corrupt,
}

fn store_policy() -> RetryPolicy<StoreError> {
    RetryPolicy::builder()
        .max_attempts(4)
        .fixed_delay(Duration::from_millis(1))
        .retry_if(|err: &StoreError| *err == StoreError::Locked)
        .build()
        .unwrap()
}

#[retryable(policy = store_policy)]
fn store(corrupt: bool) -> Result<(), StoreError> {
    if corrupt { Err(StoreError::Corrupt) } else { Ok(()) }
}

fn main() {
    assert_eq!(store(false), Ok(()));
    assert_eq!(store(true), Err(StoreError::Corrupt));
}
