use rebound::RetryPolicy;
use rebound_macros::retryable;

fn policy() -> RetryPolicy<()> {
    RetryPolicy::default()
}

#[retryable(policy = policy, max_attempts = 2)]
fn send() -> Result<(), ()> {
    Ok(())
}

fn main() {
    let _ = policy();
}
