use rebound_macros::retryable;

#[retryable(max_attempts = 0)]
fn send() -> Result<(), ()> {
    Ok(())
}

fn main() {}
