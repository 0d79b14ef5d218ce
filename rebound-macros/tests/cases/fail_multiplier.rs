use rebound_macros::retryable;

#[retryable(multiplier = 0.5)]
fn send() -> Result<(), ()> {
    Ok(())
}

fn main() {}
