use rebound_macros::retryable;

#[retryable(retries = 3)]
fn send() -> Result<(), ()> {
    Ok(())
}

fn main() {}
