use rebound_macros::retryable;

fn parse(input: &str) -> Result<i32, String> {
    input.parse().map_err(|_| format!("not a number: {input}"))
}

#[retryable(max_attempts = 2, delay = 1)]
fn attempt_sync(input: String) -> Result<i32, String> {
    let value = parse(&input)?;
    Ok(value * 2)
}

fn main() {
    assert_eq!(attempt_sync("21".to_string()), Ok(42));
    assert!(attempt_sync("x".to_string()).is_err());
}
