use rebound_macros::retryable;

#[retryable]
async fn attempt_async(value: String) -> Result<usize, &'static str> {
    if value.is_empty() {
        Err("empty")
    } else {
        Ok(value.len())
    }
}

fn main() {
    let _ = attempt_async("data".to_string());
}
