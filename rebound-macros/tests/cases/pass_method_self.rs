use rebound_macros::retryable;

struct Client {
    value: i32,
}

impl Client {
    fn fallback(&self, _: &'static str) -> Result<i32, &'static str> {
        Ok(-self.value)
    }

    #[retryable(max_attempts = 2, delay = 1, recover = Self::fallback)]
    fn fetch_sync(&self, offset: i32) -> Result<i32, &'static str> {
        if offset < 0 { Err("negative") } else { Ok(self.value + offset) }
    }

    #[retryable(delay = 1)]
    async fn fetch_async(&self) -> Result<i32, &'static str> {
        let value = self.fetch_sync(0)?;
        Ok(value)
    }

    #[retryable(max_attempts = 1)]
    fn build(value: i32) -> Result<Self, &'static str> {
        Ok(Self { value })
    }
}

fn main() {
    let client = Client::build(7).unwrap();
    assert_eq!(client.fetch_sync(1), Ok(8));
    assert_eq!(client.fetch_sync(-1), Ok(-7));
    let _ = client.fetch_async();
}
