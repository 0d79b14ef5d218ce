use rebound_macros::retryable;

struct Counter {
    value: usize,
}

impl Counter {
    #[retryable]
    fn bump(&mut self) -> Result<usize, ()> {
        self.value += 1;
        Ok(self.value)
    }
}

fn main() {
    let _ = Counter { value: 0 }.value;
}
