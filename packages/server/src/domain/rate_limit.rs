//! Per-connection token bucket.
//!
//! Refills continuously at `rate` tokens per second up to a burst capacity
//! equal to `rate`. Owned and mutated only by the connection's inbound loop.

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket allowing `per_second` messages per second.
    pub fn new(per_second: u32) -> Self {
        Self::new_at(per_second, Instant::now())
    }

    pub fn new_at(per_second: u32, now: Instant) -> Self {
        let rate = f64::from(per_second);
        Self {
            capacity: rate,
            tokens: rate,
            refill_per_sec: rate,
            last_refill: now,
        }
    }

    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Take one token if available, refilling first for the time elapsed
    /// since the previous call.
    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            self.last_refill = now;
        }
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_burst_up_to_capacity_then_reject() {
        // テスト項目: 満タンのバケットから rate 個までは即座に通過し、それ以降は拒否される
        // given (前提条件):
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(3, start);

        // when (操作):
        // 5 messages within 200 ms
        let results: Vec<bool> = (0..5)
            .map(|i| bucket.try_acquire_at(start + Duration::from_millis(i * 50)))
            .collect();

        // then (期待する結果):
        assert_eq!(results, vec![true, true, true, false, false]);
    }

    #[test]
    fn test_refill_is_continuous() {
        // テスト項目: トークンは経過時間に比例して連続的に補充される
        // given (前提条件):
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(2, start);
        assert!(bucket.try_acquire_at(start));
        assert!(bucket.try_acquire_at(start));
        assert!(!bucket.try_acquire_at(start));

        // when (操作):
        // 2 tokens/sec: one token after 500 ms
        let too_early = bucket.try_acquire_at(start + Duration::from_millis(400));
        let refilled = bucket.try_acquire_at(start + Duration::from_millis(600));

        // then (期待する結果):
        assert!(!too_early);
        assert!(refilled);
    }

    #[test]
    fn test_refill_is_capped_at_capacity() {
        // テスト項目: 長時間待ってもバースト上限を超えて貯まらない
        // given (前提条件):
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(3, start);
        let later = start + Duration::from_secs(3600);

        // when (操作):
        let accepted = (0..10).filter(|_| bucket.try_acquire_at(later)).count();

        // then (期待する結果):
        assert_eq!(accepted, 3);
    }

    #[test]
    fn test_rolling_window_never_exceeds_rate_plus_burst() {
        // テスト項目: 連続送信でも任意の 1 秒窓での通過数は rate + burst を超えない
        // given (前提条件):
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(3, start);

        // when (操作):
        // one attempt every 10 ms for 5 seconds
        let accepted_at: Vec<u64> = (0..500u64)
            .filter(|i| bucket.try_acquire_at(start + Duration::from_millis(i * 10)))
            .map(|i| i * 10)
            .collect();

        // then (期待する結果):
        for &window_start in &accepted_at {
            let in_window = accepted_at
                .iter()
                .filter(|&&t| t >= window_start && t < window_start + 1000)
                .count();
            assert!(in_window <= 6, "window at {window_start} had {in_window}");
        }
        // steady state is ~3/sec
        let last_second = accepted_at.iter().filter(|&&t| t >= 4000).count();
        assert!((2..=4).contains(&last_second));
    }
}
