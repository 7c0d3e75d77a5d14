use std::time::Duration;

use tokio::time::Instant;

// absorbs float drift left after sleeping exactly the returned wait
const CREDIT_EPSILON: f64 = 1e-9;

/// Token bucket holding fractional call credits.
///
/// Starts full. Credits accrue continuously at `capacity / period` per second
/// and never exceed `capacity`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    available: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, period: Duration) -> Self {
        Self::starting_at(capacity, period, Instant::now())
    }

    pub fn starting_at(capacity: u32, period: Duration, now: Instant) -> Self {
        let capacity = f64::from(capacity.max(1));
        let period = period.as_secs_f64().max(f64::EPSILON);
        Self {
            capacity,
            available: capacity,
            refill_per_sec: capacity / period,
            last_refill: now,
        }
    }

    pub fn acquire(&mut self) -> Duration {
        self.acquire_at(Instant::now())
    }

    /// Takes one credit if available and returns zero, otherwise returns how
    /// long until a whole credit has accrued. Nothing is consumed on a wait.
    pub fn acquire_at(&mut self, now: Instant) -> Duration {
        self.refill(now);
        if self.available + CREDIT_EPSILON >= 1.0 {
            self.available = (self.available - 1.0).max(0.0);
            return Duration::ZERO;
        }
        // very long periods can put the wait past what a Duration holds
        Duration::try_from_secs_f64((1.0 - self.available) / self.refill_per_sec)
            .unwrap_or(Duration::MAX)
    }

    #[cfg(test)]
    pub fn available_at(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.available
    }

    fn refill(&mut self, now: Instant) {
        // a `now` older than the last refill adds nothing
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.available = (self.available + elapsed * self.refill_per_sec).min(self.capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }
}
