pub mod bucket;

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, TrackerError};
use bucket::TokenBucket;

pub const DEFAULT_CALLS: u32 = 30;
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Throttles outbound calls through one shared token bucket.
#[derive(Debug)]
pub struct RequestGate {
    bucket: Mutex<TokenBucket>,
    max_wait: Option<Duration>,
}

impl RequestGate {
    pub fn new(calls: u32, period: Duration) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(calls, period)),
            max_wait: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    fn acquire(&self) -> Duration {
        // the lock only covers the refill arithmetic, never an await
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        bucket.acquire()
    }

    /// Waits until a credit is available, then runs `call` exactly once.
    pub async fn run<F, Fut, T>(&self, call: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.wait_for_credit().await?;
        call().await
    }

    async fn wait_for_credit(&self) -> Result<()> {
        let mut waited = Duration::ZERO;
        loop {
            let wait = self.acquire();
            if wait.is_zero() {
                return Ok(());
            }
            if let Some(allowed) = self.max_wait {
                let needed = waited.saturating_add(wait);
                if needed > allowed {
                    return Err(TrackerError::RateLimited {
                        needed,
                        allowed,
                    });
                }
            }
            tracing::info!("Rate limit reached. Waiting {:.2} seconds", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
            waited = waited.saturating_add(wait);
        }
    }
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(DEFAULT_CALLS, DEFAULT_PERIOD)
    }
}
