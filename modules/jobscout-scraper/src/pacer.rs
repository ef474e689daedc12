//! Request pacing between descriptors.
//!
//! A jittered-interval limiter: each `wait` enforces a randomized gap
//! (within a bounded window) since the previous acquisition. The clock is
//! injected so tests can drive it without real sleeps.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct RatePacer {
    min_gap: Duration,
    max_gap: Duration,
    clock: Arc<dyn Clock>,
    last: Mutex<Option<Instant>>,
}

impl RatePacer {
    pub fn new(min_gap: Duration, max_gap: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_gap,
            max_gap: max_gap.max(min_gap),
            clock,
            last: Mutex::new(None),
        }
    }

    /// Wait until a jittered gap has elapsed since the previous call.
    /// The first call never waits.
    pub async fn wait(&self) {
        let gap = self.jittered_gap();
        let now = self.clock.now();
        let due = {
            let last = self.last.lock().expect("pacer lock");
            last.map(|prev| prev + gap)
        };

        if let Some(due) = due {
            if due > now {
                self.clock.sleep(due - now).await;
            }
        }

        *self.last.lock().expect("pacer lock") = Some(self.clock.now());
    }

    fn jittered_gap(&self) -> Duration {
        if self.max_gap <= self.min_gap {
            return self.min_gap;
        }
        let span_ms = (self.max_gap - self.min_gap).as_millis() as u64;
        let jitter = rand::rng().random_range(0..=span_ms);
        self.min_gap + Duration::from_millis(jitter)
    }
}
