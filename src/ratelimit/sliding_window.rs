use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{lock, now, RateLimiter};

/// Keeps the timestamps of admitted requests and admits while fewer than
/// `limit` of them fall inside the trailing `window`.
pub struct SlidingWindowLimiter {
    limit: u32,
    window: Duration,
    records: Mutex<HashMap<String, VecDeque<OffsetDateTime>>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn admit_at(&self, key: &str, at: OffsetDateTime) -> bool {
        let mut records = lock(&self.records);
        let stamps = records.entry(key.to_string()).or_default();

        // timestamps are pushed in arrival order
        while stamps.front().is_some_and(|t| at - *t >= self.window) {
            stamps.pop_front();
        }
        if stamps.len() >= self.limit as usize {
            return false;
        }
        stamps.push_back(at);
        true
    }

    pub fn sweep_at(&self, at: OffsetDateTime) {
        lock(&self.records).retain(|_, stamps| {
            stamps.retain(|t| at - *t < self.window);
            !stamps.is_empty()
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.records).len()
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn admit(&self, key: &str) -> bool {
        self.admit_at(key, now())
    }

    async fn sweep(&self) {
        self.sweep_at(now())
    }
}
