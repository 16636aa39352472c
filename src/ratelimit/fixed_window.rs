use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{lock, now, RateLimiter};

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    start: OffsetDateTime,
}

/// Counts requests per key; the count resets once `window` has passed since
/// the first request of the current window.
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    records: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn admit_at(&self, key: &str, at: OffsetDateTime) -> bool {
        let mut records = lock(&self.records);
        let entry = records
            .entry(key.to_string())
            .or_insert(Window { count: 0, start: at });

        if at - entry.start >= self.window {
            *entry = Window { count: 0, start: at };
        }
        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }

    pub fn sweep_at(&self, at: OffsetDateTime) {
        lock(&self.records).retain(|_, w| at - w.start < self.window);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.records).len()
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn admit(&self, key: &str) -> bool {
        self.admit_at(key, now())
    }

    async fn sweep(&self) {
        self.sweep_at(now())
    }
}
