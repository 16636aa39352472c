use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use super::{lock, now, RateLimiter};

/// Caps requests per key per UTC calendar day. Records are keyed by
/// `"{key}:{YYYY-MM-DD}"`, so a new day starts from zero.
pub struct DailyCapLimiter {
    limit: u32,
    records: Mutex<HashMap<String, u32>>,
}

impl DailyCapLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn admit_at(&self, key: &str, at: OffsetDateTime) -> bool {
        let day_key = day_key(key, at.date());
        let mut records = lock(&self.records);
        let count = records.entry(day_key).or_insert(0);
        if *count >= self.limit {
            return false;
        }
        *count += 1;
        true
    }

    /// Drops every record not belonging to `at`'s date.
    pub fn sweep_at(&self, at: OffsetDateTime) {
        let suffix = format!(":{}", at.date());
        lock(&self.records).retain(|k, _| k.ends_with(&suffix));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.records).len()
    }
}

fn day_key(key: &str, date: Date) -> String {
    // `Date`'s Display is ISO 8601 (YYYY-MM-DD)
    format!("{key}:{date}")
}

#[async_trait]
impl RateLimiter for DailyCapLimiter {
    async fn admit(&self, key: &str) -> bool {
        self.admit_at(key, now())
    }

    async fn sweep(&self) {
        self.sweep_at(now())
    }
}
