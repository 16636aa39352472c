//! Per-key admission gates.
//!
//! Every limiter answers one question, `admit(key)`, and records the request
//! when it says yes. The in-memory implementations keep their records for the
//! life of the process; a shared store (Redis and the like) can implement the
//! same trait when the service runs as several instances.

mod daily_cap;
mod fixed_window;
mod sliding_window;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, info};

pub use daily_cap::DailyCapLimiter;
pub use fixed_window::FixedWindowLimiter;
pub use sliding_window::SlidingWindowLimiter;

use crate::config::{RateLimitConfig, WindowStrategy};

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Returns `true` and counts the request if `key` is under its limit.
    async fn admit(&self, key: &str) -> bool;

    /// Drops records that can no longer affect an admission decision.
    async fn sweep(&self) {}
}

pub type SharedLimiter = Arc<dyn RateLimiter>;

/// Builds the IP gate, or `None` when its limit is 0.
pub fn ip_limiter(cfg: &RateLimitConfig) -> Option<SharedLimiter> {
    if cfg.ip_limit == 0 {
        return None;
    }
    let limiter: SharedLimiter = match cfg.ip_strategy {
        WindowStrategy::Fixed => Arc::new(FixedWindowLimiter::new(cfg.ip_limit, cfg.ip_window)),
        WindowStrategy::Sliding => {
            Arc::new(SlidingWindowLimiter::new(cfg.ip_limit, cfg.ip_window))
        }
    };
    Some(limiter)
}

/// Builds the per-email daily gate, or `None` when its limit is 0.
pub fn email_limiter(cfg: &RateLimitConfig) -> Option<SharedLimiter> {
    (cfg.email_daily_limit > 0)
        .then(|| Arc::new(DailyCapLimiter::new(cfg.email_daily_limit)) as SharedLimiter)
}

/// Periodically evicts stale records from every configured limiter.
pub fn spawn_sweeper(limiters: Vec<SharedLimiter>, every: Duration) {
    if limiters.is_empty() || every.is_zero() {
        return;
    }
    info!(period_secs = every.as_secs(), "starting rate-limit sweeper");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for limiter in &limiters {
                limiter.sweep().await;
            }
            debug!("rate-limit records swept");
        }
    });
}

pub(crate) fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// A poisoned map is still a valid map of counters; keep serving.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
