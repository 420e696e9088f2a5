//! Sliding-window admission control with bounded memory.
//!
//! Only accepted attempts are recorded against the window, so a burst of
//! rejections does not erode the caller's remaining budget. Storage is
//! capped and TTL'd so many distinct keys cannot grow memory unbounded.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;

/// Keyed attempt storage. `try_acquire` must be atomic per key: count
/// the accepted attempts inside the window and append the new one in a
/// single step (a per-key lock here, a scripted command on an external
/// store).
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn try_acquire(&self, key: &str, limit: u32, window_ms: i64, now_ms: i64) -> bool;
}

/// In-process store: a capacity-bounded, TTL'd cache of per-key
/// timestamp lists, least-recently-touched keys evicted first.
pub struct MemoryRateLimitStore {
    windows: Cache<String, Arc<Mutex<Vec<i64>>>>,
}

impl MemoryRateLimitStore {
    pub fn new(max_keys: u64, ttl: Duration) -> Self {
        assert!(max_keys > 0, "Rate limit store capacity must be positive");
        assert!(ttl >= Duration::from_secs(1), "Rate limit TTL must be >= 1s");
        let windows = Cache::builder()
            .max_capacity(max_keys)
            .time_to_idle(ttl)
            .build();
        Self { windows }
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn try_acquire(&self, key: &str, limit: u32, window_ms: i64, now_ms: i64) -> bool {
        let entry = self
            .windows
            .get_with(key.to_string(), || Arc::new(Mutex::new(Vec::new())));

        let mut timestamps = entry.lock().expect("rate limit window lock poisoned");
        let window_start = now_ms - window_ms;
        timestamps.retain(|ts| *ts > window_start);

        if timestamps.len() >= limit as usize {
            // Rejected attempts are not recorded and consume no budget
            return false;
        }

        timestamps.push(now_ms);
        true
    }
}

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, window: Duration) -> Self {
        assert!(
            window >= Duration::from_millis(100),
            "Rate limit window below 100ms is meaningless"
        );
        assert!(
            window <= Duration::from_secs(3_600),
            "Rate limit window exceeds one hour"
        );
        Self { store, window }
    }

    /// Admits the attempt if fewer than `limit` accepted attempts fall
    /// inside the trailing window for `key`.
    pub async fn check(&self, limit: u32, key: &str) -> bool {
        self.check_at(limit, key, chrono::Utc::now().timestamp_millis())
            .await
    }

    pub async fn check_at(&self, limit: u32, key: &str, now_ms: i64) -> bool {
        if limit == 0 {
            return false;
        }
        let window_ms = i64::try_from(self.window.as_millis()).expect("window bounded");
        self.store.try_acquire(key, limit, window_ms, now_ms).await
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    fn limiter() -> RateLimiter {
        let store = Arc::new(MemoryRateLimitStore::new(10_000, WINDOW));
        RateLimiter::new(store, WINDOW)
    }

    #[tokio::test]
    async fn admits_up_to_limit_then_denies() {
        let limiter = limiter();
        let now = 1_000_000;

        assert!(limiter.check_at(3, "k", now).await);
        assert!(limiter.check_at(3, "k", now + 1).await);
        assert!(limiter.check_at(3, "k", now + 2).await);
        assert!(!limiter.check_at(3, "k", now + 3).await);
    }

    #[tokio::test]
    async fn window_elapse_restores_budget() {
        let limiter = limiter();
        let now = 1_000_000;
        for offset in 0..3 {
            assert!(limiter.check_at(3, "k", now + offset).await);
        }
        assert!(!limiter.check_at(3, "k", now + 10).await);

        let after_window = now + WINDOW.as_millis() as i64 + 3;
        assert!(limiter.check_at(3, "k", after_window).await);
    }

    #[tokio::test]
    async fn rejections_do_not_consume_budget() {
        let limiter = limiter();
        let now = 1_000_000;
        assert!(limiter.check_at(1, "k", now).await);

        // Hammering while denied must not extend the lockout
        for offset in 1..50 {
            assert!(!limiter.check_at(1, "k", now + offset).await);
        }
        let after_window = now + WINDOW.as_millis() as i64 + 1;
        assert!(limiter.check_at(1, "k", after_window).await);
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let limiter = limiter();
        let now = 1_000_000;
        assert!(limiter.check_at(1, "a", now).await);
        assert!(!limiter.check_at(1, "a", now + 1).await);
        assert!(limiter.check_at(1, "b", now + 1).await);
    }

    #[tokio::test]
    async fn zero_limit_denies_everything() {
        let limiter = limiter();
        assert!(!limiter.check_at(0, "k", 1_000_000).await);
    }
}
