// auth/rate_limit.rs - failed login throttling per username

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    failures: u32,
    started: Instant,
}

/// Counts failed logins per (normalized) username inside a fixed window.
/// Once `max_attempts` failures are recorded, further attempts are refused until the window ends.
#[derive(Debug)]
pub struct LoginRateLimiter {
    max_attempts: u32,
    window: Duration,
    attempts: Mutex<HashMap<String, AttemptWindow>>,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config() -> Self {
        let security = &crate::config::config().security;
        Self::new(security.login_max_attempts, Duration::from_secs(security.login_window_secs))
    }

    fn key(username: &str) -> String {
        username.trim().to_lowercase()
    }

    /// `Err(retry_after)` while the username is locked out
    pub async fn check(&self, username: &str) -> Result<(), Duration> {
        self.check_at(username, Instant::now()).await
    }

    async fn check_at(&self, username: &str, now: Instant) -> Result<(), Duration> {
        let mut attempts = self.attempts.lock().await;
        let key = Self::key(username);
        let current = attempts.get(&key).copied();
        match current {
            Some(window) if now.duration_since(window.started) >= self.window => {
                attempts.remove(&key);
                Ok(())
            }
            Some(window) if window.failures >= self.max_attempts => {
                Err(self.window.saturating_sub(now.duration_since(window.started)))
            }
            _ => Ok(()),
        }
    }

    pub async fn record_failure(&self, username: &str) {
        self.record_failure_at(username, Instant::now()).await
    }

    async fn record_failure_at(&self, username: &str, now: Instant) {
        let mut attempts = self.attempts.lock().await;
        let entry = attempts
            .entry(Self::key(username))
            .or_insert(AttemptWindow { failures: 0, started: now });
        if now.duration_since(entry.started) >= self.window {
            *entry = AttemptWindow { failures: 0, started: now };
        }
        entry.failures += 1;
        if entry.failures == self.max_attempts {
            tracing::warn!("Login locked for '{}' after {} failed attempts", username, entry.failures);
        }
    }

    pub async fn reset(&self, username: &str) {
        self.attempts.lock().await.remove(&Self::key(username));
    }

    /// Drop windows that have run out
    pub async fn prune(&self) -> usize {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().await;
        let before = attempts.len();
        attempts.retain(|_, w| now.duration_since(w.started) < self.window);
        before - attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn locks_after_max_failures() {
        let limiter = LoginRateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("Anna", start).await.is_ok());
            limiter.record_failure_at("anna ", start).await;
        }
        let retry = limiter.check_at("ANNA", start + Duration::from_secs(10)).await.unwrap_err();
        assert_eq!(retry, Duration::from_secs(50));
        assert!(limiter.check_at("bernd", start).await.is_ok());
    }

    #[tokio::test]
    async fn window_expiry_unlocks() {
        let limiter = LoginRateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        limiter.record_failure_at("x", start).await;
        limiter.record_failure_at("x", start).await;
        assert!(limiter.check_at("x", start + Duration::from_secs(59)).await.is_err());
        assert!(limiter.check_at("x", start + Duration::from_secs(60)).await.is_ok());
    }

    #[tokio::test]
    async fn reset_clears_failures() {
        let limiter = LoginRateLimiter::new(1, Duration::from_secs(60));
        limiter.record_failure("y").await;
        assert!(limiter.check("y").await.is_err());
        limiter.reset("y").await;
        assert!(limiter.check("y").await.is_ok());
    }
}
