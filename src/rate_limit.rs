//! Best-effort request throttling for credential endpoints. Counters live in
//! process memory and reset on restart.

use dashmap::DashMap;

use crate::{auth::clock::SharedClock, config::RateLimitConfig};

pub trait RateLimiter: Send + Sync {
    /// Records one hit for `key` and reports whether it is within budget.
    fn allow(&self, key: &str) -> bool;

    /// Drops state that can no longer affect a decision. Returns entries removed.
    fn prune(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: i64,
    hits: u32,
}

/// Fixed window: `max_requests` hits per `window_secs`, per key.
pub struct InMemoryRateLimiter {
    windows: DashMap<String, Window>,
    clock: SharedClock,
    max_requests: u32,
    window_secs: i64,
}

impl InMemoryRateLimiter {
    pub fn new(cfg: &RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            windows: DashMap::new(),
            clock,
            max_requests: cfg.max_requests,
            window_secs: i64::try_from(cfg.window_secs).unwrap_or(i64::MAX),
        }
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn allow(&self, key: &str) -> bool {
        let now = self.clock.unix();
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            hits: 0,
        });

        if now - entry.started_at >= self.window_secs {
            *entry = Window {
                started_at: now,
                hits: 0,
            };
        }

        if entry.hits >= self.max_requests {
            tracing::warn!(key = %key, "rate limit exceeded");
            return false;
        }
        entry.hits += 1;
        true
    }

    fn prune(&self) -> usize {
        let now = self.clock.unix();
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now - window.started_at < self.window_secs);
        before.saturating_sub(self.windows.len())
    }
}

/// Used when rate limiting is disabled.
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn allow(&self, _key: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::{InMemoryRateLimiter, RateLimiter, Unlimited};
    use crate::{auth::clock::ManualClock, config::RateLimitConfig};

    fn limiter(max_requests: u32) -> (InMemoryRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_unix(1_000));
        let cfg = RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs: 60,
            trust_forwarded_for: false,
        };
        (InMemoryRateLimiter::new(&cfg, clock.clone()), clock)
    }

    #[test]
    fn blocks_after_budget_until_window_rolls() {
        let (limiter, clock) = limiter(2);
        assert!(limiter.allow("sign-in:10.0.0.1"));
        assert!(limiter.allow("sign-in:10.0.0.1"));
        assert!(!limiter.allow("sign-in:10.0.0.1"));
        assert!(limiter.allow("sign-in:10.0.0.2"), "keys are independent");

        clock.advance(Duration::seconds(60));
        assert!(limiter.allow("sign-in:10.0.0.1"));
    }

    #[test]
    fn prune_drops_closed_windows() {
        let (limiter, clock) = limiter(5);
        limiter.allow("a");
        limiter.allow("b");
        clock.advance(Duration::seconds(61));
        limiter.allow("c");

        assert_eq!(limiter.prune(), 2);
    }

    #[test]
    fn unlimited_always_allows() {
        assert!((0..1000).all(|_| Unlimited.allow("k")));
    }
}
