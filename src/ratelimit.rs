//! Rate limiter (C9): an in-process token bucket keyed by
//! `(tenantId, actorId)`, shaped after `auth9-core`'s
//! `RateLimitConfig`/`RateLimitRule`/`RateLimitKey` design with the Redis
//! sliding window replaced by a `dashmap`-backed bucket (§12 of
//! `SPEC_FULL.md`).

use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RateLimitRule {
    pub capacity: u64,
    pub refill_per_sec: u64,
}

impl Default for RateLimitRule {
    fn default() -> Self {
        RateLimitRule {
            capacity: 100,
            refill_per_sec: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub tenant_id: String,
    pub actor_id: String,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimitResult {
    pub allowed: bool,
    pub retry_after_secs: u64,
}

/// A process-wide token bucket map. One instance is shared across the
/// whole server (spec.md §5: "rate-limiter bucket map = concurrent map").
pub struct RateLimiter {
    rule: RateLimitRule,
    buckets: DashMap<RateLimitKey, Bucket>,
}

impl RateLimiter {
    pub fn new(rule: RateLimitRule) -> Self {
        RateLimiter {
            rule,
            buckets: DashMap::new(),
        }
    }

    pub fn check(&self, key: RateLimitKey) -> RateLimitResult {
        let mut entry = self.buckets.entry(key).or_insert_with(|| Bucket {
            tokens: self.rule.capacity as f64,
            last_refill: Instant::now(),
        });

        let elapsed = entry.last_refill.elapsed();
        let refill = elapsed.as_secs_f64() * self.rule.refill_per_sec as f64;
        entry.tokens = (entry.tokens + refill).min(self.rule.capacity as f64);
        entry.last_refill = Instant::now();

        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            RateLimitResult {
                allowed: true,
                retry_after_secs: 0,
            }
        } else {
            let deficit = 1.0 - entry.tokens;
            let wait_secs = (deficit / self.rule.refill_per_sec.max(1) as f64).ceil() as u64;
            RateLimitResult {
                allowed: false,
                retry_after_secs: wait_secs.max(1),
            }
        }
    }
}

/// Sweeps buckets untouched for longer than `idle_after` so the map
/// doesn't grow unbounded with one-shot tenants (spec.md doesn't mandate
/// this, but an ever-growing process-wide map would violate its own
/// resource-model intent).
pub fn sweep_idle(limiter: &RateLimiter, idle_after: Duration) {
    limiter
        .buckets
        .retain(|_, bucket| bucket.last_refill.elapsed() < idle_after);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tenant: &str) -> RateLimitKey {
        RateLimitKey {
            tenant_id: tenant.into(),
            actor_id: "actor-1".into(),
        }
    }

    #[test]
    fn allows_requests_within_capacity() {
        let limiter = RateLimiter::new(RateLimitRule {
            capacity: 3,
            refill_per_sec: 1,
        });
        for _ in 0..3 {
            assert!(limiter.check(key("t1")).allowed);
        }
    }

    #[test]
    fn rejects_once_capacity_exhausted() {
        let limiter = RateLimiter::new(RateLimitRule {
            capacity: 1,
            refill_per_sec: 1,
        });
        assert!(limiter.check(key("t1")).allowed);
        let result = limiter.check(key("t1"));
        assert!(!result.allowed);
        assert!(result.retry_after_secs >= 1);
    }

    #[test]
    fn tenants_are_isolated() {
        let limiter = RateLimiter::new(RateLimitRule {
            capacity: 1,
            refill_per_sec: 1,
        });
        assert!(limiter.check(key("t1")).allowed);
        assert!(limiter.check(key("t2")).allowed);
    }
}
