// SPDX-License-Identifier: PMPL-1.0-or-later

//! Token bucket guarding paid or quota-limited prover backends
//!
//! The bucket starts full, refills continuously at `refill_per_sec` and never
//! holds more than `capacity` tokens. Callers fail fast when it is empty. A
//! refill rate of zero makes the capacity a fixed quota.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::error::{Result, TdfolError};

/// Bucket size and refill rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub capacity: u32,
    /// Tokens added per second; zero for a quota that never refills
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            capacity: 10,
            refill_per_sec: 0.5,
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(TdfolError::config("rate_limit.capacity must be at least 1"));
        }
        if !(self.refill_per_sec.is_finite() && self.refill_per_sec >= 0.0) {
            return Err(TdfolError::config("rate_limit.refill_per_sec must be finite and not negative"));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Shared token bucket
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Negative or non-finite rates are treated as no refill
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        let refill_per_sec = if refill_per_sec.is_finite() && refill_per_sec > 0.0 {
            refill_per_sec
        } else {
            0.0
        };
        TokenBucket {
            capacity: capacity as f64,
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.capacity, config.refill_per_sec)
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
    }

    /// Take one token, or report how long until one is available
    pub fn try_acquire(&self) -> std::result::Result<(), Duration> {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - state.tokens;
            Err(Duration::try_from_secs_f64(missing / self.refill_per_sec).unwrap_or(Duration::MAX))
        }
    }

    /// Like [`try_acquire`](Self::try_acquire), as a crate error
    pub fn acquire(&self) -> Result<()> {
        self.try_acquire().map_err(|wait| TdfolError::RateLimited {
            retry_after_ms: u64::try_from(wait.as_millis().max(1)).unwrap_or(u64::MAX),
        })
    }

    /// Whole tokens currently available
    pub fn available(&self) -> u32 {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());
        state.tokens.floor() as u32
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_drains_and_reports_wait() {
        let bucket = TokenBucket::new(2, 0.001);
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_ok());
        let wait = bucket.try_acquire().unwrap_err();
        assert!(wait > Duration::from_secs(100));
        assert!(matches!(bucket.acquire(), Err(TdfolError::RateLimited { .. })));
    }

    #[test]
    fn test_bucket_refills_up_to_capacity() {
        let bucket = TokenBucket::new(3, 1000.0);
        for _ in 0..3 {
            bucket.try_acquire().unwrap();
        }
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(bucket.available(), 3);
    }

    #[test]
    fn test_zero_refill_is_a_fixed_quota() {
        let bucket = TokenBucket::new(1, 0.0);
        assert!(bucket.try_acquire().is_ok());
        assert_eq!(bucket.try_acquire(), Err(Duration::MAX));
        match bucket.acquire() {
            Err(TdfolError::RateLimited { retry_after_ms }) => assert_eq!(retry_after_ms, u64::MAX),
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[test]
    fn test_tiny_and_invalid_rates_do_not_overflow() {
        for rate in [1e-300, -1.0, f64::NAN, f64::INFINITY] {
            let bucket = TokenBucket::new(1, rate);
            bucket.try_acquire().unwrap();
            assert!(bucket.acquire().is_err());
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(RateLimitConfig::default().validate().is_ok());
        let quota = RateLimitConfig {
            capacity: 1,
            refill_per_sec: 0.0,
        };
        assert!(quota.validate().is_ok());
        let bad = RateLimitConfig {
            capacity: 1,
            refill_per_sec: f64::NAN,
        };
        assert!(bad.validate().is_err());
    }
}
