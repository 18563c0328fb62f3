//! Fixed-window rate limiting.
//!
//! One [`RateLimiter`] owns the counter table for the whole process. Callers
//! that need their own budget (contact form, authenticated writes, the
//! pipeline's per-route IP gate) get a [`ScopedLimiter`] which prefixes every
//! key with its namespace, so concerns share storage but never counts.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::observability::metrics;
use crate::security::store::{MemoryStore, RateStore, WindowRecord};

/// Default number of checks between opportunistic sweeps of expired records.
pub const DEFAULT_SWEEP_EVERY: u64 = 64;

/// Rejected rule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("limit must be greater than zero")]
    ZeroLimit,
    #[error("window_ms must be greater than zero")]
    ZeroWindow,
}

/// How many hits a key may spend per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    limit: NonZeroU32,
    window: Duration,
}

impl RateLimitRule {
    pub fn new(limit: u32, window_ms: u64) -> Result<Self, RuleError> {
        let limit = NonZeroU32::new(limit).ok_or(RuleError::ZeroLimit)?;
        if window_ms == 0 {
            return Err(RuleError::ZeroWindow);
        }
        Ok(Self {
            limit,
            window: Duration::from_millis(window_ms),
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit.get()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl fmt::Display for RateLimitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}ms", self.limit, self.window.as_millis())
    }
}

/// Result of a single [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub success: bool,
    pub remaining: u32,
    pub reset_at: Instant,
}

impl RateLimitOutcome {
    /// Time until the window closes.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }

    /// Whole seconds until the window closes, rounded up and never zero, as
    /// sent in a `Retry-After` header.
    pub fn retry_after_secs(&self, now: Instant) -> u64 {
        let wait = self.retry_after(now);
        let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        secs.max(1)
    }
}

/// Fixed-window hit counter over a pluggable [`RateStore`].
pub struct RateLimiter {
    store: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
    sweep_every: u64,
    checks: AtomicU64,
}

impl RateLimiter {
    /// In-memory limiter on the system clock.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(MemoryStore::new()), Arc::new(SystemClock), DEFAULT_SWEEP_EVERY)
    }

    pub fn with_parts(store: Arc<dyn RateStore>, clock: Arc<dyn Clock>, sweep_every: u64) -> Self {
        Self {
            store,
            clock,
            sweep_every: sweep_every.max(1),
            checks: AtomicU64::new(0),
        }
    }

    /// Count a hit for `key` and report whether it fits inside `rule`.
    ///
    /// Denied hits do not consume budget. The read-modify-write of the key's
    /// record runs under the store's per-key exclusion, so callers racing on
    /// the last slot of a window cannot both succeed.
    pub fn check(&self, key: &str, rule: &RateLimitRule) -> RateLimitOutcome {
        let now = self.clock.now();
        self.maybe_sweep(now);

        let limit = rule.limit();
        let mut outcome = RateLimitOutcome {
            success: false,
            remaining: 0,
            reset_at: now + rule.window(),
        };

        self.store.update(key, &mut |slot| {
            outcome = match slot {
                Some(record) if !record.is_expired(now) => {
                    if record.count < limit {
                        record.count += 1;
                        RateLimitOutcome {
                            success: true,
                            remaining: limit - record.count,
                            reset_at: record.reset_at,
                        }
                    } else {
                        RateLimitOutcome {
                            success: false,
                            remaining: 0,
                            reset_at: record.reset_at,
                        }
                    }
                }
                _ => {
                    let fresh = WindowRecord {
                        count: 1,
                        reset_at: now + rule.window(),
                    };
                    *slot = Some(fresh);
                    RateLimitOutcome {
                        success: true,
                        remaining: limit - 1,
                        reset_at: fresh.reset_at,
                    }
                }
            };
        });

        outcome
    }

    /// Give a concern its own key space with a fixed rule.
    pub fn scoped(self: &Arc<Self>, namespace: impl Into<String>, rule: RateLimitRule) -> ScopedLimiter {
        ScopedLimiter {
            namespace: Arc::from(namespace.into()),
            rule,
            limiter: Arc::clone(self),
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Number of records currently held by the store.
    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    fn maybe_sweep(&self, now: Instant) {
        let n = self.checks.fetch_add(1, Ordering::Relaxed);
        if n % self.sweep_every != 0 {
            return;
        }
        let removed = self.store.purge_expired(now);
        if removed > 0 {
            tracing::trace!(removed, "Swept expired rate windows");
        }
        metrics::record_rate_records(self.store.len());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("store", &self.store)
            .field("sweep_every", &self.sweep_every)
            .finish()
    }
}

/// A namespaced view over a shared [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct ScopedLimiter {
    namespace: Arc<str>,
    rule: RateLimitRule,
    limiter: Arc<RateLimiter>,
}

impl ScopedLimiter {
    /// Count a hit for `subject` (an IP, a user id) within this namespace.
    pub fn check(&self, subject: &str) -> RateLimitOutcome {
        let key = format!("{}:{}", self.namespace, subject);
        self.limiter.check(&key, &self.rule)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn rule(&self) -> RateLimitRule {
        self.rule
    }

    pub fn now(&self) -> Instant {
        self.limiter.now()
    }
}
