//! Sliding-log rate limiter.
//!
//! Every admitted request leaves its arrival instant in the identifier's
//! window. A check prunes instants that fell out of the trailing window and
//! admits only while fewer than `max_requests` remain. The window is the
//! half-open interval `(now - window, now]`.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::RateLimitError;

// Recent admissions for one identifier, oldest first
#[derive(Debug, Default)]
pub struct RateWindow {
    timestamps: VecDeque<Instant>,
}

impl RateWindow {
    // drop everything at or before now - window
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.timestamps.len()
    }

    fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    fn oldest(&self) -> Option<Instant> {
        self.timestamps.front().copied()
    }
}

/// Snapshot of one identifier's quota, taken inside the same transaction as
/// the admission decision it accompanies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the oldest retained admission leaves the window.
    pub reset_after: Option<Duration>,
}

struct LimiterInner {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, RateWindow>,
}

/// Per-identifier sliding-window limiter. Clones share state.
///
/// Each identifier's prune-check-append runs under the `DashMap` shard guard
/// for that key, so two concurrent requests for the same identifier can't
/// both slip under the cap. Identifiers on other shards don't contend.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    inner: Arc<LimiterInner>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, RateLimitError> {
        if max_requests == 0 {
            return Err(RateLimitError::ZeroCapacity);
        }
        if window.is_zero() {
            return Err(RateLimitError::ZeroWindow);
        }

        Ok(Self {
            inner: Arc::new(LimiterInner {
                max_requests,
                window,
                windows: DashMap::new(),
            }),
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.inner.max_requests
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Admits and records one request for `identifier` if it has capacity.
    pub fn is_allowed(&self, identifier: &str) -> bool {
        self.check_with(identifier, Instant::now).allowed
    }

    pub fn is_allowed_at(&self, identifier: &str, now: Instant) -> bool {
        self.check_at(identifier, now).allowed
    }

    /// Same as [`is_allowed`](Self::is_allowed) but also reports the quota
    /// left after the decision.
    pub fn check(&self, identifier: &str) -> RateStatus {
        self.check_with(identifier, Instant::now)
    }

    pub fn check_at(&self, identifier: &str, now: Instant) -> RateStatus {
        self.check_with(identifier, || now)
    }

    // The clock is read under the entry guard so racing callers append in
    // order. A caller-supplied instant older than the newest entry is
    // clamped to it, keeping the window oldest-first.
    fn check_with(&self, identifier: &str, clock: impl FnOnce() -> Instant) -> RateStatus {
        let max = self.inner.max_requests as usize;
        let window = self.inner.window;

        let mut entry = self.inner.windows.entry(identifier.to_string()).or_default();
        let now = match entry.timestamps.back() {
            Some(&newest) => clock().max(newest),
            None => clock(),
        };
        entry.prune(now, window);

        let allowed = entry.len() < max;
        if allowed {
            entry.timestamps.push_back(now);
        }

        self.snapshot(&entry, allowed, now)
    }

    /// Quota left for `identifier`, never below zero. Prunes but never records.
    pub fn remaining(&self, identifier: &str) -> u32 {
        self.remaining_at(identifier, Instant::now())
    }

    pub fn remaining_at(&self, identifier: &str, now: Instant) -> u32 {
        self.status_at(identifier, now).remaining
    }

    /// Instant the oldest retained admission expires, i.e. the earliest time
    /// capacity is guaranteed to grow by one. `None` when nothing is retained.
    pub fn reset_time(&self, identifier: &str) -> Option<Instant> {
        self.reset_time_at(identifier, Instant::now())
    }

    pub fn reset_time_at(&self, identifier: &str, now: Instant) -> Option<Instant> {
        let window = self.inner.window;
        let mut entry = self.inner.windows.get_mut(identifier)?;
        entry.prune(now, window);
        entry.oldest().map(|oldest| oldest + window)
    }

    /// Read-only quota view. Unseen identifiers report full capacity and are
    /// not inserted into the map.
    pub fn status(&self, identifier: &str) -> RateStatus {
        self.status_at(identifier, Instant::now())
    }

    pub fn status_at(&self, identifier: &str, now: Instant) -> RateStatus {
        let window = self.inner.window;
        match self.inner.windows.get_mut(identifier) {
            Some(mut entry) => {
                entry.prune(now, window);
                let allowed = entry.len() < self.inner.max_requests as usize;
                self.snapshot(&entry, allowed, now)
            }
            None => RateStatus {
                allowed: true,
                limit: self.inner.max_requests,
                remaining: self.inner.max_requests,
                reset_after: None,
            },
        }
    }

    /// Prunes every window and evicts identifiers left empty.
    /// Returns how many identifiers were evicted.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let window = self.inner.window;
        let before = self.inner.windows.len();
        self.inner.windows.retain(|_, w| {
            w.prune(now, window);
            !w.is_empty()
        });
        before.saturating_sub(self.inner.windows.len())
    }

    /// Number of identifiers currently holding a window.
    pub fn tracked(&self) -> usize {
        self.inner.windows.len()
    }

    fn snapshot(&self, window: &RateWindow, allowed: bool, now: Instant) -> RateStatus {
        let used = u32::try_from(window.len()).unwrap_or(u32::MAX);
        RateStatus {
            allowed,
            limit: self.inner.max_requests,
            remaining: self.inner.max_requests.saturating_sub(used),
            reset_after: window
                .oldest()
                .map(|oldest| (oldest + self.inner.window).saturating_duration_since(now)),
        }
    }
}
