//! Per-client fixed window rate limiting.
//!
//! The counters live in process memory, so limits are not shared between
//! multiple instances of the service. Every instance enforces its own budget.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use scc::hash_map::Entry;

/// Longest window a limiter accepts. Longer windows are clamped to it.
pub const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of a window, counted from the first request of the window.
    pub window: Duration,
    /// Requests allowed inside one window. Zero rejects every request.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 5,
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub trait RateLimiter: Send + Sync {
    /// Returns whether a request from `identifier` is allowed, counting it
    /// against the identifier's budget when it is.
    fn check_and_consume(&self, identifier: &str) -> bool;
}

#[derive(Clone, Copy, Debug)]
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

pub struct FixedWindowLimiter<C = SystemClock> {
    entries: scc::HashMap<String, RateLimitEntry>,
    config: RateLimitConfig,
    clock: C,
}

impl FixedWindowLimiter<SystemClock> {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> FixedWindowLimiter<C> {
    pub fn with_clock(mut config: RateLimitConfig, clock: C) -> Self {
        config.window = config.window.min(MAX_WINDOW);
        Self {
            entries: scc::HashMap::new(),
            config,
            clock,
        }
    }

    fn fresh_entry(&self, now: Instant) -> RateLimitEntry {
        RateLimitEntry {
            count: 1,
            reset_at: now + self.config.window,
        }
    }

    /// Drops every entry whose window is over. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain_sync(|_, entry| now <= entry.reset_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn tracked_identifiers(&self) -> usize {
        self.entries.len()
    }
}

impl<C: Clock> RateLimiter for FixedWindowLimiter<C> {
    fn check_and_consume(&self, identifier: &str) -> bool {
        if self.config.max_requests == 0 {
            return false;
        }

        let now = self.clock.now();

        match self.entries.entry_sync(identifier.to_owned()) {
            Entry::Vacant(vacant) => {
                vacant.insert_entry(self.fresh_entry(now));
                true
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if now > entry.reset_at {
                    *entry = self.fresh_entry(now);
                    true
                } else if entry.count < self.config.max_requests {
                    entry.count += 1;
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Periodically evicts expired windows so identifiers that stopped sending
/// requests do not accumulate forever.
pub fn spawn_sweeper<C>(limiter: Arc<FixedWindowLimiter<C>>) -> tokio::task::JoinHandle<()>
where
    C: Clock + 'static,
{
    let period = limiter.config.window.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!(
                    removed,
                    remaining = limiter.tracked_identifiers(),
                    "Swept expired rate limit windows"
                );
            }
        }
    })
}
