//! Per-user sliding-window rate limit for AI requests

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);
/// Tracked keys above which idle entries are dropped before the next check
const PRUNE_THRESHOLD: usize = 1024;

pub struct RateLimiter {
    limit: usize,
    window: Duration,
    hits: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    /// `limit` requests per minute per key; 0 disables limiting
    pub fn per_minute(limit: usize) -> Self {
        Self::new(limit, WINDOW)
    }

    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: DashMap::new(),
        }
    }

    /// Record a request for `key`. Returns false if it exceeds the limit.
    pub fn check(&self, key: &str) -> bool {
        if self.limit == 0 {
            return true;
        }

        if self.hits.len() > PRUNE_THRESHOLD {
            self.prune();
        }

        let now = Instant::now();
        let mut entry = self.hits.entry(key.to_string()).or_default();
        self.expire(&mut entry, now);

        if entry.len() >= self.limit {
            return false;
        }
        entry.push_back(now);
        true
    }

    /// Drop keys with no requests left inside the window
    pub fn prune(&self) {
        let now = Instant::now();
        self.hits.retain(|_, window| {
            self.expire(window, now);
            !window.is_empty()
        });
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.hits.len()
    }

    fn expire(&self, window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= self.window {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}
