// src/services/rate_limiter.rs

use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;

/// Per-key sliding-window limiter: at most `max_requests` hits inside any
/// `window`-long interval. Lives in `AppState`, one instance per endpoint.
#[derive(Clone)]
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    hits: Arc<DashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            hits: Arc::new(DashMap::new()),
        }
    }

    /// Records a hit for `key` and returns whether it is allowed.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entry = self.hits.entry(key.to_string()).or_default();
        let hits = entry.value_mut();

        while hits
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            return false;
        }

        hits.push_back(now);
        true
    }

    /// Drops keys whose hits have all left the window.
    pub fn purge_expired(&self, now: Instant) {
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
        });
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.hits.len()
    }
}
