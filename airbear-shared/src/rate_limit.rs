use dashmap::DashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// Stale windows are swept once the map grows past this many keys,
// at most once per window.
const PRUNE_THRESHOLD: usize = 10_000;
// Unknown keys are refused while this many windows are live.
const MAX_KEYS: usize = 50_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window, in-process rate limiter.
///
/// Best effort only: state lives in this process and is lost on restart.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: DashMap<String, Window>,
    last_prune: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: DashMap::new(),
            last_prune: Mutex::new(None),
        }
    }

    /// Record a hit for `key`, returning false once the window is exhausted.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        if self.windows.len() > PRUNE_THRESHOLD {
            self.maybe_prune(now);
        }
        if self.windows.len() >= MAX_KEYS && !self.windows.contains_key(key) {
            return false;
        }

        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { started: now, count: 0 });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    fn maybe_prune(&self, now: Instant) {
        // another request is already sweeping
        let Ok(mut last) = self.last_prune.try_lock() else {
            return;
        };
        if last.is_some_and(|at| now.duration_since(at) < self.window) {
            return;
        }
        *last = Some(now);
        drop(last);
        self.prune(now);
    }

    fn prune(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
    }
}
