use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio::{sync::Mutex, time::Instant};

/// Sliding-window limiter for outbound model calls.
///
/// Admits at most `calls_per_minute` calls whose start times fall inside any
/// trailing window. Callers wait on an async mutex, so a throttled caller
/// suspends its own task only and later callers queue behind it in order.
/// Share one instance across requests through an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    calls_per_minute: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
    admitted: AtomicU64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CALLS_PER_MINUTE)
    }
}

impl RateLimiter {
    pub const DEFAULT_CALLS_PER_MINUTE: usize = 10;
    pub const WINDOW: Duration = Duration::from_secs(60);

    pub fn new(calls_per_minute: usize) -> Self {
        Self {
            calls_per_minute: calls_per_minute.max(1),
            window: Self::WINDOW,
            calls: Mutex::new(VecDeque::new()),
            admitted: AtomicU64::new(0),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn calls_per_minute(&self) -> usize {
        self.calls_per_minute
    }

    /// Total number of calls admitted since creation
    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    /// Waits until one more call fits in the window, then records it.
    #[tracing::instrument(skip(self), fields(limit = self.calls_per_minute))]
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;

        loop {
            let now = Instant::now();
            self.prune(&mut calls, now);

            if calls.len() < self.calls_per_minute {
                break;
            }

            // the window is full; sleep until its oldest entry falls out
            let Some(&oldest) = calls.front() else {
                break;
            };
            let wait = (oldest + self.window).saturating_duration_since(now);
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }

        calls.push_back(Instant::now());
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    fn prune(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = calls.front() {
            if now.duration_since(oldest) < self.window {
                break;
            }
            calls.pop_front();
        }
    }
}
