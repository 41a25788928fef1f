//! Call throttling for external model invocations.
//!
//! Tracks call history in two sliding windows (per-minute and per-hour)
//! so that independent pipeline runs can share one quota. The throttle
//! never sleeps itself; callers ask for the required wait and block (or
//! abort) explicitly.

use serde::Serialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Length of the short sliding window.
pub const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Length of the long sliding window.
pub const HOUR_WINDOW: Duration = Duration::from_secs(3600);

/// Configuration for call throttling.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    /// Maximum calls admitted per 60-second window
    pub calls_per_minute: usize,
    /// Maximum calls admitted per 3600-second window
    pub calls_per_hour: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            calls_per_minute: 50,
            calls_per_hour: 1000,
        }
    }
}

/// Snapshot of current throttle state for observability.
#[derive(Debug, Clone, Serialize)]
pub struct ThrottleStatus {
    pub minute_calls: usize,
    pub minute_limit: usize,
    pub minute_remaining: usize,
    pub hour_calls: usize,
    pub hour_limit: usize,
    pub hour_remaining: usize,
    pub can_call: bool,
}

#[derive(Debug, Default)]
struct Windows {
    minute: Vec<Instant>,
    hour: Vec<Instant>,
}

impl Windows {
    /// Drop timestamps that have aged out of their window.
    fn purge(&mut self, now: Instant) {
        self.minute
            .retain(|t| now.saturating_duration_since(*t) < MINUTE_WINDOW);
        self.hour
            .retain(|t| now.saturating_duration_since(*t) < HOUR_WINDOW);
    }
}

/// Thread-safe call throttle over two sliding windows.
///
/// Both time-lists live behind a single mutex; expired timestamps are
/// purged lazily before every read.
#[derive(Debug)]
pub struct CallThrottle {
    config: ThrottleConfig,
    windows: Mutex<Windows>,
}

impl CallThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(Windows::default()),
        }
    }

    /// Check whether a call can be made immediately.
    pub fn may_proceed(&self) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("throttle lock poisoned");
        windows.purge(now);
        windows.minute.len() < self.config.calls_per_minute
            && windows.hour.len() < self.config.calls_per_hour
    }

    /// How long the caller must wait before the next call would be
    /// admitted. Zero when both windows are under budget.
    ///
    /// Does not sleep; the caller blocks (or aborts) explicitly.
    pub fn wait_time(&self) -> Duration {
        self.wait_time_at(Instant::now())
    }

    fn wait_time_at(&self, now: Instant) -> Duration {
        let mut windows = self.windows.lock().expect("throttle lock poisoned");
        windows.purge(now);

        let mut wait = Duration::ZERO;

        if windows.minute.len() >= self.config.calls_per_minute {
            if let Some(oldest) = windows.minute.first() {
                let age = now.saturating_duration_since(*oldest);
                wait = wait.max(MINUTE_WINDOW.saturating_sub(age));
            }
        }

        if windows.hour.len() >= self.config.calls_per_hour {
            if let Some(oldest) = windows.hour.first() {
                let age = now.saturating_duration_since(*oldest);
                wait = wait.max(HOUR_WINDOW.saturating_sub(age));
            }
        }

        wait
    }

    /// Record a completed call in both windows.
    pub fn record_call(&self) {
        self.record_call_at(Instant::now());
    }

    fn record_call_at(&self, at: Instant) {
        let mut windows = self.windows.lock().expect("throttle lock poisoned");
        windows.minute.push(at);
        windows.hour.push(at);
    }

    /// Current quota usage in both windows.
    pub fn status(&self) -> ThrottleStatus {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("throttle lock poisoned");
        windows.purge(now);

        let minute_calls = windows.minute.len();
        let hour_calls = windows.hour.len();
        ThrottleStatus {
            minute_calls,
            minute_limit: self.config.calls_per_minute,
            minute_remaining: self.config.calls_per_minute.saturating_sub(minute_calls),
            hour_calls,
            hour_limit: self.config.calls_per_hour,
            hour_remaining: self.config.calls_per_hour.saturating_sub(hour_calls),
            can_call: minute_calls < self.config.calls_per_minute
                && hour_calls < self.config.calls_per_hour,
        }
    }

    /// Clear both windows.
    pub fn reset(&self) {
        let mut windows = self.windows.lock().expect("throttle lock poisoned");
        windows.minute.clear();
        windows.hour.clear();
    }
}

impl Default for CallThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}
