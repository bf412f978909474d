//! Countdown timers used for dwell (hold) and auto-repeat detection.
//!
//! Every method has an `_at` variant taking an explicit `Instant` so the
//! control state machines can sample the clock once per tick.

use std::time::{Duration, Instant};

/// Default time a control must be held before a long press fires.
pub const DEFAULT_HOLD_TIME_MS: u64 = 500;

/// Default interval between auto-repeat events.
pub const DEFAULT_REPEAT_INTERVAL_MS: u64 = 330;

#[derive(Debug, Clone)]
pub struct TimeoutMonitor {
    interval: Duration,
    deadline: Option<Instant>,
}

impl TimeoutMonitor {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(timeout_ms),
            deadline: None,
        }
    }

    /// Changes the interval. A running timer keeps its start point and
    /// picks up the new deadline.
    pub fn set_timeout(&mut self, timeout_ms: u64) {
        let interval = Duration::from_millis(timeout_ms);
        if let Some(deadline) = self.deadline {
            let started = deadline - self.interval;
            self.deadline = Some(started + interval);
        }
        self.interval = interval;
    }

    pub fn timeout_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_started(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_timeout(&mut self) -> bool {
        self.is_timeout_at(Instant::now())
    }

    /// Returns true once when the deadline has been reached. The timer then
    /// restarts from `now`, so a timer left running fires once per interval.
    pub fn is_timeout_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.start_at(now);
                true
            }
            _ => false,
        }
    }
}

impl Default for TimeoutMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_TIME_MS)
    }
}

/// Ordered stack of overrides. The most recently enabled value wins and
/// disabling pops it again, falling back to the default when empty.
#[derive(Debug, Clone)]
pub struct OverrideStack<T: Copy> {
    default: T,
    stack: Vec<T>,
}

impl<T: Copy> OverrideStack<T> {
    pub fn new(default: T) -> Self {
        Self {
            default,
            stack: Vec::new(),
        }
    }

    pub fn apply(&mut self, value: T, enable: bool) {
        if enable {
            self.stack.push(value);
        } else {
            self.stack.pop();
        }
    }

    pub fn current(&self) -> T {
        self.stack.last().copied().unwrap_or(self.default)
    }
}
