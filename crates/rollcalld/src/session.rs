//! Session clock and attendance-window state machine.

use serde::Serialize;
use std::time::{Duration, Instant};

/// Lifecycle of one attendance session.
///
/// `Collecting → Closing` is driven by wall clock alone; `Closing →
/// Closed` happens after the absentee sweep, exactly once. A manual stop
/// request never changes the phase; closure and stopping are
/// independent, and the clock takes precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Collecting,
    Closing,
    Closed,
}

/// Wall-clock view of the attendance window. All queries take `now`
/// explicitly so the state machine is testable at any simulated time.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    start: Instant,
    duration: Duration,
}

impl SessionClock {
    pub fn new(duration: Duration) -> Self {
        Self::with_start(Instant::now(), duration)
    }

    pub fn with_start(start: Instant, duration: Duration) -> Self {
        Self { start, duration }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// True once elapsed time reaches the window length.
    pub fn expired(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.duration
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration.saturating_sub(self.elapsed(now))
    }
}

/// Point-in-time status snapshot readers poll over D-Bus.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// True while the attendance window is open and the worker runs.
    pub active: bool,
    pub remaining_seconds: u64,
    pub lecture: String,
    pub phase: Option<SessionPhase>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            active: false,
            remaining_seconds: 0,
            lecture: String::new(),
            phase: None,
        }
    }
}
