//! Liveness gate: smooths a periodically-invoked spoof classifier into
//! a stable real/fake verdict.
//!
//! The classifier runs on a throttled cadence (not every frame); its raw
//! verdicts land in a bounded window and the gate reports the majority.
//! A missing classifier fails *open*: the gate always reports real and
//! logs the degraded mode once, so the condition is visible in the logs
//! rather than silently indistinguishable from a genuine verdict.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Raw confidence pair from one classifier invocation.
#[derive(Debug, Clone, Copy)]
pub struct SpoofScores {
    pub real: f32,
    pub fake: f32,
}

impl SpoofScores {
    /// Collapse confidences into a single verdict. A frame is called fake
    /// only on a confident fake signal with weak real evidence; no signal
    /// at all counts as real.
    pub fn is_real(&self) -> bool {
        if self.real == 0.0 && self.fake == 0.0 {
            return true;
        }
        !(self.fake > 0.7 && self.real < 0.3)
    }
}

/// Sliding-window majority vote over classifier verdicts.
pub struct LivenessGate {
    window: VecDeque<bool>,
    capacity: usize,
    min_interval: Duration,
    last_sample: Option<Instant>,
    /// False when no classifier is configured; the gate fails open.
    classifier_present: bool,
    degraded_logged: bool,
}

impl LivenessGate {
    pub fn new(capacity: usize, min_interval: Duration, classifier_present: bool) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            min_interval,
            last_sample: None,
            classifier_present,
            degraded_logged: false,
        }
    }

    /// Feed one classifier verdict into the window. Samples arriving
    /// faster than `min_interval` are dropped; the wall-clock throttle
    /// keeps a burst of frames from flushing the window.
    pub fn observe(&mut self, is_real: bool, now: Instant) {
        if let Some(last) = self.last_sample {
            if now.duration_since(last) < self.min_interval {
                return;
            }
        }
        self.last_sample = Some(now);

        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(is_real);
    }

    /// Aggregate verdict: real iff the window's real count reaches half
    /// its current length (floor). An empty window reports real.
    pub fn verdict(&mut self) -> bool {
        if !self.classifier_present {
            if !self.degraded_logged {
                self.degraded_logged = true;
                tracing::warn!(
                    "no spoof classifier configured; liveness gate failing open (degraded mode)"
                );
            }
            return true;
        }
        if self.window.is_empty() {
            return true;
        }
        let real_count = self.window.iter().filter(|&&v| v).count();
        real_count >= self.window.len() / 2
    }

    #[cfg(test)]
    fn window_len(&self) -> usize {
        self.window.len()
    }
}
