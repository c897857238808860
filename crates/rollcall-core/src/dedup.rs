//! Recognition deduplicator: suppresses repeat ledger writes for the
//! same identity inside a cooldown window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    /// First sighting, or the cooldown has elapsed; mark attendance.
    Emit,
    /// Seen too recently; skip, but keep recognizing other identities.
    Suppress,
}

/// Per-identity cooldown cache. One suppressed identity never blocks
/// another in the same frame.
pub struct Deduplicator {
    cooldown: Duration,
    last_seen: HashMap<String, Instant>,
}

impl Deduplicator {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_seen: HashMap::new(),
        }
    }

    /// Decide emit/suppress for a recognition of `id` at `now`, updating
    /// the cache on emit.
    pub fn observe(&mut self, id: &str, now: Instant) -> DedupDecision {
        if let Some(&last) = self.last_seen.get(id) {
            if now.duration_since(last) < self.cooldown {
                return DedupDecision::Suppress;
            }
        }
        self.last_seen.insert(id.to_string(), now);
        DedupDecision::Emit
    }

    /// Drop entries older than twice the cooldown. Purely a memory bound;
    /// correctness never depends on this running.
    pub fn gc(&mut self, now: Instant) {
        let horizon = self.cooldown * 2;
        self.last_seen
            .retain(|_, &mut last| now.duration_since(last) < horizon);
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}
