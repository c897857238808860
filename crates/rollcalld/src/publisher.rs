//! Frame publisher: latest annotated JPEG plus a version counter.
//!
//! Latest-value-wins: the worker overwrites the slot, readers poll the
//! version and copy the bytes only when it has advanced. No queue, no
//! backpressure; a slow reader simply observes fewer frames.

use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Slot {
    jpeg: Vec<u8>,
    /// Monotonically increasing; 0 means nothing published yet.
    version: u64,
}

#[derive(Clone, Default)]
pub struct FramePublisher {
    slot: Arc<RwLock<Slot>>,
}

impl FramePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published frame and bump the version.
    pub fn publish(&self, jpeg: Vec<u8>) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.version += 1;
        slot.jpeg = jpeg;
    }

    /// Copy of the latest frame and its version, if any was published.
    pub fn latest(&self) -> Option<(Vec<u8>, u64)> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        if slot.version == 0 {
            None
        } else {
            Some((slot.jpeg.clone(), slot.version))
        }
    }

    /// Cheap poll for streaming readers: fetch bytes only on advance.
    pub fn version(&self) -> u64 {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).version
    }
}
