//! rollcall-core: the pure parts of the attendance pipeline.
//!
//! Identity matching, liveness-verdict smoothing, and recognition
//! deduplication. Nothing in this crate touches a camera, a model,
//! or the filesystem, so every decision is unit-testable in isolation.

pub mod dedup;
pub mod liveness;
pub mod types;

pub use dedup::{DedupDecision, Deduplicator};
pub use liveness::{LivenessGate, SpoofScores};
pub use types::{Embedding, EnrolledEmbedding, Identity, MatchOutcome, Matcher, NearestMatcher};
