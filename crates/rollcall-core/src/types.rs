use serde::{Deserialize, Serialize};

/// Face embedding vector. The dimensionality is fixed by whichever
/// embedder produced it; the matcher only requires that probe and
/// gallery embeddings agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance between two embeddings. Lower = more similar.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// An enrolled person with one or more reference embeddings.
/// Owned by the roster; read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub embeddings: Vec<Embedding>,
}

/// One entry of the flattened gallery the matcher scans. The gallery
/// preserves enrollment order; ties resolve to the lowest index.
#[derive(Debug, Clone)]
pub struct EnrolledEmbedding {
    pub id: String,
    pub embedding: Embedding,
}

/// Result of matching a probe embedding against the gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Nearest neighbor within tolerance.
    Match { id: String, distance: f32 },
    /// A nearest neighbor exists but is farther than the tolerance.
    /// This is an expected outcome, not an error.
    Unrecognized { distance: f32 },
    /// Empty gallery; nothing was compared.
    NoGallery,
}

impl MatchOutcome {
    pub fn matched_id(&self) -> Option<&str> {
        match self {
            MatchOutcome::Match { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Strategy for resolving a probe embedding to an enrolled identity.
pub trait Matcher {
    fn best_match(
        &self,
        probe: &Embedding,
        gallery: &[EnrolledEmbedding],
        tolerance: f32,
    ) -> MatchOutcome;
}

/// Nearest-neighbor matcher over Euclidean distance.
///
/// Deterministic tie-break: the strict `<` comparison keeps the first
/// (lowest enrollment index) candidate on exact distance equality.
pub struct NearestMatcher;

impl Matcher for NearestMatcher {
    fn best_match(
        &self,
        probe: &Embedding,
        gallery: &[EnrolledEmbedding],
        tolerance: f32,
    ) -> MatchOutcome {
        if gallery.is_empty() {
            return MatchOutcome::NoGallery;
        }

        let mut best_dist = f32::INFINITY;
        let mut best_idx = 0usize;

        for (i, entry) in gallery.iter().enumerate() {
            let dist = probe.euclidean_distance(&entry.embedding);
            if dist < best_dist {
                best_dist = dist;
                best_idx = i;
            }
        }

        if best_dist <= tolerance {
            MatchOutcome::Match {
                id: gallery[best_idx].id.clone(),
                distance: best_dist,
            }
        } else {
            MatchOutcome::Unrecognized { distance: best_dist }
        }
    }
}
