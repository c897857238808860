//! Encoding store: the binary blob of enrolled face embeddings.
//!
//! Two parallel, index-aligned sequences: embedding vectors and the
//! identity ids they belong to. Index alignment is the lookup contract
//! the matcher depends on, so it is validated at load time.

use std::path::Path;

use rollcall_core::{Embedding, EnrolledEmbedding};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic::write_atomic;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("encoding store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding store is corrupt: {0}")]
    Corrupt(#[from] bincode::Error),
    #[error("encoding store misaligned: {embeddings} embeddings vs {ids} ids")]
    Misaligned { embeddings: usize, ids: usize },
}

/// Serialized enrollment data. Enrollment order is significant: the
/// matcher's tie-break favors lower indices.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EncodingStore {
    embeddings: Vec<Vec<f32>>,
    ids: Vec<String>,
}

impl EncodingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store, validating that the two sequences align.
    /// A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, EncodingError> {
        let store: Self = match std::fs::read(path) {
            Ok(bytes) => bincode::deserialize(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "encoding store not found; starting empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        if store.embeddings.len() != store.ids.len() {
            return Err(EncodingError::Misaligned {
                embeddings: store.embeddings.len(),
                ids: store.ids.len(),
            });
        }
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<(), EncodingError> {
        let bytes = bincode::serialize(self)?;
        write_atomic(path, &bytes)?;
        Ok(())
    }

    pub fn push(&mut self, id: impl Into<String>, embedding: Embedding) {
        self.ids.push(id.into());
        self.embeddings.push(embedding.values);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Flatten into the gallery shape the matcher scans, preserving
    /// enrollment order.
    pub fn gallery(&self) -> Vec<EnrolledEmbedding> {
        self.ids
            .iter()
            .zip(self.embeddings.iter())
            .map(|(id, values)| EnrolledEmbedding {
                id: id.clone(),
                embedding: Embedding::new(values.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encodings.bin");

        let mut store = EncodingStore::new();
        store.push("S1", Embedding::new(vec![0.1, 0.2, 0.3]));
        store.push("S2", Embedding::new(vec![0.4, 0.5, 0.6]));
        store.save(&path).unwrap();

        let loaded = EncodingStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        let gallery = loaded.gallery();
        assert_eq!(gallery[0].id, "S1");
        assert_eq!(gallery[1].embedding.values, vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncodingStore::load(&dir.path().join("nope.bin")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_misaligned_store_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encodings.bin");

        // Hand-build a blob with mismatched sequence lengths.
        let bad = (
            vec![vec![0.1f32], vec![0.2f32]],
            vec!["only-one".to_string()],
        );
        std::fs::write(&path, bincode::serialize(&bad).unwrap()).unwrap();

        match EncodingStore::load(&path) {
            Err(EncodingError::Misaligned { embeddings, ids }) => {
                assert_eq!((embeddings, ids), (2, 1));
            }
            other => panic!("expected Misaligned, got {other:?}"),
        }
    }

    #[test]
    fn test_gallery_preserves_enrollment_order() {
        let mut store = EncodingStore::new();
        for i in 0..5 {
            store.push(format!("S{i}"), Embedding::new(vec![i as f32]));
        }
        let ids: Vec<_> = store.gallery().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["S0", "S1", "S2", "S3", "S4"]);
    }
}
