//! Session context file: who is teaching what right now.
//!
//! Written by the scheduling side of the deployment, read by the engine
//! at session start: `{"name": "<teacher>", "lecture": "<subject>"}`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic::write_atomic;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("session context io: {0}")]
    Io(#[from] std::io::Error),
    #[error("session context is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionContext {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_lecture")]
    pub lecture: String,
}

fn default_lecture() -> String {
    "Default".to_string()
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            name: String::new(),
            lecture: default_lecture(),
        }
    }
}

impl SessionContext {
    /// Load the current context. A missing file yields the default
    /// context (lecture "Default"), matching long-standing deployments
    /// that start the engine before any teacher has signed in.
    pub fn load(path: &Path) -> Result<Self, ContextError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "session context missing; using default");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ContextError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes)?;
        Ok(())
    }
}
