//! rollcall-vision: the engine's opaque vision capabilities.
//!
//! The engine consumes two traits: [`FaceAnalyzer`] (detection +
//! embedding extraction in one call) and [`SpoofClassifier`]. The ONNX
//! implementations here run on CPU via `ort`; tests substitute fakes.

pub mod analyzer;
pub mod spoof;

use rollcall_core::{Embedding, SpoofScores};
use rollcall_hw::Frame;
use thiserror::Error;

pub use analyzer::OnnxFaceAnalyzer;
pub use spoof::OnnxSpoofClassifier;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("frame does not match negotiated dimensions")]
    BadFrame,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Detected face location in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// One detected face with its extracted embedding.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: FaceBox,
    pub embedding: Embedding,
}

/// Face detection + embedding extraction over one frame.
pub trait FaceAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<Detection>, AnalyzerError>;
}

/// Periodic real/fake classification of a frame.
pub trait SpoofClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<SpoofScores, AnalyzerError>;
}
