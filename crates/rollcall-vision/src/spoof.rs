//! ONNX spoof classifier: one softmax over (fake, real) per frame.
//!
//! The classifier is an optional capability: when the model file is not
//! configured the engine runs without it and the liveness gate fails
//! open (see `rollcall_core::liveness`).

use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use rollcall_core::SpoofScores;
use rollcall_hw::Frame;
use std::path::Path;

use crate::{AnalyzerError, SpoofClassifier};

const SPOOF_INPUT_SIZE: u32 = 128;
const SPOOF_MEAN: f32 = 127.5;
const SPOOF_STD: f32 = 127.5;

pub struct OnnxSpoofClassifier {
    session: Session,
}

impl OnnxSpoofClassifier {
    pub fn load(model_path: &str) -> Result<Self, AnalyzerError> {
        if !Path::new(model_path).exists() {
            return Err(AnalyzerError::ModelNotFound(model_path.to_string()));
        }
        let session = Session::builder()?
            .with_intra_threads(2)
            .map_err(ort::Error::from)?
            .commit_from_file(model_path)?;
        tracing::info!(path = model_path, "spoof classifier loaded");
        Ok(Self { session })
    }
}

impl SpoofClassifier for OnnxSpoofClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<SpoofScores, AnalyzerError> {
        let gray = GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or(AnalyzerError::BadFrame)?;
        let small =
            image::imageops::resize(&gray, SPOOF_INPUT_SIZE, SPOOF_INPUT_SIZE, FilterType::Triangle);

        let size = SPOOF_INPUT_SIZE as usize;
        let mut input = Array4::<f32>::zeros((1, 3, size, size));
        for y in 0..size {
            for x in 0..size {
                let pixel = small.as_raw()[y * size + x] as f32;
                let normalized = (pixel - SPOOF_MEAN) / SPOOF_STD;
                input[[0, 0, y, x]] = normalized;
                input[[0, 1, y, x]] = normalized;
                input[[0, 2, y, x]] = normalized;
            }
        }

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("spoof logits: {e}")))?;

        if logits.len() < 2 {
            return Err(AnalyzerError::InferenceFailed(format!(
                "expected 2 spoof classes, got {}",
                logits.len()
            )));
        }

        // Class order matches the training export: [fake, real].
        let probs = softmax(&logits[..2]);
        Ok(SpoofScores {
            fake: probs[0],
            real: probs[1],
        })
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
