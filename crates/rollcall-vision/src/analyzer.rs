//! ONNX face analyzer: UltraFace-style detector + face embedder.
//!
//! The detector runs on a downscaled copy of the frame and emits
//! normalized corner boxes with per-box confidences; accepted boxes are
//! cropped from the full-resolution frame, resized to the embedder's
//! input, and turned into L2-normalized embeddings.

use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use rollcall_core::Embedding;
use rollcall_hw::Frame;
use std::path::Path;

use crate::{AnalyzerError, Detection, FaceAnalyzer, FaceBox};

// Detector (version-RFB-320 export): scores [1,N,2], boxes [1,N,4].
const DETECTOR_INPUT_WIDTH: u32 = 320;
const DETECTOR_INPUT_HEIGHT: u32 = 240;
const DETECTOR_MEAN: f32 = 127.0;
const DETECTOR_STD: f32 = 128.0;
const DETECTOR_CONFIDENCE_THRESHOLD: f32 = 0.7;
const DETECTOR_NMS_THRESHOLD: f32 = 0.5;

// Embedder: 112x112 aligned crop, symmetric normalization.
const EMBEDDER_INPUT_SIZE: u32 = 112;
const EMBEDDER_MEAN: f32 = 127.5;
const EMBEDDER_STD: f32 = 127.5;

pub struct OnnxFaceAnalyzer {
    detector: Session,
    embedder: Session,
}

impl OnnxFaceAnalyzer {
    /// Load both ONNX models. Fails fast if either file is missing;
    /// a session must not start without its recognition capability.
    pub fn load(detector_path: &str, embedder_path: &str) -> Result<Self, AnalyzerError> {
        let detector = load_session(detector_path)?;
        tracing::info!(path = detector_path, "face detector loaded");
        let embedder = load_session(embedder_path)?;
        tracing::info!(path = embedder_path, "face embedder loaded");
        Ok(Self { detector, embedder })
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, AnalyzerError> {
        let gray = frame_image(frame)?;
        let small = image::imageops::resize(
            &gray,
            DETECTOR_INPUT_WIDTH,
            DETECTOR_INPUT_HEIGHT,
            FilterType::Triangle,
        );

        let input = preprocess(
            small.as_raw(),
            DETECTOR_INPUT_WIDTH as usize,
            DETECTOR_INPUT_HEIGHT as usize,
            DETECTOR_MEAN,
            DETECTOR_STD,
        );

        let outputs = self
            .detector
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("detector scores: {e}")))?;
        let (_, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("detector boxes: {e}")))?;

        Ok(decode_detections(
            scores,
            boxes,
            frame.width as f32,
            frame.height as f32,
        ))
    }

    fn embed(&mut self, frame: &Frame, bbox: &FaceBox) -> Result<Embedding, AnalyzerError> {
        let gray = frame_image(frame)?;

        let x = bbox.x.max(0.0) as u32;
        let y = bbox.y.max(0.0) as u32;
        let w = (bbox.width as u32).clamp(1, frame.width.saturating_sub(x).max(1));
        let h = (bbox.height as u32).clamp(1, frame.height.saturating_sub(y).max(1));

        let crop = image::imageops::crop_imm(&gray, x, y, w, h).to_image();
        let aligned = image::imageops::resize(
            &crop,
            EMBEDDER_INPUT_SIZE,
            EMBEDDER_INPUT_SIZE,
            FilterType::Triangle,
        );

        let input = preprocess(
            aligned.as_raw(),
            EMBEDDER_INPUT_SIZE as usize,
            EMBEDDER_INPUT_SIZE as usize,
            EMBEDDER_MEAN,
            EMBEDDER_STD,
        );

        let outputs = self
            .embedder
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        Ok(Embedding::new(l2_normalize(raw)))
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<Detection>, AnalyzerError> {
        let faces = self.detect(frame)?;
        let mut detections = Vec::with_capacity(faces.len());
        for bbox in faces {
            let embedding = self.embed(frame, &bbox)?;
            detections.push(Detection { bbox, embedding });
        }
        Ok(detections)
    }
}

fn load_session(model_path: &str) -> Result<Session, AnalyzerError> {
    if !Path::new(model_path).exists() {
        return Err(AnalyzerError::ModelNotFound(model_path.to_string()));
    }
    Ok(Session::builder()?
        .with_intra_threads(2)
        .map_err(ort::Error::from)?
        .commit_from_file(model_path)?)
}

fn frame_image(frame: &Frame) -> Result<GrayImage, AnalyzerError> {
    GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or(AnalyzerError::BadFrame)
}

/// Grayscale bytes → NCHW float tensor, Y replicated to 3 channels.
fn preprocess(gray: &[u8], width: usize, height: usize, mean: f32, std: f32) -> Array4<f32> {
    let mut tensor = Array4::<f32>::zeros((1, 3, height, width));
    for y in 0..height {
        for x in 0..width {
            let pixel = gray.get(y * width + x).copied().unwrap_or(0) as f32;
            let normalized = (pixel - mean) / std;
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }
    tensor
}

/// Decode flat detector outputs into pixel-space boxes, confidence
/// filter then NMS. `scores` is [N,2] (background, face); `boxes` is
/// [N,4] normalized corners (x0, y0, x1, y1).
fn decode_detections(scores: &[f32], boxes: &[f32], frame_w: f32, frame_h: f32) -> Vec<FaceBox> {
    let n = scores.len() / 2;
    let mut candidates = Vec::new();

    for i in 0..n {
        let confidence = scores[i * 2 + 1];
        if confidence < DETECTOR_CONFIDENCE_THRESHOLD {
            continue;
        }
        let x0 = boxes[i * 4].clamp(0.0, 1.0) * frame_w;
        let y0 = boxes[i * 4 + 1].clamp(0.0, 1.0) * frame_h;
        let x1 = boxes[i * 4 + 2].clamp(0.0, 1.0) * frame_w;
        let y1 = boxes[i * 4 + 3].clamp(0.0, 1.0) * frame_h;
        if x1 <= x0 || y1 <= y0 {
            continue;
        }
        candidates.push(FaceBox {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
            confidence,
        });
    }

    non_max_suppression(candidates, DETECTOR_NMS_THRESHOLD)
}

/// Greedy NMS: keep the highest-confidence box, drop overlaps above the
/// IoU threshold, repeat.
fn non_max_suppression(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<FaceBox> = Vec::new();
    for candidate in boxes {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.width).min(b.x + b.width);
    let y1 = (a.y + a.height).min(b.y + b.height);

    let inter = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
    let union = a.width * a.height + b.width * b.height - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
