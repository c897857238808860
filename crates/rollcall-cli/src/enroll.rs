//! Offline enrollment: build the encoding store from a directory of
//! reference photos. Each image file enrolls one identity; the file stem
//! is the identity id (`S042.jpg` enrolls `S042`).

use std::path::Path;

use anyhow::{bail, Context, Result};
use rollcall_hw::Frame;
use rollcall_store::EncodingStore;
use rollcall_vision::{FaceAnalyzer, OnnxFaceAnalyzer};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub fn run(images_dir: &Path, detector: &str, embedder: &str, output: &Path) -> Result<()> {
    let mut analyzer = OnnxFaceAnalyzer::load(detector, embedder)?;

    let mut entries: Vec<_> = std::fs::read_dir(images_dir)
        .with_context(|| format!("cannot read {}", images_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    // Enrollment order is significant (matcher tie-break), so keep it
    // stable across runs.
    entries.sort();

    if entries.is_empty() {
        bail!("no images found under {}", images_dir.display());
    }

    let mut store = EncodingStore::new();
    let mut skipped = 0usize;
    for path in &entries {
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match enroll_one(&mut analyzer, path) {
            Ok(embedding) => {
                store.push(id, embedding);
                println!("enrolled {id}");
            }
            Err(e) => {
                skipped += 1;
                eprintln!("skipping {}: {e}", path.display());
            }
        }
    }

    if store.is_empty() {
        bail!("no faces found in any image; nothing written");
    }
    store.save(output)?;
    println!(
        "wrote {} encodings to {} ({} skipped)",
        store.len(),
        output.display(),
        skipped
    );
    Ok(())
}

fn enroll_one(analyzer: &mut OnnxFaceAnalyzer, path: &Path) -> Result<rollcall_core::Embedding> {
    let gray = image::open(path)
        .with_context(|| format!("cannot decode {}", path.display()))?
        .to_luma8();
    let frame = Frame {
        width: gray.width(),
        height: gray.height(),
        data: gray.into_raw(),
        sequence: 0,
    };

    let detections = analyzer.analyze(&frame)?;
    // Reference photos should contain exactly one face; with several,
    // take the most confident detection.
    let best = detections
        .into_iter()
        .max_by(|a, b| a.bbox.confidence.total_cmp(&b.bbox.confidence))
        .context("no face detected")?;
    Ok(best.embedding)
}
