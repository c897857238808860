//! Frame type, YUYV conversion, annotation, JPEG encoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid YUYV length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("jpeg encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// A captured grayscale camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
}

impl Frame {
    /// Axis-aligned box in pixel coordinates.
    pub fn draw_box(&mut self, x: u32, y: u32, w: u32, h: u32, shade: u8) {
        let x1 = (x + w).min(self.width.saturating_sub(1));
        let y1 = (y + h).min(self.height.saturating_sub(1));
        let x0 = x.min(self.width.saturating_sub(1));
        let y0 = y.min(self.height.saturating_sub(1));

        for px in x0..=x1 {
            self.put(px, y0, shade);
            self.put(px, y1, shade);
        }
        for py in y0..=y1 {
            self.put(x0, py, shade);
            self.put(x1, py, shade);
        }
    }

    /// Fill a horizontal strip; used as a session-closed banner.
    pub fn draw_strip(&mut self, y: u32, height: u32, shade: u8) {
        let y1 = (y + height).min(self.height);
        for py in y..y1 {
            let start = (py * self.width) as usize;
            let end = start + self.width as usize;
            if end <= self.data.len() {
                self.data[start..end].fill(shade);
            }
        }
    }

    fn put(&mut self, x: u32, y: u32, shade: u8) {
        let idx = (y * self.width + x) as usize;
        if idx < self.data.len() {
            self.data[idx] = shade;
        }
    }
}

/// Convert packed YUYV (4:2:2) to grayscale by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

/// Encode a grayscale frame as JPEG at the given quality.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, FrameError> {
    let mut out = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    encoder.encode(
        &frame.data,
        frame.width,
        frame.height,
        image::ExtendedColorType::L8,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> Frame {
        Frame {
            data: vec![0u8; (width * height) as usize],
            width,
            height,
            sequence: 0,
        }
    }

    #[test]
    fn test_yuyv_to_grayscale() {
        // 2x1 image: [Y0=100, U=128, Y1=200, V=128]
        let yuyv = vec![100, 128, 200, 128];
        let gray = yuyv_to_grayscale(&yuyv, 2, 1).unwrap();
        assert_eq!(gray, vec![100, 200]);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![100, 128]; // too short for 2x1
        assert!(yuyv_to_grayscale(&yuyv, 2, 1).is_err());
    }

    #[test]
    fn test_draw_box_touches_corners() {
        let mut f = frame(16, 16);
        f.draw_box(2, 3, 5, 4, 255);
        assert_eq!(f.data[(3 * 16 + 2) as usize], 255); // top-left
        assert_eq!(f.data[(7 * 16 + 7) as usize], 255); // bottom-right
        assert_eq!(f.data[(5 * 16 + 4) as usize], 0); // interior untouched
    }

    #[test]
    fn test_draw_box_clamped_to_frame() {
        let mut f = frame(8, 8);
        // Box extends past both edges; must not panic.
        f.draw_box(6, 6, 10, 10, 200);
        assert_eq!(f.data[(7 * 8 + 7) as usize], 200);
    }

    #[test]
    fn test_draw_strip() {
        let mut f = frame(4, 4);
        f.draw_strip(1, 2, 99);
        assert_eq!(&f.data[4..12], &[99u8; 8]);
        assert_eq!(f.data[0], 0);
        assert_eq!(f.data[12], 0);
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic() {
        let f = frame(32, 32);
        let jpeg = encode_jpeg(&f, 65).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
