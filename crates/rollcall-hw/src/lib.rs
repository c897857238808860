//! rollcall-hw: camera capture and frame handling.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, CameraStream};
pub use frame::{encode_jpeg, Frame, FrameError};

/// Source of raw frames at the device's native rate. The capture worker
/// and tests both drive the pipeline through this seam.
pub trait FrameSource {
    /// Blocking acquisition of the next frame. `Ok(None)` means the
    /// source is (possibly temporarily) out of frames; an `Err` is a
    /// per-frame failure the caller may log and ride out.
    fn next_frame(&mut self) -> Result<Option<Frame>, CameraError>;
}
