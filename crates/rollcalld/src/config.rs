use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Daemon configuration, loaded once at startup from environment
/// variables. Every tunable has an explicit default matching the
/// behavior of the original deployment; nothing on the hot path reads
/// the environment again.
#[derive(Clone)]
pub struct EngineConfig {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Directory holding ledger, roster, encodings and context files.
    pub data_dir: PathBuf,
    /// Cohort whose roster the active lecture draws from.
    pub cohort: String,
    /// Euclidean distance tolerance for a positive identity match.
    pub match_tolerance: f32,
    /// Minimum time between two accepted recognitions of one identity.
    pub cooldown: Duration,
    /// Attendance window length.
    pub session_duration: Duration,
    /// Liveness verdict window capacity.
    pub liveness_window: usize,
    /// Minimum wall-clock spacing between liveness samples.
    pub liveness_interval: Duration,
    /// Run recognition on every Nth frame.
    pub recognize_every: u64,
    /// Invoke the spoof classifier on every Nth frame.
    pub classify_every: u64,
    /// Publish a frame unconditionally every Nth frame.
    pub publish_every: u64,
    /// Prune the cooldown cache every Nth frame.
    pub gc_every: u64,
    /// Drain window after a stop request before the worker exits.
    pub stop_grace: Duration,
    /// JPEG quality for published frames.
    pub jpeg_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            camera_device: "/dev/video0".to_string(),
            model_dir: PathBuf::from("models"),
            data_dir: PathBuf::from("."),
            cohort: String::new(),
            match_tolerance: 0.65,
            cooldown: Duration::from_secs(8),
            session_duration: Duration::from_secs(300),
            liveness_window: 5,
            liveness_interval: Duration::from_millis(500),
            recognize_every: 2,
            classify_every: 6,
            publish_every: 5,
            gc_every: 30,
            stop_grace: Duration::from_secs(5),
            jpeg_quality: 65,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `ROLLCALL_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            camera_device: std::env::var("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or(defaults.camera_device),
            model_dir: std::env::var("ROLLCALL_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            data_dir: std::env::var("ROLLCALL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cohort: std::env::var("ROLLCALL_COHORT").unwrap_or(defaults.cohort),
            match_tolerance: env_f32("ROLLCALL_MATCH_TOLERANCE", defaults.match_tolerance),
            cooldown: Duration::from_secs(env_u64("ROLLCALL_COOLDOWN_SECS", 8)),
            session_duration: Duration::from_secs(env_u64("ROLLCALL_SESSION_SECS", 300)),
            liveness_window: env_usize("ROLLCALL_LIVENESS_WINDOW", defaults.liveness_window),
            liveness_interval: Duration::from_millis(env_u64("ROLLCALL_LIVENESS_INTERVAL_MS", 500)),
            recognize_every: env_u64("ROLLCALL_RECOGNIZE_EVERY", defaults.recognize_every),
            classify_every: env_u64("ROLLCALL_CLASSIFY_EVERY", defaults.classify_every),
            publish_every: env_u64("ROLLCALL_PUBLISH_EVERY", defaults.publish_every),
            gc_every: env_u64("ROLLCALL_GC_EVERY", defaults.gc_every),
            stop_grace: Duration::from_secs(env_u64("ROLLCALL_STOP_GRACE_SECS", 5)),
            jpeg_quality: env_u64("ROLLCALL_JPEG_QUALITY", 65).clamp(1, 100) as u8,
        }
    }

    /// Reject configurations that would wedge the loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.match_tolerance > 0.0) {
            return Err(ConfigError::Invalid("match tolerance must be positive"));
        }
        if self.session_duration.is_zero() {
            return Err(ConfigError::Invalid("session duration must be positive"));
        }
        if self.liveness_window == 0 {
            return Err(ConfigError::Invalid("liveness window must hold at least one verdict"));
        }
        if self.recognize_every == 0
            || self.classify_every == 0
            || self.publish_every == 0
            || self.gc_every == 0
        {
            return Err(ConfigError::Invalid("frame cadences must be at least 1"));
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("attendance_records.json")
    }

    pub fn roster_path(&self) -> PathBuf {
        self.data_dir.join("student_data.json")
    }

    pub fn encodings_path(&self) -> PathBuf {
        self.data_dir.join("encodings.bin")
    }

    pub fn context_path(&self) -> PathBuf {
        self.data_dir.join("session_context.json")
    }

    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("version-RFB-320.onnx")
            .to_string_lossy()
            .into_owned()
    }

    pub fn embedder_model_path(&self) -> String {
        self.model_dir
            .join("mobilefacenet.onnx")
            .to_string_lossy()
            .into_owned()
    }

    pub fn spoof_model_path(&self) -> String {
        self.model_dir
            .join("spoof_classifier.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert!((cfg.match_tolerance - 0.65).abs() < 1e-6);
        assert_eq!(cfg.cooldown, Duration::from_secs(8));
        assert_eq!(cfg.session_duration, Duration::from_secs(300));
        assert_eq!(cfg.liveness_window, 5);
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.publish_every = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_data_paths_under_data_dir() {
        let mut cfg = EngineConfig::default();
        cfg.data_dir = PathBuf::from("/var/lib/rollcall");
        assert_eq!(
            cfg.ledger_path(),
            PathBuf::from("/var/lib/rollcall/attendance_records.json")
        );
    }
}
