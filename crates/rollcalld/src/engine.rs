//! Engine facade: owns the ledger and shared state, spawns the session
//! worker thread, and answers point-in-time queries from D-Bus handlers.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use thiserror::Error;

use rollcall_hw::{Camera, CameraError};
use rollcall_store::{
    AttendanceEntry, AttendanceKey, AttendanceLedger, ContextError, EncodingError, EncodingStore,
    LedgerError, Roster, RosterError, SessionContext,
};
use rollcall_vision::{AnalyzerError, OnnxFaceAnalyzer, OnnxSpoofClassifier};

use crate::config::{ConfigError, EngineConfig};
use crate::session::{SessionClock, SessionStatus};
use crate::worker::{run_session, SessionRun, SharedState};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Encodings(#[from] EncodingError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("failed to spawn session worker: {0}")]
    Spawn(#[from] std::io::Error),
}

pub struct Engine {
    config: EngineConfig,
    ledger: Arc<Mutex<AttendanceLedger>>,
    shared: Arc<SharedState>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let ledger = AttendanceLedger::open(config.ledger_path())?;
        Ok(Self {
            config,
            ledger: Arc::new(Mutex::new(ledger)),
            shared: Arc::new(SharedState::new()),
        })
    }

    /// Start a session. Returns `Ok(false)` when one is already running.
    /// Setup failures (camera, models, data files) surface to the caller
    /// and no worker is spawned.
    pub fn start(&self) -> Result<bool, EngineError> {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            tracing::info!("start requested while a session is active; ignored");
            return Ok(false);
        }
        // A stop() racing a previous worker's exit can leave the flag set
        // with no session left to consume it; a fresh session must never
        // inherit it.
        self.shared.stop_requested.store(false, Ordering::SeqCst);
        match self.spawn_worker() {
            Ok(()) => Ok(true),
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn spawn_worker(&self) -> Result<(), EngineError> {
        let cfg = self.config.clone();

        // Fail fast: an unusable camera or missing model aborts the
        // start request before any state is touched.
        let camera = Camera::open(&cfg.camera_device)?;
        let analyzer =
            OnnxFaceAnalyzer::load(&cfg.detector_model_path(), &cfg.embedder_model_path())?;
        let classifier = match OnnxSpoofClassifier::load(&cfg.spoof_model_path()) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(error = %e, "spoof classifier unavailable; liveness gate fails open");
                None
            }
        };

        let context = SessionContext::load(&cfg.context_path())?;
        let roster = Roster::load(cfg.roster_path())?;
        let store = EncodingStore::load(&cfg.encodings_path())?;
        let gallery = store.gallery();
        if gallery.is_empty() {
            tracing::warn!("encoding store is empty; nobody can be recognized");
        }

        let key = AttendanceKey::today(context.lecture.clone());
        let clock = SessionClock::new(cfg.session_duration);
        let mut run = SessionRun::new(
            cfg.clone(),
            key,
            cfg.cohort.clone(),
            clock,
            classifier.is_some(),
            gallery,
            roster,
            Arc::clone(&self.ledger),
        );

        tracing::info!(
            lecture = %context.lecture,
            taken_by = %context.name,
            duration_secs = cfg.session_duration.as_secs(),
            "attendance session starting"
        );

        let shared = Arc::clone(&self.shared);
        std::thread::Builder::new()
            .name("rollcall-session".into())
            .spawn(move || {
                let mut analyzer = analyzer;
                let mut classifier = classifier;
                // The stream borrows the camera, so both live on this
                // thread for the whole session.
                match camera.stream() {
                    Ok(mut stream) => {
                        run_session(&mut stream, &mut analyzer, &mut classifier, &mut run, &shared)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to start capture stream");
                        shared.running.store(false, Ordering::SeqCst);
                    }
                }
            })?;
        Ok(())
    }

    /// Request a stop. Returns false when no session is running. The
    /// worker drains for the configured grace window before exiting.
    pub fn stop(&self) -> bool {
        if self.shared.running.load(Ordering::SeqCst) {
            self.shared.stop_requested.store(true, Ordering::SeqCst);
            tracing::info!("stop requested");
            true
        } else {
            false
        }
    }

    /// Whether a session worker is currently alive (including one
    /// draining its stop grace window).
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn stop_grace(&self) -> std::time::Duration {
        self.config.stop_grace
    }

    pub fn status(&self) -> SessionStatus {
        self.shared
            .status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn latest_frame(&self) -> Option<(Vec<u8>, u64)> {
        self.shared.publisher.latest()
    }

    pub fn ledger_snapshot(&self, date: NaiveDate, lecture: &str) -> AttendanceEntry {
        let key = AttendanceKey::new(date, lecture);
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot(&key)
    }
}
