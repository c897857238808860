//! The capture/recognition worker: one long-lived thread per session.
//!
//! The worker is the sole writer of session state, the cooldown cache,
//! the liveness window, and (serialized behind the ledger mutex) the
//! attendance ledger. The finalizer sweep runs inside the same thread,
//! so it always observes the most recent present set. Readers only ever
//! see point-in-time copies via [`SharedState`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Local;
use rollcall_core::{
    DedupDecision, Deduplicator, EnrolledEmbedding, LivenessGate, MatchOutcome, Matcher,
    NearestMatcher,
};
use rollcall_hw::{encode_jpeg, Frame, FrameSource};
use rollcall_store::{AttendanceKey, AttendanceLedger, Roster};
use rollcall_vision::{FaceAnalyzer, FaceBox, SpoofClassifier};

use crate::config::EngineConfig;
use crate::publisher::FramePublisher;
use crate::session::{SessionClock, SessionPhase, SessionStatus};

// Annotation shades on the grayscale output frame.
const SHADE_PRESENT: u8 = 255;
const SHADE_COOLDOWN: u8 = 200;
const SHADE_UNKNOWN: u8 = 160;
const SHADE_SPOOF_BANNER: u8 = 32;
const SHADE_CLOSED_BANNER: u8 = 96;
const BANNER_HEIGHT: u32 = 8;

const IDLE_RETRY: Duration = Duration::from_millis(10);

/// State shared between the worker thread and D-Bus readers.
pub struct SharedState {
    pub running: AtomicBool,
    pub stop_requested: AtomicBool,
    pub status: Mutex<SessionStatus>,
    pub publisher: FramePublisher,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            status: Mutex::new(SessionStatus::default()),
            publisher: FramePublisher::new(),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_ledger(ledger: &Arc<Mutex<AttendanceLedger>>) -> MutexGuard<'_, AttendanceLedger> {
    ledger.lock().unwrap_or_else(|e| e.into_inner())
}

fn lock_status(shared: &SharedState) -> MutexGuard<'_, SessionStatus> {
    shared.status.lock().unwrap_or_else(|e| e.into_inner())
}

/// All per-session state owned by the worker thread.
pub struct SessionRun {
    config: EngineConfig,
    pub key: AttendanceKey,
    pub cohort: String,
    pub clock: SessionClock,
    pub phase: SessionPhase,
    gate: LivenessGate,
    dedup: Deduplicator,
    matcher: NearestMatcher,
    gallery: Vec<EnrolledEmbedding>,
    roster: Roster,
    ledger: Arc<Mutex<AttendanceLedger>>,
    frame_counter: u64,
}

impl SessionRun {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        key: AttendanceKey,
        cohort: String,
        clock: SessionClock,
        classifier_present: bool,
        gallery: Vec<EnrolledEmbedding>,
        roster: Roster,
        ledger: Arc<Mutex<AttendanceLedger>>,
    ) -> Self {
        let gate = LivenessGate::new(
            config.liveness_window,
            config.liveness_interval,
            classifier_present,
        );
        let dedup = Deduplicator::new(config.cooldown);
        Self {
            config,
            key,
            cohort,
            clock,
            phase: SessionPhase::Collecting,
            gate,
            dedup,
            matcher: NearestMatcher,
            gallery,
            roster,
            ledger,
            frame_counter: 0,
        }
    }

    /// Advance the window state machine. The clock alone drives
    /// `Collecting → Closing`; the sweep then runs exactly once and the
    /// phase settles in `Closed`, so later ticks cannot re-run it.
    pub fn tick(&mut self, now: Instant) {
        if self.phase == SessionPhase::Collecting && self.clock.expired(now) {
            self.phase = SessionPhase::Closing;
            tracing::info!(lecture = %self.key.lecture, "attendance window closed");
        }
        if self.phase == SessionPhase::Closing {
            self.finalize_sweep();
            self.phase = SessionPhase::Closed;
        }
    }

    /// Mark every enrolled id that was never recognized as absent.
    /// Present ids are untouched: `mark_absent` refuses to demote them.
    fn finalize_sweep(&mut self) {
        let enrolled = self.roster.enrolled_ids(&self.cohort);
        let mut ledger = lock_ledger(&self.ledger);
        let present: HashSet<String> = ledger.present_ids(&self.key).into_iter().collect();

        let mut swept = 0usize;
        for id in &enrolled {
            if !present.contains(id) && ledger.mark_absent(&self.key, id) {
                swept += 1;
            }
        }
        tracing::info!(
            lecture = %self.key.lecture,
            enrolled = enrolled.len(),
            present = present.len(),
            swept,
            "absentee sweep complete"
        );
    }

    /// Run one frame through the pipeline, annotating it in place.
    /// Returns whether the frame should be published now.
    pub fn process_frame<A, C>(
        &mut self,
        frame: &mut Frame,
        analyzer: &mut A,
        classifier: Option<&mut C>,
        now: Instant,
    ) -> bool
    where
        A: FaceAnalyzer,
        C: SpoofClassifier,
    {
        self.frame_counter += 1;
        let mut publish = self.frame_counter % self.config.publish_every == 0;

        if self.frame_counter % self.config.gc_every == 0 {
            self.dedup.gc(now);
        }

        if self.phase != SessionPhase::Collecting {
            // Window closed: keep streaming for the live view, no marking.
            frame.draw_strip(0, BANNER_HEIGHT, SHADE_CLOSED_BANNER);
            return publish;
        }

        if self.frame_counter % self.config.recognize_every != 0 {
            return publish;
        }

        if self.frame_counter % self.config.classify_every == 0 {
            if let Some(classifier) = classifier {
                match classifier.classify(frame) {
                    Ok(scores) => self.gate.observe(scores.is_real(), now),
                    Err(e) => {
                        tracing::warn!(error = %e, "spoof classification failed; sample dropped")
                    }
                }
            }
        }

        if !self.gate.verdict() {
            tracing::debug!("liveness gate reports fake; recognition skipped");
            frame.draw_strip(0, BANNER_HEIGHT, SHADE_SPOOF_BANNER);
            return true;
        }

        let detections = match analyzer.analyze(frame) {
            Ok(d) => d,
            Err(e) => {
                // Single-frame failure: log, skip, keep the loop alive.
                tracing::warn!(error = %e, "frame analysis failed; frame skipped");
                return publish;
            }
        };

        for det in &detections {
            publish = true;
            match self
                .matcher
                .best_match(&det.embedding, &self.gallery, self.config.match_tolerance)
            {
                MatchOutcome::NoGallery => {
                    tracing::debug!("no enrolled encodings; face ignored");
                }
                MatchOutcome::Unrecognized { distance } => {
                    tracing::debug!(distance, "face not recognized");
                    draw(frame, &det.bbox, SHADE_UNKNOWN);
                }
                MatchOutcome::Match { id, distance } => {
                    if self.dedup.observe(&id, now) == DedupDecision::Suppress {
                        draw(frame, &det.bbox, SHADE_COOLDOWN);
                        continue;
                    }
                    let shade = if self.mark_recognized(&id, distance) {
                        SHADE_PRESENT
                    } else {
                        SHADE_UNKNOWN
                    };
                    draw(frame, &det.bbox, shade);
                }
            }
        }

        publish
    }

    /// Persist one accepted recognition. Returns false when the identity
    /// is not markable (missing from roster, or wrong cohort).
    fn mark_recognized(&mut self, id: &str, distance: f32) -> bool {
        let Some(student) = self.roster.get(id) else {
            tracing::warn!(id, "recognized id missing from roster; not marking");
            return false;
        };
        if student.cohort != self.cohort {
            tracing::info!(
                id,
                student_cohort = %student.cohort,
                session_cohort = %self.cohort,
                "cohort mismatch; not marking"
            );
            return false;
        }
        let name = student.name.clone();

        let newly = lock_ledger(&self.ledger).mark_present(&self.key, id);
        if newly {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            if let Err(e) = self.roster.record_presence(id, &stamp) {
                tracing::warn!(id, error = %e, "failed to update roster attendance total");
            }
            tracing::info!(id, name = %name, distance, lecture = %self.key.lecture, "marked present");
        } else {
            tracing::debug!(id, "already marked present");
        }
        true
    }
}

fn draw(frame: &mut Frame, b: &FaceBox, shade: u8) {
    frame.draw_box(
        b.x.max(0.0) as u32,
        b.y.max(0.0) as u32,
        b.width.max(1.0) as u32,
        b.height.max(1.0) as u32,
        shade,
    );
}

fn publish_status(run: &SessionRun, shared: &SharedState, now: Instant) {
    let mut status = lock_status(shared);
    status.active = run.phase == SessionPhase::Collecting;
    status.remaining_seconds = run.clock.remaining(now).as_secs();
    status.lecture = run.key.lecture.clone();
    status.phase = Some(run.phase);
}

/// The session loop. Runs until a stop request's grace window elapses;
/// wall-clock closure of the attendance window does NOT end the loop;
/// the live view keeps streaming until someone asks for a stop.
pub fn run_session<S, A, C>(
    source: &mut S,
    analyzer: &mut A,
    classifier: &mut Option<C>,
    run: &mut SessionRun,
    shared: &SharedState,
) where
    S: FrameSource,
    A: FaceAnalyzer,
    C: SpoofClassifier,
{
    tracing::info!(
        lecture = %run.key.lecture,
        cohort = %run.cohort,
        "session worker started"
    );

    let mut stop_at: Option<Instant> = None;

    loop {
        let now = Instant::now();

        if stop_at.is_none() && shared.stop_requested.load(Ordering::Relaxed) {
            stop_at = Some(now + run.config.stop_grace);
            tracing::info!(
                grace_secs = run.config.stop_grace.as_secs(),
                "stop requested; draining before exit"
            );
        }
        if let Some(deadline) = stop_at {
            if now >= deadline {
                break;
            }
        }

        run.tick(now);
        publish_status(run, shared, now);

        let mut frame = match source.next_frame() {
            Ok(Some(f)) => f,
            Ok(None) => {
                std::thread::sleep(IDLE_RETRY);
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "frame acquisition failed; retrying");
                std::thread::sleep(IDLE_RETRY);
                continue;
            }
        };

        // After a stop request no new frames enter the pipeline; the
        // grace window only lets already-started work settle.
        if stop_at.is_some() {
            continue;
        }

        let publish = run.process_frame(&mut frame, analyzer, classifier.as_mut(), now);
        if publish {
            match encode_jpeg(&frame, run.config.jpeg_quality) {
                Ok(jpeg) => shared.publisher.publish(jpeg),
                Err(e) => tracing::warn!(error = %e, "jpeg encode failed; frame dropped"),
            }
        }
    }

    // Cleanup precedes thread exit: readers must observe the session
    // as inactive before the camera handle is released by our caller.
    {
        let mut status = lock_status(shared);
        status.active = false;
        status.remaining_seconds = 0;
        status.phase = Some(run.phase);
    }
    shared.stop_requested.store(false, Ordering::Relaxed);
    shared.running.store(false, Ordering::Relaxed);
    tracing::info!("session worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{Embedding, SpoofScores};
    use rollcall_store::AttendanceEntry;
    use rollcall_vision::{AnalyzerError, Detection};

    struct FixedAnalyzer {
        detections: Vec<Detection>,
    }

    impl FaceAnalyzer for FixedAnalyzer {
        fn analyze(&mut self, _frame: &Frame) -> Result<Vec<Detection>, AnalyzerError> {
            Ok(self.detections.clone())
        }
    }

    struct FixedSpoof {
        real: bool,
    }

    impl SpoofClassifier for FixedSpoof {
        fn classify(&mut self, _frame: &Frame) -> Result<SpoofScores, AnalyzerError> {
            Ok(if self.real {
                SpoofScores { real: 0.9, fake: 0.1 }
            } else {
                SpoofScores { real: 0.1, fake: 0.9 }
            })
        }
    }

    /// Source yielding a fixed number of blank frames, then `None`.
    struct BlankFrames {
        remaining: usize,
    }

    impl FrameSource for BlankFrames {
        fn next_frame(&mut self) -> Result<Option<Frame>, rollcall_hw::CameraError> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(blank_frame()))
        }
    }

    fn blank_frame() -> Frame {
        Frame {
            data: vec![0u8; 64 * 64],
            width: 64,
            height: 64,
            sequence: 0,
        }
    }

    fn detection(values: Vec<f32>) -> Detection {
        Detection {
            bbox: FaceBox {
                x: 8.0,
                y: 8.0,
                width: 16.0,
                height: 16.0,
                confidence: 0.95,
            },
            embedding: Embedding::new(values),
        }
    }

    fn test_config(dir: &std::path::Path) -> EngineConfig {
        let mut cfg = EngineConfig::default();
        cfg.data_dir = dir.to_path_buf();
        cfg.cohort = "TY".into();
        // Process every frame in tests; cadences are exercised separately.
        cfg.recognize_every = 1;
        cfg.classify_every = 1;
        cfg
    }

    fn gallery() -> Vec<EnrolledEmbedding> {
        vec![
            EnrolledEmbedding {
                id: "S1".into(),
                embedding: Embedding::new(vec![0.0, 0.0]),
            },
            EnrolledEmbedding {
                id: "S2".into(),
                embedding: Embedding::new(vec![10.0, 0.0]),
            },
            EnrolledEmbedding {
                id: "S3".into(),
                embedding: Embedding::new(vec![0.0, 10.0]),
            },
        ]
    }

    fn roster_with_cohort(dir: &std::path::Path) -> Roster {
        let path = dir.join("student_data.json");
        std::fs::write(
            &path,
            r#"{"students": {
                "S1": {"name": "Ada", "cohort": "TY"},
                "S2": {"name": "Grace", "cohort": "TY"},
                "S3": {"name": "Edsger", "cohort": "TY"}
            }}"#,
        )
        .unwrap();
        Roster::load(path).unwrap()
    }

    fn make_run(dir: &std::path::Path, start: Instant, duration_secs: u64) -> SessionRun {
        let cfg = test_config(dir);
        let ledger = AttendanceLedger::open(cfg.ledger_path()).unwrap();
        let roster = roster_with_cohort(dir);
        SessionRun::new(
            cfg.clone(),
            AttendanceKey::today("Networks"),
            cfg.cohort.clone(),
            SessionClock::with_start(start, Duration::from_secs(duration_secs)),
            true,
            gallery(),
            roster,
            Arc::new(Mutex::new(ledger)),
        )
    }

    fn snapshot(run: &SessionRun) -> AttendanceEntry {
        lock_ledger(&run.ledger).snapshot(&run.key)
    }

    #[test]
    fn test_recognition_marks_present() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut run = make_run(dir.path(), start, 60);
        let mut analyzer = FixedAnalyzer {
            detections: vec![detection(vec![0.1, 0.0])], // distance 0.1 to S1
        };

        let mut frame = blank_frame();
        let publish = run.process_frame(
            &mut frame,
            &mut analyzer,
            None::<&mut FixedSpoof>,
            start + Duration::from_secs(10),
        );

        assert!(publish, "a face event must publish immediately");
        assert_eq!(snapshot(&run).present, vec!["S1"]);
        // Recognized box is drawn at full intensity.
        assert_eq!(frame.data[(8 * 64 + 8) as usize], SHADE_PRESENT);
    }

    #[test]
    fn test_unrecognized_face_not_marked() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut run = make_run(dir.path(), start, 60);
        let mut analyzer = FixedAnalyzer {
            // Distance 5.0 to the nearest gallery entry; way past 0.65.
            detections: vec![detection(vec![5.0, 0.0])],
        };

        let mut frame = blank_frame();
        run.process_frame(
            &mut frame,
            &mut analyzer,
            None::<&mut FixedSpoof>,
            start + Duration::from_secs(5),
        );
        assert!(snapshot(&run).present.is_empty());
    }

    #[test]
    fn test_cooldown_suppresses_repeat_within_window() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut run = make_run(dir.path(), start, 120);
        let mut analyzer = FixedAnalyzer {
            detections: vec![detection(vec![0.0, 0.0])],
        };

        let mut f1 = blank_frame();
        run.process_frame(&mut f1, &mut analyzer, None::<&mut FixedSpoof>, start);
        let once = snapshot(&run);

        // 2s later, inside the 8s cooldown: suppressed, ledger unchanged.
        let mut f2 = blank_frame();
        run.process_frame(
            &mut f2,
            &mut analyzer,
            None::<&mut FixedSpoof>,
            start + Duration::from_secs(2),
        );
        assert_eq!(snapshot(&run), once);
        assert_eq!(f2.data[(8 * 64 + 8) as usize], SHADE_COOLDOWN);
    }

    #[test]
    fn test_spoof_gate_blocks_recognition() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut run = make_run(dir.path(), start, 300);
        let mut empty = FixedAnalyzer { detections: vec![] };
        let mut analyzer = FixedAnalyzer {
            detections: vec![detection(vec![0.0, 0.0])],
        };
        let mut classifier = FixedSpoof { real: false };

        // Two fake verdicts (spaced past the 0.5s sampling throttle)
        // turn the window majority fake before any face shows up.
        for i in 0..2u64 {
            let mut frame = blank_frame();
            run.process_frame(
                &mut frame,
                &mut empty,
                Some(&mut classifier),
                start + Duration::from_millis(600 * (i + 1)),
            );
        }

        // Now a known face appears; the gate must block recognition.
        for i in 2..5u64 {
            let mut frame = blank_frame();
            let publish = run.process_frame(
                &mut frame,
                &mut analyzer,
                Some(&mut classifier),
                start + Duration::from_millis(600 * (i + 1)),
            );
            assert!(publish, "a spoof event publishes immediately");
            assert_eq!(frame.data[0], SHADE_SPOOF_BANNER);
        }

        assert!(
            snapshot(&run).present.is_empty(),
            "a fake-majority window must block marking"
        );
    }

    #[test]
    fn test_cohort_mismatch_not_marked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("student_data.json"),
            r#"{"students": {"S1": {"name": "Ada", "cohort": "SY"}}}"#,
        )
        .unwrap();
        let start = Instant::now();
        let cfg = test_config(dir.path());
        let ledger = AttendanceLedger::open(cfg.ledger_path()).unwrap();
        let roster = Roster::load(cfg.roster_path()).unwrap();
        let mut run = SessionRun::new(
            cfg.clone(),
            AttendanceKey::today("Networks"),
            "TY".into(),
            SessionClock::with_start(start, Duration::from_secs(60)),
            true,
            gallery(),
            roster,
            Arc::new(Mutex::new(ledger)),
        );

        let mut analyzer = FixedAnalyzer {
            detections: vec![detection(vec![0.0, 0.0])],
        };
        let mut frame = blank_frame();
        run.process_frame(&mut frame, &mut analyzer, None::<&mut FixedSpoof>, start);

        assert!(snapshot(&run).present.is_empty());
    }

    #[test]
    fn test_finalizer_runs_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut run = make_run(dir.path(), start, 300);

        // t=299: still collecting.
        run.tick(start + Duration::from_secs(299));
        assert_eq!(run.phase, SessionPhase::Collecting);
        assert!(snapshot(&run).absent.is_empty());

        // t=301: window expired; sweep marks everyone absent.
        run.tick(start + Duration::from_secs(301));
        assert_eq!(run.phase, SessionPhase::Closed);
        let after_sweep = snapshot(&run);
        assert_eq!(after_sweep.absent, vec!["S1", "S2", "S3"]);

        // t=305: clock evaluated again; no further mutation.
        run.tick(start + Duration::from_secs(305));
        assert_eq!(run.phase, SessionPhase::Closed);
        assert_eq!(snapshot(&run), after_sweep);
    }

    #[test]
    fn test_no_marking_after_window_closed() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut run = make_run(dir.path(), start, 60);
        run.tick(start + Duration::from_secs(61));
        assert_eq!(run.phase, SessionPhase::Closed);

        let mut analyzer = FixedAnalyzer {
            detections: vec![detection(vec![0.0, 0.0])],
        };
        let mut frame = blank_frame();
        run.process_frame(
            &mut frame,
            &mut analyzer,
            None::<&mut FixedSpoof>,
            start + Duration::from_secs(62),
        );

        let entry = snapshot(&run);
        assert!(entry.present.is_empty());
        assert_eq!(entry.absent, vec!["S1", "S2", "S3"]);
        // Closed banner is drawn instead.
        assert_eq!(frame.data[0], SHADE_CLOSED_BANNER);
    }

    #[test]
    fn test_end_to_end_session() {
        // S1 recognized at t=10s, duration 60s; at t=61s the ledger must
        // show present=[S1], absent=[S2,S3].
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut run = make_run(dir.path(), start, 60);
        let mut analyzer = FixedAnalyzer {
            detections: vec![detection(vec![0.0, 0.0])],
        };

        let t10 = start + Duration::from_secs(10);
        run.tick(t10);
        let mut frame = blank_frame();
        run.process_frame(&mut frame, &mut analyzer, None::<&mut FixedSpoof>, t10);

        let t61 = start + Duration::from_secs(61);
        run.tick(t61);

        let entry = snapshot(&run);
        assert_eq!(entry.present, vec!["S1"]);
        assert_eq!(entry.absent, vec!["S2", "S3"]);

        // Presence survived into the roster totals as well.
        assert_eq!(run.roster.get("S1").unwrap().total_attendance, 1);
        assert_eq!(run.roster.get("S2").unwrap().total_attendance, 0);
    }

    #[test]
    fn test_run_session_honors_stop_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = test_config(dir.path());
        cfg.stop_grace = Duration::ZERO;
        let ledger = AttendanceLedger::open(cfg.ledger_path()).unwrap();
        let roster = roster_with_cohort(dir.path());
        let mut run = SessionRun::new(
            cfg.clone(),
            AttendanceKey::today("Networks"),
            "TY".into(),
            SessionClock::new(Duration::from_secs(60)),
            false,
            gallery(),
            roster,
            Arc::new(Mutex::new(ledger)),
        );

        let shared = SharedState::new();
        shared.running.store(true, Ordering::Relaxed);
        shared.stop_requested.store(true, Ordering::Relaxed);

        let mut source = BlankFrames { remaining: 3 };
        let mut analyzer = FixedAnalyzer { detections: vec![] };
        let mut classifier: Option<FixedSpoof> = None;

        run_session(&mut source, &mut analyzer, &mut classifier, &mut run, &shared);

        assert!(!shared.running.load(Ordering::Relaxed));
        assert!(!shared.stop_requested.load(Ordering::Relaxed));
        assert!(!lock_status(&shared).active);
    }

    #[test]
    fn test_publish_cadence_every_kth_frame() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut cfg = test_config(dir.path());
        cfg.publish_every = 5;
        cfg.recognize_every = 2;
        let ledger = AttendanceLedger::open(cfg.ledger_path()).unwrap();
        let roster = roster_with_cohort(dir.path());
        let mut run = SessionRun::new(
            cfg.clone(),
            AttendanceKey::today("Networks"),
            "TY".into(),
            SessionClock::with_start(start, Duration::from_secs(300)),
            false,
            gallery(),
            roster,
            Arc::new(Mutex::new(ledger)),
        );

        let mut analyzer = FixedAnalyzer { detections: vec![] };
        let mut published = 0;
        for i in 0..10u64 {
            let mut frame = blank_frame();
            if run.process_frame(
                &mut frame,
                &mut analyzer,
                None::<&mut FixedSpoof>,
                start + Duration::from_millis(33 * i),
            ) {
                published += 1;
            }
        }
        // Frames 5 and 10 of 10.
        assert_eq!(published, 2);
    }
}
