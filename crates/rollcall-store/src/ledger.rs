//! Attendance ledger: durable present/absent record keyed by (date, lecture).
//!
//! On-disk format (shared with the original deployment, do not change):
//!
//! ```json
//! {"records": {"2026-08-30_Networks": {"present": ["S1"], "absent": ["S2"], "time": "10:04:33"}}}
//! ```
//!
//! The ledger is the single point where the recognition loop and the
//! finalizer sweep meet; callers serialize mutations behind one mutex
//! (single-writer discipline). Readers take cloned snapshots.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic::write_atomic;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger io: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Session key: one calendar date + one lecture name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttendanceKey {
    pub date: NaiveDate,
    pub lecture: String,
}

impl AttendanceKey {
    pub fn new(date: NaiveDate, lecture: impl Into<String>) -> Self {
        Self {
            date,
            lecture: lecture.into(),
        }
    }

    pub fn today(lecture: impl Into<String>) -> Self {
        Self::new(Local::now().date_naive(), lecture)
    }

    /// Serialized form used as the JSON map key: `"<date>_<lecture>"`.
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.date.format("%Y-%m-%d"), self.lecture)
    }
}

/// One session's record. `present` and `absent` keep insertion order for
/// file interoperability; membership is set-semantics and the two lists
/// are disjoint after every mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttendanceEntry {
    pub present: Vec<String>,
    pub absent: Vec<String>,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    records: BTreeMap<String, AttendanceEntry>,
}

/// Durable attendance ledger with atomic persistence.
pub struct AttendanceLedger {
    path: PathBuf,
    file: LedgerFile,
    /// Set when a flush failed; the next mutation retries the write.
    dirty: bool,
}

impl AttendanceLedger {
    /// Open the ledger at `path`. A missing file is an empty ledger;
    /// a malformed file is an error (never silently discarded).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let file = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            file,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mark `id` present. Idempotent: already-present ids are a no-op
    /// (no write). An id previously swept absent moves to present.
    /// Returns true when the id was newly marked present.
    pub fn mark_present(&mut self, key: &AttendanceKey, id: &str) -> bool {
        let rec = self.entry_mut(key);
        if rec.present.iter().any(|p| p == id) {
            return false;
        }
        rec.absent.retain(|a| a != id);
        rec.present.push(id.to_string());
        rec.time = now_hms();
        self.flush();
        true
    }

    /// Mark `id` absent, but only if it is in neither list; presence
    /// always wins over a later absence sweep. Returns true when the id
    /// was newly marked absent.
    pub fn mark_absent(&mut self, key: &AttendanceKey, id: &str) -> bool {
        let rec = self.entry_mut(key);
        if rec.present.iter().any(|p| p == id) || rec.absent.iter().any(|a| a == id) {
            return false;
        }
        rec.absent.push(id.to_string());
        rec.time = now_hms();
        self.flush();
        true
    }

    /// Point-in-time copy of one session's record.
    pub fn snapshot(&self, key: &AttendanceKey) -> AttendanceEntry {
        self.file
            .records
            .get(&key.storage_key())
            .cloned()
            .unwrap_or_default()
    }

    pub fn present_ids(&self, key: &AttendanceKey) -> Vec<String> {
        self.snapshot(key).present
    }

    fn entry_mut(&mut self, key: &AttendanceKey) -> &mut AttendanceEntry {
        self.file
            .records
            .entry(key.storage_key())
            .or_insert_with(|| AttendanceEntry {
                time: now_hms(),
                ..Default::default()
            })
    }

    /// Persist the ledger, retrying a failed write once. On a second
    /// failure the in-memory state is kept and the next mutation retries;
    /// the worker never crashes over a persistence error.
    fn flush(&mut self) {
        self.dirty = true;
        for attempt in 0..2 {
            match self.persist() {
                Ok(()) => {
                    self.dirty = false;
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        path = %self.path.display(),
                        error = %e,
                        "ledger write failed"
                    );
                }
            }
        }
        tracing::error!(
            path = %self.path.display(),
            "ledger write failed twice; keeping in-memory state for next retry"
        );
    }

    fn persist(&self) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec_pretty(&self.file)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}

fn now_hms() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key() -> AttendanceKey {
        AttendanceKey::new(
            NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            "Networks",
        )
    }

    fn open_temp() -> (tempfile::TempDir, AttendanceLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AttendanceLedger::open(dir.path().join("attendance_records.json")).unwrap();
        (dir, ledger)
    }

    fn disjoint(entry: &AttendanceEntry) -> bool {
        let p: HashSet<_> = entry.present.iter().collect();
        entry.absent.iter().all(|a| !p.contains(a))
    }

    #[test]
    fn test_storage_key_format() {
        assert_eq!(key().storage_key(), "2026-08-30_Networks");
    }

    #[test]
    fn test_mark_present_idempotent() {
        let (_dir, mut ledger) = open_temp();
        assert!(ledger.mark_present(&key(), "S1"));
        let once = ledger.snapshot(&key());
        assert!(!ledger.mark_present(&key(), "S1"));
        let twice = ledger.snapshot(&key());
        assert_eq!(once.present, twice.present);
        assert_eq!(once.absent, twice.absent);
    }

    #[test]
    fn test_present_overrides_earlier_absent() {
        let (_dir, mut ledger) = open_temp();
        assert!(ledger.mark_absent(&key(), "S1"));
        assert!(ledger.mark_present(&key(), "S1"));
        let entry = ledger.snapshot(&key());
        assert_eq!(entry.present, vec!["S1"]);
        assert!(entry.absent.is_empty());
    }

    #[test]
    fn test_absent_never_overwrites_present() {
        let (_dir, mut ledger) = open_temp();
        ledger.mark_present(&key(), "S1");
        assert!(!ledger.mark_absent(&key(), "S1"));
        let entry = ledger.snapshot(&key());
        assert_eq!(entry.present, vec!["S1"]);
        assert!(entry.absent.is_empty());
    }

    #[test]
    fn test_sets_stay_disjoint_under_any_sequence() {
        let (_dir, mut ledger) = open_temp();
        let k = key();
        ledger.mark_absent(&k, "S1");
        assert!(disjoint(&ledger.snapshot(&k)));
        ledger.mark_present(&k, "S1");
        assert!(disjoint(&ledger.snapshot(&k)));
        ledger.mark_present(&k, "S2");
        assert!(disjoint(&ledger.snapshot(&k)));
        ledger.mark_absent(&k, "S2");
        assert!(disjoint(&ledger.snapshot(&k)));
        ledger.mark_absent(&k, "S3");
        assert!(disjoint(&ledger.snapshot(&k)));
        ledger.mark_present(&k, "S3");
        assert!(disjoint(&ledger.snapshot(&k)));
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance_records.json");
        {
            let mut ledger = AttendanceLedger::open(&path).unwrap();
            ledger.mark_present(&key(), "S1");
            ledger.mark_absent(&key(), "S2");
        }
        let reopened = AttendanceLedger::open(&path).unwrap();
        let entry = reopened.snapshot(&key());
        assert_eq!(entry.present, vec!["S1"]);
        assert_eq!(entry.absent, vec!["S2"]);
        assert!(!entry.time.is_empty());
    }

    #[test]
    fn test_file_format_interoperable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance_records.json");
        let mut ledger = AttendanceLedger::open(&path).unwrap();
        ledger.mark_present(&key(), "S1");

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let rec = &raw["records"]["2026-08-30_Networks"];
        assert_eq!(rec["present"], serde_json::json!(["S1"]));
        assert_eq!(rec["absent"], serde_json::json!([]));
        assert!(rec["time"].as_str().unwrap().len() == 8); // HH:MM:SS
    }

    #[test]
    fn test_reads_existing_deployment_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance_records.json");
        std::fs::write(
            &path,
            r#"{"records":{"2026-08-30_Networks":{"present":["S9"],"absent":[],"time":"09:00:00"}}}"#,
        )
        .unwrap();
        let ledger = AttendanceLedger::open(&path).unwrap();
        assert_eq!(ledger.present_ids(&key()), vec!["S9"]);
    }

    #[test]
    fn test_failed_flush_keeps_state_and_persists_on_next_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        let path = blocker.join("attendance_records.json");
        let mut ledger = AttendanceLedger::open(&path).unwrap();

        // A regular file where the data directory should be makes every
        // write fail.
        std::fs::write(&blocker, b"in the way").unwrap();
        assert!(ledger.mark_present(&key(), "S1"));
        // The mark survives in memory even though nothing hit the disk.
        assert_eq!(ledger.present_ids(&key()), vec!["S1"]);
        assert!(!path.exists());

        // Repair the directory; the next mutation persists the earlier
        // mark along with its own.
        std::fs::remove_file(&blocker).unwrap();
        std::fs::create_dir(&blocker).unwrap();
        assert!(ledger.mark_present(&key(), "S2"));

        let reopened = AttendanceLedger::open(&path).unwrap();
        assert_eq!(reopened.present_ids(&key()), vec!["S1", "S2"]);
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let (_dir, ledger) = open_temp();
        assert_eq!(ledger.snapshot(&key()), AttendanceEntry::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance_records.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(AttendanceLedger::open(&path).is_err());
    }

    #[test]
    fn test_keys_are_independent() {
        let (_dir, mut ledger) = open_temp();
        let other = AttendanceKey::new(
            NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            "Databases",
        );
        ledger.mark_present(&key(), "S1");
        assert!(ledger.snapshot(&other).present.is_empty());
    }
}
