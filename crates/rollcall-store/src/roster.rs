//! Roster: the enrolled students eligible for a cohort's lectures.
//!
//! Deployments in the field carry three on-disk shapes for the same data:
//! a flat id→student map, a batch-keyed nesting of those maps, and a
//! `{"students": {...}}` wrapper. Each shape gets its own conversion at
//! the loading boundary ([`RosterFormat`]); the engine only ever sees the
//! flat map. Saving writes the shape that was loaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::atomic::write_atomic;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("roster io: {0}")]
    Io(#[from] std::io::Error),
    #[error("roster is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One enrolled student.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Student {
    /// Keyed externally; never serialized inside the record.
    #[serde(skip)]
    pub student_id: String,
    /// Batch key when the roster file is batch-nested.
    #[serde(skip)]
    pub batch: String,
    #[serde(default)]
    pub name: String,
    /// Cohort the student belongs to. Legacy files call this "year".
    #[serde(default, alias = "year")]
    pub cohort: String,
    #[serde(default)]
    pub total_attendance: u32,
    #[serde(default)]
    pub last_attendance_time: String,
}

/// The three on-disk shapes a roster file can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFormat {
    /// `{"<id>": {..}, ...}`
    Flat,
    /// `{"<batch>": {"<id>": {..}, ...}, ...}`
    Batched,
    /// `{"students": {"<id>": {..}, ...}}`
    Wrapped,
}

impl RosterFormat {
    fn detect(value: &Value) -> RosterFormat {
        let Some(map) = value.as_object() else {
            return RosterFormat::Wrapped;
        };
        if map.get("students").map(Value::is_object) == Some(true) {
            return RosterFormat::Wrapped;
        }
        let batch_like = map.values().any(|v| {
            v.as_object()
                .and_then(|inner| inner.values().next())
                .map(looks_like_student)
                .unwrap_or(false)
        });
        if batch_like {
            RosterFormat::Batched
        } else {
            RosterFormat::Flat
        }
    }
}

fn looks_like_student(v: &Value) -> bool {
    v.as_object()
        .map(|o| o.contains_key("name") || o.contains_key("year") || o.contains_key("cohort"))
        .unwrap_or(false)
}

/// In-memory roster plus the format it round-trips through.
pub struct Roster {
    path: PathBuf,
    format: RosterFormat,
    students: BTreeMap<String, Student>,
}

impl Roster {
    /// Load and normalize the roster at `path`. A missing file is an
    /// empty roster that will save in wrapped form.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, RosterError> {
        let path = path.into();
        let value: Value = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "roster file not found; starting empty");
                return Ok(Self {
                    path,
                    format: RosterFormat::Wrapped,
                    students: BTreeMap::new(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let format = RosterFormat::detect(&value);
        let students = match format {
            RosterFormat::Flat => from_flat(&value)?,
            RosterFormat::Batched => from_batched(&value)?,
            RosterFormat::Wrapped => from_wrapped(&value)?,
        };
        tracing::debug!(
            path = %path.display(),
            ?format,
            count = students.len(),
            "roster loaded"
        );
        Ok(Self {
            path,
            format,
            students,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> RosterFormat {
        self.format
    }

    pub fn get(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Ids of every student enrolled in `cohort`, in stable id order.
    /// The finalizer sweep subtracts the present set from exactly this.
    pub fn enrolled_ids(&self, cohort: &str) -> Vec<String> {
        self.students
            .iter()
            .filter(|(_, s)| s.cohort == cohort)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn insert(&mut self, student: Student) {
        self.students.insert(student.student_id.clone(), student);
    }

    /// Bump a student's attendance total and stamp the recognition time,
    /// persisting the roster. Unknown ids are logged and skipped.
    pub fn record_presence(&mut self, id: &str, timestamp: &str) -> Result<(), RosterError> {
        match self.students.get_mut(id) {
            Some(s) => {
                s.total_attendance += 1;
                s.last_attendance_time = timestamp.to_string();
            }
            None => {
                tracing::warn!(id, "presence recorded for id missing from roster");
                return Ok(());
            }
        }
        self.save()
    }

    /// Persist in the same shape the file was loaded in.
    pub fn save(&self) -> Result<(), RosterError> {
        let value = match self.format {
            RosterFormat::Flat => to_flat(&self.students),
            RosterFormat::Batched => to_batched(&self.students),
            RosterFormat::Wrapped => serde_json::json!({ "students": to_flat(&self.students) }),
        };
        let bytes = serde_json::to_vec_pretty(&value)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}

fn parse_student(id: &str, v: &Value) -> Result<Student, RosterError> {
    let mut student: Student = serde_json::from_value(v.clone())?;
    student.student_id = id.to_string();
    Ok(student)
}

fn from_flat(value: &Value) -> Result<BTreeMap<String, Student>, RosterError> {
    let mut out = BTreeMap::new();
    if let Some(map) = value.as_object() {
        for (id, v) in map {
            if v.is_object() {
                out.insert(id.clone(), parse_student(id, v)?);
            }
        }
    }
    Ok(out)
}

fn from_wrapped(value: &Value) -> Result<BTreeMap<String, Student>, RosterError> {
    match value.get("students") {
        Some(inner) => from_flat(inner),
        None => Ok(BTreeMap::new()),
    }
}

fn from_batched(value: &Value) -> Result<BTreeMap<String, Student>, RosterError> {
    let mut out = BTreeMap::new();
    if let Some(map) = value.as_object() {
        for (batch, students) in map {
            let Some(students) = students.as_object() else {
                continue;
            };
            for (id, v) in students {
                if v.is_object() {
                    let mut student = parse_student(id, v)?;
                    student.batch = batch.clone();
                    out.insert(id.clone(), student);
                }
            }
        }
    }
    Ok(out)
}

fn to_flat(students: &BTreeMap<String, Student>) -> Value {
    let map: serde_json::Map<String, Value> = students
        .iter()
        .map(|(id, s)| (id.clone(), serde_json::to_value(s).unwrap_or(Value::Null)))
        .collect();
    Value::Object(map)
}

fn to_batched(students: &BTreeMap<String, Student>) -> Value {
    let mut batches: BTreeMap<String, serde_json::Map<String, Value>> = BTreeMap::new();
    for (id, s) in students {
        let batch = if s.batch.is_empty() {
            "students".to_string()
        } else {
            s.batch.clone()
        };
        batches
            .entry(batch)
            .or_default()
            .insert(id.clone(), serde_json::to_value(s).unwrap_or(Value::Null));
    }
    let map: serde_json::Map<String, Value> = batches
        .into_iter()
        .map(|(k, v)| (k, Value::Object(v)))
        .collect();
    Value::Object(map)
}
