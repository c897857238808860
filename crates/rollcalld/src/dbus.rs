//! D-Bus surface of the daemon.
//!
//! Structured replies (status, ledger snapshots) travel as JSON strings;
//! the latest frame is raw JPEG bytes paired with its version counter so
//! pollers can skip unchanged frames.

use std::sync::Arc;

use zbus::fdo;
use zbus::interface;

use crate::engine::Engine;

pub const BUS_NAME: &str = "org.rollcall.Engine1";
pub const OBJECT_PATH: &str = "/org/rollcall/Engine1";

pub struct EngineService {
    engine: Arc<Engine>,
}

impl EngineService {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

#[interface(name = "org.rollcall.Engine1")]
impl EngineService {
    /// Start an attendance session. True if a new session was started,
    /// false if one is already running.
    async fn start(&self) -> fdo::Result<bool> {
        self.engine
            .start()
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Request the running session to stop. False when idle.
    async fn stop(&self) -> fdo::Result<bool> {
        Ok(self.engine.stop())
    }

    /// Current session status as JSON.
    async fn status(&self) -> fdo::Result<String> {
        serde_json::to_string(&self.engine.status())
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Latest published JPEG frame and its version. An empty byte array
    /// with version 0 means nothing has been published yet.
    async fn latest_frame(&self) -> fdo::Result<(Vec<u8>, u64)> {
        Ok(self.engine.latest_frame().unwrap_or_default())
    }

    /// Present/absent lists for one date (YYYY-MM-DD) and lecture.
    async fn ledger_snapshot(&self, date: &str, lecture: &str) -> fdo::Result<String> {
        let date = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| fdo::Error::InvalidArgs(format!("bad date {date:?}: {e}")))?;
        let entry = self.engine.ledger_snapshot(date, lecture);
        serde_json::to_string(&entry).map_err(|e| fdo::Error::Failed(e.to_string()))
    }
}
