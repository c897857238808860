//! rollcall-store: durable state for the attendance engine.
//!
//! Everything on disk is single-writer/multi-reader and every write goes
//! through [`atomic::write_atomic`]: a temp file in the target directory,
//! an explicit fsync, then a rename. A crash mid-write leaves the previous
//! durable version intact; readers never observe a half-written file.

pub mod atomic;
pub mod context;
pub mod encodings;
pub mod ledger;
pub mod roster;

pub use context::{ContextError, SessionContext};
pub use encodings::{EncodingError, EncodingStore};
pub use ledger::{AttendanceEntry, AttendanceKey, AttendanceLedger, LedgerError};
pub use roster::{Roster, RosterError, RosterFormat, Student};
