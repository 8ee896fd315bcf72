//! Attendance log entries.
//!
//! Entries are immutable once recorded. The student name is captured at write
//! time and is never re-synced if the student is later renamed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::student::{Student, StudentId};

/// Opaque log entry identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub String);

impl LogId {
  pub fn generate() -> Self { Self(Uuid::new_v4().to_string()) }
}

impl fmt::Display for LogId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Whether the student was passing in or out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
  Entry,
  Exit,
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Entry => f.write_str("ENTRY"),
      Self::Exit => f.write_str("EXIT"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceLogEntry {
  pub id:            LogId,
  pub student_id:    StudentId,
  /// Denormalised display name; a cache, not a foreign key.
  pub student_name:  String,
  pub timestamp:     DateTime<Utc>,
  #[serde(rename = "type")]
  pub kind:          EventKind,
  /// Only meaningful for [`EventKind::Entry`].
  #[serde(default)]
  pub is_late:       bool,
  /// Only meaningful for [`EventKind::Exit`].
  #[serde(default)]
  pub is_early_exit: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub snapshot_url:  Option<String>,
}

impl AttendanceLogEntry {
  /// Build an entry for `student` with a fresh id and no flags set.
  pub fn for_student(
    student: &Student,
    kind: EventKind,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      id: LogId::generate(),
      student_id: student.id.clone(),
      student_name: student.name.clone(),
      timestamp,
      kind,
      is_late: false,
      is_early_exit: false,
      snapshot_url: None,
    }
  }
}
