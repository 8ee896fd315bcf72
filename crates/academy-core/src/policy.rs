//! School-day rules for classifying attendance events.
//!
//! All wall-clock reasoning (which calendar day an entry belongs to, whether
//! an arrival is late) happens in a single fixed UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset as _, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::EventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendancePolicy {
  /// Offset of the school's local time from UTC, in minutes.
  pub utc_offset_minutes:     i32,
  /// An entry is late when the local hour is strictly greater than this.
  pub late_after_hour:        u32,
  /// Detections before this local hour are entries; from it on, exits.
  pub midday_hour:            u32,
  /// An exit is early when the local hour is strictly less than this.
  pub early_exit_before_hour: u32,
}

impl Default for AttendancePolicy {
  fn default() -> Self {
    Self {
      utc_offset_minutes:     0,
      late_after_hour:        9,
      midday_hour:            12,
      early_exit_before_hour: 15,
    }
  }
}

/// How a single event should be flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
  pub kind:          EventKind,
  pub is_late:       bool,
  pub is_early_exit: bool,
}

impl AttendancePolicy {
  /// The school's fixed offset. Out-of-range values fall back to UTC.
  pub fn offset(&self) -> FixedOffset {
    FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
      .unwrap_or_else(|| Utc.fix())
  }

  /// The local calendar day `at` falls on.
  pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&self.offset()).date_naive()
  }

  pub fn local_hour(&self, at: DateTime<Utc>) -> u32 {
    at.with_timezone(&self.offset()).hour()
  }

  /// Flag an event of a known kind (manual marking).
  pub fn flag(&self, kind: EventKind, at: DateTime<Utc>) -> Classification {
    let hour = self.local_hour(at);
    Classification {
      kind,
      is_late: kind == EventKind::Entry && hour > self.late_after_hour,
      is_early_exit: kind == EventKind::Exit
        && hour < self.early_exit_before_hour,
    }
  }

  /// Infer the kind from the time of day, then flag it (camera detection).
  pub fn classify(&self, at: DateTime<Utc>) -> Classification {
    let kind = if self.local_hour(at) < self.midday_hour {
      EventKind::Entry
    } else {
      EventKind::Exit
    };
    self.flag(kind, at)
  }
}
