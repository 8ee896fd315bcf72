//! Simulated face recognition for the attendance camera.
//!
//! There is no real biometric matching: a detection succeeds with a fixed
//! probability and then picks a uniformly random student from the roster.

use chrono::{DateTime, Utc};
use rand::{Rng, seq::IndexedRandom};

use crate::{
  attendance::AttendanceLogEntry,
  policy::AttendancePolicy,
  student::Student,
};

/// Draws above this threshold count as a match (a 40% hit rate).
pub const MATCH_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
  Matched(AttendanceLogEntry),
  NoMatch,
}

impl Detection {
  pub fn entry(&self) -> Option<&AttendanceLogEntry> {
    match self {
      Self::Matched(e) => Some(e),
      Self::NoMatch => None,
    }
  }
}

/// Run one detection attempt against `roster` at time `now`.
///
/// Any student can be matched regardless of enrollment status. The entry's
/// kind and flags come from `policy`. An empty roster never matches.
pub fn simulate<R: Rng>(
  rng: &mut R,
  roster: &[Student],
  policy: &AttendancePolicy,
  now: DateTime<Utc>,
) -> Detection {
  if rng.random::<f64>() <= MATCH_THRESHOLD {
    return Detection::NoMatch;
  }
  let Some(student) = roster.choose(rng) else {
    return Detection::NoMatch;
  };

  let c = policy.classify(now);
  let mut entry = AttendanceLogEntry::for_student(student, c.kind, now);
  entry.is_late = c.is_late;
  entry.is_early_exit = c.is_early_exit;
  Detection::Matched(entry)
}
