//! The dashboard statistics snapshot. Derived on every mutation, never stored.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
  attendance::{AttendanceLogEntry, EventKind},
  policy::AttendancePolicy,
  student::{FeeStatus, Student, StudentStatus},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
  /// Students whose status is Active.
  pub total_students: usize,
  pub present_today:  usize,
  /// `total_students - present_today`; negative when non-active students
  /// checked in.
  pub absent_today:   i64,
  pub late_arrivals:  usize,
  pub early_exits:    usize,
  pub total_revenue:  f64,
  pub pending_fees:   f64,
}

impl DashboardStats {
  /// Full rescan of both collections for the local calendar day `today`.
  ///
  /// A student counts as present only through an ENTRY event; EXIT-only
  /// students are not present.
  pub fn compute(
    students: &[Student],
    log: &[AttendanceLogEntry],
    today: NaiveDate,
    policy: &AttendancePolicy,
  ) -> Self {
    let total_students = students
      .iter()
      .filter(|s| s.status == StudentStatus::Active)
      .count();

    let todays: Vec<&AttendanceLogEntry> = log
      .iter()
      .filter(|e| policy.local_date(e.timestamp) == today)
      .collect();

    let present: HashSet<&str> = todays
      .iter()
      .filter(|e| e.kind == EventKind::Entry)
      .map(|e| e.student_id.as_str())
      .collect();

    let late_arrivals = todays.iter().filter(|e| e.is_late).count();
    let early_exits = todays.iter().filter(|e| e.is_early_exit).count();

    let (total_revenue, pending_fees) =
      students.iter().fold((0.0, 0.0), |(paid, pending), s| {
        if s.fee_status == FeeStatus::Paid {
          (paid + s.fee_amount, pending)
        } else {
          (paid, pending + s.fee_amount)
        }
      });

    Self {
      total_students,
      present_today: present.len(),
      absent_today: total_students as i64 - present.len() as i64,
      late_arrivals,
      early_exits,
      total_revenue,
      pending_fees,
    }
  }
}
