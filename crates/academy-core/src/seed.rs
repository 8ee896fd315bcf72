//! Built-in demo data, loaded whenever a storage key is missing or unreadable.

use chrono::{NaiveDate, TimeZone, Utc};

use crate::{
  attendance::{AttendanceLogEntry, EventKind, LogId},
  student::{FeeStatus, Student, StudentId, StudentStatus},
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn student(
  id: &str,
  name: &str,
  roll: &str,
  status: StudentStatus,
  joined: NaiveDate,
  fee_status: FeeStatus,
  last_paid: Option<NaiveDate>,
  fee: f64,
  contact: &str,
  rate: f64,
) -> Student {
  Student {
    id:                StudentId::from(id),
    name:              name.to_owned(),
    roll_number:       roll.to_owned(),
    photo_url:         format!("https://picsum.photos/200/200?random={id}"),
    status,
    join_date:         joined,
    fee_status,
    last_payment_date: last_paid,
    fee_amount:        fee,
    contact_number:    contact.to_owned(),
    attendance_rate:   rate,
  }
}

/// The seed roster: one student per enrollment status, every fee status.
pub fn students() -> Vec<Student> {
  vec![
    student(
      "1", "Aarav Sharma", "ST-001", StudentStatus::Active,
      date(2024, 1, 10), FeeStatus::Paid, Some(date(2024, 10, 1)),
      500.0, "+919876543210", 95.0,
    ),
    student(
      "2", "Maya Patel", "ST-002", StudentStatus::Active,
      date(2024, 2, 5), FeeStatus::Pending, None,
      500.0, "+919876543211", 88.0,
    ),
    student(
      "3", "Rohan Verma", "ST-003", StudentStatus::Suspended,
      date(2023, 11, 20), FeeStatus::Overdue, Some(date(2024, 6, 1)),
      450.0, "+919876543212", 62.0,
    ),
    student(
      "4", "Isha Gupta", "ST-004", StudentStatus::Completed,
      date(2023, 6, 1), FeeStatus::Paid, Some(date(2024, 5, 1)),
      400.0, "+919876543213", 97.0,
    ),
    student(
      "5", "Kabir Singh", "ST-005", StudentStatus::Left,
      date(2023, 9, 15), FeeStatus::Pending, None,
      450.0, "+919876543214", 54.0,
    ),
  ]
}

/// The seed log, newest first.
pub fn attendance() -> Vec<AttendanceLogEntry> {
  let entry = |id: &str, sid: &str, name: &str, h: u32, m: u32, kind, late, early| {
    AttendanceLogEntry {
      id:            LogId(id.to_owned()),
      student_id:    StudentId::from(sid),
      student_name:  name.to_owned(),
      timestamp:     Utc
        .with_ymd_and_hms(2024, 10, 7, h, m, 0)
        .single()
        .unwrap_or_default(),
      kind,
      is_late:       late,
      is_early_exit: early,
      snapshot_url:  None,
    }
  };

  vec![
    entry("l4", "1", "Aarav Sharma", 15, 30, EventKind::Exit, false, false),
    entry("l3", "2", "Maya Patel", 14, 10, EventKind::Exit, false, true),
    entry("l2", "2", "Maya Patel", 10, 5, EventKind::Entry, true, false),
    entry("l1", "1", "Aarav Sharma", 8, 55, EventKind::Entry, false, false),
  ]
}
