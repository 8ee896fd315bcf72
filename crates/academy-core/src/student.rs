//! Roster entries and the forms that create or change them.
//!
//! The persisted shape uses camelCase keys so records written by earlier
//! browser builds of the dashboard load unchanged.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Opaque student identifier.
///
/// Freshly minted ids are UUID v4 strings, but any string is accepted so
/// legacy records (e.g. wall-clock millisecond ids) keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl StudentId {
  pub fn generate() -> Self { Self(Uuid::new_v4().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for StudentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for StudentId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Enrollment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StudentStatus {
  #[default]
  Active,
  Left,
  Suspended,
  Completed,
}

/// Fee status for the current billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeeStatus {
  Paid,
  #[default]
  Pending,
  Overdue,
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
  pub id:                StudentId,
  pub name:              String,
  /// Free text; not required to be unique.
  pub roll_number:       String,
  /// A URI or an embedded `data:` image.
  pub photo_url:         String,
  pub status:            StudentStatus,
  pub join_date:         NaiveDate,
  pub fee_status:        FeeStatus,
  #[serde(default, deserialize_with = "empty_date_as_none")]
  pub last_payment_date: Option<NaiveDate>,
  pub fee_amount:        f64,
  pub contact_number:    String,
  /// Percentage in `0..=100`; stored, never derived from the log.
  pub attendance_rate:   f64,
}

impl Student {
  /// Build a roster entry from the admin form, filling in enrollment defaults.
  pub fn enroll(form: NewStudent, today: NaiveDate, photo_seed: i64) -> Self {
    let photo_url = form
      .photo_url
      .filter(|p| !p.is_empty())
      .unwrap_or_else(|| placeholder_photo(photo_seed));

    Self {
      id: StudentId::generate(),
      name: form.name,
      roll_number: form.roll_number,
      photo_url,
      status: form.status,
      join_date: today,
      fee_status: FeeStatus::Pending,
      last_payment_date: None,
      fee_amount: form.fee_amount,
      contact_number: form.contact_number,
      attendance_rate: 100.0,
    }
  }

  /// Shallow-merge `patch` onto `self`. Fields absent from the patch keep
  /// their current values.
  pub fn apply(&mut self, patch: &StudentPatch) {
    if let Some(v) = &patch.name {
      self.name = v.clone();
    }
    if let Some(v) = &patch.roll_number {
      self.roll_number = v.clone();
    }
    if let Some(v) = &patch.photo_url {
      self.photo_url = v.clone();
    }
    if let Some(v) = patch.status {
      self.status = v;
    }
    if let Some(v) = patch.join_date {
      self.join_date = v;
    }
    if let Some(v) = patch.fee_status {
      self.fee_status = v;
    }
    if let Some(v) = patch.last_payment_date {
      self.last_payment_date = v;
    }
    if let Some(v) = patch.fee_amount {
      self.fee_amount = v;
    }
    if let Some(v) = &patch.contact_number {
      self.contact_number = v.clone();
    }
    if let Some(v) = patch.attendance_rate {
      self.attendance_rate = v;
    }
  }

  /// Check the fee and attendance rate against their limits.
  pub fn validate(&self) -> Result<()> {
    check_fee(self.fee_amount)?;
    check_rate(self.attendance_rate)
  }

  /// Case-insensitive substring match on name or roll number.
  pub fn matches_term(&self, term: &str) -> bool {
    let term = term.to_lowercase();
    self.name.to_lowercase().contains(&term)
      || self.roll_number.to_lowercase().contains(&term)
  }
}

fn check_fee(v: f64) -> Result<()> {
  if v.is_finite() && v >= 0.0 {
    Ok(())
  } else {
    Err(Error::InvalidStudent("fee amount must be a non-negative number"))
  }
}

fn check_rate(v: f64) -> Result<()> {
  if (0.0..=100.0).contains(&v) {
    Ok(())
  } else {
    Err(Error::InvalidStudent("attendance rate must be between 0 and 100"))
  }
}

/// Stand-in avatar used when no photo was supplied.
pub fn placeholder_photo(seed: i64) -> String {
  format!("https://picsum.photos/200/200?random={seed}")
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Partial update for [`Student::apply`]. `id` is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:              Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub roll_number:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub photo_url:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status:            Option<StudentStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub join_date:         Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fee_status:        Option<FeeStatus>,
  /// `None` keeps the date, `Some(None)` clears it.
  #[serde(
    default,
    deserialize_with = "present_nullable_date",
    skip_serializing_if = "Option::is_none"
  )]
  pub last_payment_date: Option<Option<NaiveDate>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fee_amount:        Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_number:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attendance_rate:   Option<f64>,
}

impl StudentPatch {
  /// Limits apply only to the fields the patch sets.
  pub fn validate(&self) -> Result<()> {
    if let Some(v) = self.fee_amount {
      check_fee(v)?;
    }
    if let Some(v) = self.attendance_rate {
      check_rate(v)?;
    }
    Ok(())
  }
}

/// Roster-add form submitted by an administrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
  pub name:           String,
  #[serde(default)]
  pub roll_number:    String,
  #[serde(default)]
  pub contact_number: String,
  #[serde(default)]
  pub fee_amount:     f64,
  #[serde(default)]
  pub status:         StudentStatus,
  #[serde(default)]
  pub photo_url:      Option<String>,
}

/// Walk-in registration captured at the attendance desk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickRegistration {
  pub name:        String,
  pub roll_number: String,
  #[serde(default)]
  pub contact:     Option<String>,
  /// Captured face crop, usually a `data:image/jpeg;base64,...` URI.
  #[serde(default)]
  pub photo:       Option<String>,
}

// ─── Serde helpers ───────────────────────────────────────────────────────────

/// Older records store "never paid" as an empty string.
fn empty_date_as_none<'de, D>(de: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(de)?;
  match raw.as_deref().map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
  }
}

fn present_nullable_date<'de, D>(
  de: D,
) -> Result<Option<Option<NaiveDate>>, D::Error>
where
  D: Deserializer<'de>,
{
  empty_date_as_none(de).map(Some)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Student {
    Student {
      id:                StudentId::from("s-1"),
      name:              "Ada Lovelace".into(),
      roll_number:       "R-101".into(),
      photo_url:         "https://example.com/ada.jpg".into(),
      status:            StudentStatus::Active,
      join_date:         NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
      fee_status:        FeeStatus::Pending,
      last_payment_date: None,
      fee_amount:        250.0,
      contact_number:    "+15550100".into(),
      attendance_rate:   92.5,
    }
  }

  #[test]
  fn patch_changes_only_named_fields() {
    let mut s = sample();
    let before = s.clone();

    s.apply(&StudentPatch { fee_amount: Some(100.0), ..Default::default() });

    assert_eq!(s.fee_amount, 100.0);
    assert_eq!(Student { fee_amount: before.fee_amount, ..s }, before);
  }

  #[test]
  fn patch_can_clear_last_payment_date() {
    let mut s = sample();
    s.last_payment_date = NaiveDate::from_ymd_opt(2024, 3, 1);

    let patch: StudentPatch =
      serde_json::from_str(r#"{"lastPaymentDate": null}"#).unwrap();
    assert_eq!(patch.last_payment_date, Some(None));

    s.apply(&patch);
    assert_eq!(s.last_payment_date, None);
  }

  #[test]
  fn absent_last_payment_date_leaves_field_alone() {
    let patch: StudentPatch = serde_json::from_str(r#"{"name": "A"}"#).unwrap();
    assert_eq!(patch.last_payment_date, None);
  }

  #[test]
  fn legacy_record_with_empty_payment_date_loads() {
    let json = r#"{
      "id": "1715000000000",
      "name": "Grace Hopper",
      "rollNumber": "R-7",
      "photoUrl": "",
      "status": "Active",
      "joinDate": "2024-05-06",
      "feeStatus": "Overdue",
      "lastPaymentDate": "",
      "feeAmount": 500,
      "contactNumber": "N/A",
      "attendanceRate": 100
    }"#;

    let s: Student = serde_json::from_str(json).unwrap();
    assert_eq!(s.id.as_str(), "1715000000000");
    assert_eq!(s.fee_status, FeeStatus::Overdue);
    assert_eq!(s.last_payment_date, None);
    assert_eq!(s.fee_amount, 500.0);
  }

  #[test]
  fn enroll_fills_defaults() {
    let today = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
    let s = Student::enroll(
      NewStudent { name: "Alan".into(), fee_amount: 300.0, ..Default::default() },
      today,
      42,
    );

    assert_eq!(s.join_date, today);
    assert_eq!(s.fee_status, FeeStatus::Pending);
    assert_eq!(s.attendance_rate, 100.0);
    assert_eq!(s.photo_url, "https://picsum.photos/200/200?random=42");
    assert!(!s.id.as_str().is_empty());
  }

  #[test]
  fn term_matches_name_or_roll_case_insensitively() {
    let s = sample();
    assert!(s.matches_term("lovel"));
    assert!(s.matches_term("r-10"));
    assert!(!s.matches_term("turing"));
  }

  #[test]
  fn limits_on_fee_and_attendance_rate() {
    let mut s = sample();
    assert!(s.validate().is_ok());

    s.fee_amount = -0.5;
    assert!(matches!(s.validate(), Err(Error::InvalidStudent(_))));
    s.fee_amount = 0.0;
    s.attendance_rate = 100.5;
    assert!(matches!(s.validate(), Err(Error::InvalidStudent(_))));

    assert!(StudentPatch::default().validate().is_ok());
    let p = StudentPatch { attendance_rate: Some(0.0), ..Default::default() };
    assert!(p.validate().is_ok());
  }
}
