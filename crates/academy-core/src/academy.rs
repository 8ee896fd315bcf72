//! [`Academy`]: the authoritative roster and attendance log.
//!
//! Every mutating operation runs the same tail: apply the change in memory,
//! recompute the [`DashboardStats`] snapshot through [`Academy::on_mutation`],
//! then write the changed collection back to the [`KeyValueStore`]. A failed
//! write is returned to the caller; the in-memory state and snapshot already
//! reflect the mutation.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
  Error, Result,
  attendance::{AttendanceLogEntry, EventKind},
  detect::{self, Detection},
  kv::{KeyValueStore, LOGS_KEY, STUDENTS_KEY},
  policy::AttendancePolicy,
  seed,
  stats::DashboardStats,
  student::{
    FeeStatus, NewStudent, QuickRegistration, Student, StudentId,
    StudentPatch, StudentStatus, placeholder_photo,
  },
};

/// Monthly fee assigned to walk-in registrations.
pub const QUICK_REGISTER_FEE: f64 = 500.0;

/// Text for a fee reminder sent to a student's contact number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeReminder {
  pub contact_number: String,
  pub message:        String,
}

/// The academy's single owned state object.
///
/// There is exactly one writer; callers that share it across tasks wrap it in
/// a mutex so each operation runs to completion before the next observes it.
pub struct Academy<K> {
  kv:       K,
  policy:   AttendancePolicy,
  clock:    fn() -> DateTime<Utc>,
  students: Vec<Student>,
  /// Newest first.
  log:      Vec<AttendanceLogEntry>,
  stats:    DashboardStats,
}

impl<K: KeyValueStore> Academy<K> {
  /// Load both collections from `kv`, falling back to the seed dataset for any
  /// key that is missing or unreadable, and compute the initial snapshot.
  pub async fn initialize(kv: K, policy: AttendancePolicy) -> Self {
    Self::initialize_with_clock(kv, policy, Utc::now).await
  }

  /// As [`Academy::initialize`], reading the current time from `clock`.
  pub async fn initialize_with_clock(
    kv: K,
    policy: AttendancePolicy,
    clock: fn() -> DateTime<Utc>,
  ) -> Self {
    let students = load_or_seed(&kv, STUDENTS_KEY, seed::students).await;
    let log = load_or_seed(&kv, LOGS_KEY, seed::attendance).await;

    let mut academy = Self {
      kv,
      policy,
      clock,
      students,
      log,
      stats: DashboardStats::default(),
    };
    academy.on_mutation();

    tracing::info!(
      students = academy.students.len(),
      log_entries = academy.log.len(),
      "academy initialised"
    );
    academy
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn students(&self) -> &[Student] { &self.students }

  /// The first student with `id`.
  pub fn student(&self, id: &StudentId) -> Option<&Student> {
    self.students.iter().find(|s| &s.id == id)
  }

  /// The whole attendance log, newest first.
  pub fn log(&self) -> &[AttendanceLogEntry] { &self.log }

  /// The `n` most recent log entries.
  pub fn recent_log(&self, n: usize) -> &[AttendanceLogEntry] {
    &self.log[..n.min(self.log.len())]
  }

  pub fn stats(&self) -> &DashboardStats { &self.stats }

  pub fn policy(&self) -> &AttendancePolicy { &self.policy }

  pub fn now(&self) -> DateTime<Utc> { (self.clock)() }

  /// Today's calendar date in the school's offset.
  pub fn today(&self) -> NaiveDate { self.policy.local_date(self.now()) }

  /// Admin roster filter: substring match on name or roll number. An empty
  /// term returns the whole roster.
  pub fn search_students(&self, term: &str) -> Vec<&Student> {
    let term = term.trim();
    self
      .students
      .iter()
      .filter(|s| term.is_empty() || s.matches_term(term))
      .collect()
  }

  /// Attendance-desk lookup: the first student whose name contains `query`
  /// or whose roll number equals it, ignoring case.
  pub fn find_for_attendance(&self, query: &str) -> Option<&Student> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
      return None;
    }
    self.students.iter().find(|s| {
      s.name.to_lowercase().contains(&query)
        || s.roll_number.to_lowercase() == query
    })
  }

  pub fn fee_reminder(&self, id: &StudentId) -> Option<FeeReminder> {
    self.student(id).map(|s| FeeReminder {
      contact_number: s.contact_number.clone(),
      message:        format!(
        "Dear parent, a fee of ${} is pending for {}. Please pay immediately.",
        s.fee_amount, s.name
      ),
    })
  }

  // ── Core mutations ────────────────────────────────────────────────────────

  /// Append `student` to the roster.
  ///
  /// The id is trusted to be fresh. A colliding id leaves two records with the
  /// same id; later updates then apply to both.
  ///
  /// Fails with [`Error::InvalidStudent`] when the fee is negative or the
  /// attendance rate falls outside `0..=100`.
  pub async fn add_student(&mut self, student: Student) -> Result<()> {
    student.validate()?;
    tracing::debug!(id = %student.id, "adding student");
    self.students.push(student);
    self.on_mutation();
    self.persist_students().await
  }

  /// Shallow-merge `patch` onto the student with `id`.
  ///
  /// An unknown id is a silent no-op returning `Ok(None)`; nothing is
  /// written. A patch with an out-of-range fee or attendance rate is rejected
  /// before anything changes.
  pub async fn update_student(
    &mut self,
    id: &StudentId,
    patch: &StudentPatch,
  ) -> Result<Option<Student>> {
    patch.validate()?;
    let mut updated = None;
    for s in self.students.iter_mut().filter(|s| &s.id == id) {
      s.apply(patch);
      updated.get_or_insert_with(|| s.clone());
    }

    if updated.is_none() {
      tracing::debug!(%id, "update for unknown student ignored");
      return Ok(None);
    }

    self.on_mutation();
    self.persist_students().await?;
    Ok(updated)
  }

  /// Prepend `entry` to the log. Timestamps are not checked against existing
  /// entries.
  pub async fn record_attendance(
    &mut self,
    entry: AttendanceLogEntry,
  ) -> Result<()> {
    tracing::debug!(
      id = %entry.id,
      student = %entry.student_id,
      kind = %entry.kind,
      "recording attendance"
    );
    self.log.insert(0, entry);
    self.on_mutation();
    self.persist_log().await
  }

  /// Empty both collections and delete both storage keys. Irreversible.
  pub async fn reset_all(&mut self) -> Result<()> {
    tracing::info!(
      students = self.students.len(),
      log_entries = self.log.len(),
      "resetting academy database"
    );
    self.students.clear();
    self.log.clear();
    self.on_mutation();

    self.kv.remove(STUDENTS_KEY).await.map_err(Error::storage)?;
    self.kv.remove(LOGS_KEY).await.map_err(Error::storage)?;
    Ok(())
  }

  // ── Workflows ─────────────────────────────────────────────────────────────

  /// Enrol a student from the admin form.
  pub async fn enroll(&mut self, form: NewStudent) -> Result<Student> {
    let now = self.now();
    let student = Student::enroll(form, self.today(), now.timestamp_millis());
    self.add_student(student.clone()).await?;
    Ok(student)
  }

  /// Set the fee status to Paid with today's date.
  pub async fn mark_fee_paid(
    &mut self,
    id: &StudentId,
  ) -> Result<Option<Student>> {
    let patch = StudentPatch {
      fee_status: Some(FeeStatus::Paid),
      last_payment_date: Some(Some(self.today())),
      ..Default::default()
    };
    self.update_student(id, &patch).await
  }

  /// Manually mark an existing student in or out.
  pub async fn mark_manual(
    &mut self,
    query: &str,
    kind: EventKind,
  ) -> Result<AttendanceLogEntry> {
    let now = self.now();
    let flags = self.policy.flag(kind, now);
    let mut entry = match self.find_for_attendance(query) {
      Some(student) => AttendanceLogEntry::for_student(student, kind, now),
      None => return Err(Error::StudentNotFound(query.to_owned())),
    };
    entry.is_late = flags.is_late;
    entry.is_early_exit = flags.is_early_exit;

    self.record_attendance(entry.clone()).await?;
    Ok(entry)
  }

  /// Register a walk-in student and check them in immediately.
  pub async fn quick_register(
    &mut self,
    form: QuickRegistration,
  ) -> Result<(Student, AttendanceLogEntry)> {
    let name = form.name.trim();
    let roll_number = form.roll_number.trim();
    if name.is_empty() || roll_number.is_empty() {
      return Err(Error::InvalidRegistration(
        "name and roll number are required",
      ));
    }

    let now = self.now();
    let student = Student {
      id:                StudentId::generate(),
      name:              name.to_owned(),
      roll_number:       roll_number.to_owned(),
      photo_url:         form
        .photo
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| placeholder_photo(now.timestamp_millis())),
      status:            StudentStatus::Active,
      join_date:         self.today(),
      fee_status:        FeeStatus::Pending,
      last_payment_date: None,
      fee_amount:        QUICK_REGISTER_FEE,
      contact_number:    form
        .contact
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| "N/A".to_owned()),
      attendance_rate:   100.0,
    };
    self.add_student(student.clone()).await?;

    let entry = AttendanceLogEntry::for_student(&student, EventKind::Entry, now);
    self.record_attendance(entry.clone()).await?;

    Ok((student, entry))
  }

  /// One simulated camera detection; a match is recorded in the log.
  pub async fn simulate_detection<R: Rng>(
    &mut self,
    rng: &mut R,
  ) -> Result<Detection> {
    let detection =
      detect::simulate(rng, &self.students, &self.policy, self.now());
    if let Detection::Matched(entry) = &detection {
      self.record_attendance(entry.clone()).await?;
    }
    Ok(detection)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  /// Recompute the snapshot from scratch and swap it in.
  fn on_mutation(&mut self) {
    self.stats = DashboardStats::compute(
      &self.students,
      &self.log,
      self.today(),
      &self.policy,
    );
  }

  async fn persist_students(&self) -> Result<()> {
    let raw = serde_json::to_string(&self.students)?;
    self.kv.set(STUDENTS_KEY, raw).await.map_err(Error::storage)
  }

  async fn persist_log(&self) -> Result<()> {
    let raw = serde_json::to_string(&self.log)?;
    self.kv.set(LOGS_KEY, raw).await.map_err(Error::storage)
  }
}

/// Read and decode one collection; any failure degrades to the seed data.
async fn load_or_seed<K, T>(kv: &K, key: &str, seed: fn() -> Vec<T>) -> Vec<T>
where
  K: KeyValueStore,
  T: DeserializeOwned,
{
  match kv.get(key).await {
    Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str(&raw) {
      Ok(items) => items,
      Err(e) => {
        tracing::warn!(key, error = %e, "stored collection unreadable, using seed data");
        seed()
      }
    },
    Ok(_) => {
      tracing::debug!(key, "no stored collection, using seed data");
      seed()
    }
    Err(e) => {
      tracing::warn!(key, error = %e, "storage read failed, using seed data");
      seed()
    }
  }
}
