//! Handlers for the roster and fee endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/students` | Optional `?q=` name / roll filter |
//! | `POST`  | `/students` | Body: [`NewStudent`]; returns 201 |
//! | `GET`   | `/students/:id` | 404 if not found |
//! | `PATCH` | `/students/:id` | Body: [`StudentPatch`]; 204 if the id is unknown |
//! | `POST`  | `/students/:id/pay` | Mark the fee paid today; 204 if unknown |
//! | `GET`   | `/students/:id/reminder` | Fee reminder text and WhatsApp link |
//! | `POST`  | `/register` | Body: [`QuickRegistration`]; registers and checks in |

use academy_core::{
  academy::FeeReminder,
  attendance::AttendanceLogEntry,
  kv::KeyValueStore,
  student::{NewStudent, QuickRegistration, Student, StudentId, StudentPatch},
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub q: String,
}

/// `GET /students[?q=<term>]`
pub async fn list<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Query(params): Query<ListParams>,
) -> Json<Vec<Student>> {
  let academy = state.academy.lock().await;
  Json(academy.search_students(&params.q).into_iter().cloned().collect())
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /students`
pub async fn create<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Json(body): Json<NewStudent>,
) -> Result<impl IntoResponse, ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name is required".to_owned()));
  }
  let student = state.academy.lock().await.enroll(body).await?;
  Ok((StatusCode::CREATED, Json(student)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /students/:id`
pub async fn get_one<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Path(id): Path<String>,
) -> Result<Json<Student>, ApiError> {
  let academy = state.academy.lock().await;
  academy
    .student(&StudentId(id.clone()))
    .cloned()
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))
}

// ─── Update ───────────────────────────────────────────────────────────────────

fn updated_or_no_content(student: Option<Student>) -> Response {
  match student {
    Some(s) => Json(s).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  }
}

/// `PATCH /students/:id`
pub async fn update<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Path(id): Path<String>,
  Json(patch): Json<StudentPatch>,
) -> Result<Response, ApiError> {
  let updated = state
    .academy
    .lock()
    .await
    .update_student(&StudentId(id), &patch)
    .await?;
  Ok(updated_or_no_content(updated))
}

/// `POST /students/:id/pay`
pub async fn pay<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Path(id): Path<String>,
) -> Result<Response, ApiError> {
  let updated = state
    .academy
    .lock()
    .await
    .mark_fee_paid(&StudentId(id))
    .await?;
  Ok(updated_or_no_content(updated))
}

// ─── Reminder ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Reminder {
  #[serde(flatten)]
  pub reminder: FeeReminder,
  /// Absent when the contact number has no digits to dial.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub link:     Option<String>,
}

/// WhatsApp click-to-chat link with the reminder text prefilled.
pub fn whatsapp_link(reminder: &FeeReminder) -> Option<Url> {
  let digits: String = reminder
    .contact_number
    .chars()
    .filter(char::is_ascii_digit)
    .collect();
  if digits.is_empty() {
    return None;
  }
  Url::parse_with_params(
    &format!("https://wa.me/{digits}"),
    [("text", reminder.message.as_str())],
  )
  .ok()
}

/// `GET /students/:id/reminder`
pub async fn reminder<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Path(id): Path<String>,
) -> Result<Json<Reminder>, ApiError> {
  let academy = state.academy.lock().await;
  let reminder = academy
    .fee_reminder(&StudentId(id.clone()))
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))?;
  let link = whatsapp_link(&reminder).map(String::from);
  Ok(Json(Reminder { reminder, link }))
}

// ─── Quick register ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Registered {
  pub student: Student,
  pub entry:   AttendanceLogEntry,
}

/// `POST /register`
pub async fn register<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Json(body): Json<QuickRegistration>,
) -> Result<impl IntoResponse, ApiError> {
  let (student, entry) = state.academy.lock().await.quick_register(body).await?;
  tracing::info!(id = %student.id, name = %student.name, "registered and logged in");
  Ok((StatusCode::CREATED, Json(Registered { student, entry })))
}
