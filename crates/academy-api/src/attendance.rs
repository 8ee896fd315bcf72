//! Handlers for `/attendance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/attendance` | Newest first; optional `?limit=` |
//! | `POST` | `/attendance` | Body: a full log entry; returns 201 |
//! | `POST` | `/attendance/manual` | Body: `{"query":"...","type":"ENTRY"}`; 404 on miss |
//! | `POST` | `/attendance/detect` | One simulated camera detection |

use academy_core::{
  attendance::{AttendanceLogEntry, EventKind},
  detect::Detection,
  kv::KeyValueStore,
};
use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit: Option<usize>,
}

/// `GET /attendance[?limit=<n>]`
pub async fn list<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Query(params): Query<ListParams>,
) -> Json<Vec<AttendanceLogEntry>> {
  let academy = state.academy.lock().await;
  let entries = match params.limit {
    Some(n) => academy.recent_log(n),
    None => academy.log(),
  };
  Json(entries.to_vec())
}

// ─── Record ───────────────────────────────────────────────────────────────────

/// `POST /attendance`
pub async fn create<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Json(entry): Json<AttendanceLogEntry>,
) -> Result<impl IntoResponse, ApiError> {
  state
    .academy
    .lock()
    .await
    .record_attendance(entry.clone())
    .await?;
  Ok((StatusCode::CREATED, Json(entry)))
}

// ─── Manual ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ManualBody {
  /// Name fragment or exact roll number.
  pub query: String,
  #[serde(rename = "type")]
  pub kind:  EventKind,
}

/// `POST /attendance/manual`
pub async fn manual<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Json(body): Json<ManualBody>,
) -> Result<impl IntoResponse, ApiError> {
  let entry = state
    .academy
    .lock()
    .await
    .mark_manual(&body.query, body.kind)
    .await?;
  Ok((StatusCode::CREATED, Json(entry)))
}

// ─── Detect ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DetectResponse {
  pub matched: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub entry:   Option<AttendanceLogEntry>,
  pub message: String,
}

/// `POST /attendance/detect`
pub async fn detect<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
) -> Result<Json<DetectResponse>, ApiError> {
  let mut rng = StdRng::from_os_rng();
  let mut academy = state.academy.lock().await;
  let detection = academy.simulate_detection(&mut rng).await?;

  let response = match detection {
    Detection::Matched(entry) => {
      let roll = academy
        .student(&entry.student_id)
        .map(|s| s.roll_number.clone())
        .unwrap_or_default();
      DetectResponse {
        matched: true,
        message: format!("Match Found: {} ({roll})", entry.student_name),
        entry:   Some(entry),
      }
    }
    Detection::NoMatch => DetectResponse {
      matched: false,
      entry:   None,
      message: "No match found in database.".to_owned(),
    },
  };
  Ok(Json(response))
}
