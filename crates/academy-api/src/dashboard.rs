//! Handlers for the dashboard: statistics, AI narration and reset.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/stats` | Current snapshot |
//! | `GET`  | `/insight` | AI summary; never fails |
//! | `POST` | `/snapshot/analyze` | Raw JPEG body; AI description |
//! | `POST` | `/reset` | Body must be `{"confirm":true}` |

use academy_core::{kv::KeyValueStore, stats::DashboardStats};
use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct TextResponse {
  pub text: String,
}

/// `GET /stats`
pub async fn stats<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
) -> Json<DashboardStats> {
  Json(*state.academy.lock().await.stats())
}

/// `GET /insight`
///
/// The academy lock is released before the model is called.
pub async fn insight<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
) -> Json<TextResponse> {
  let (stats, recent, students) = {
    let academy = state.academy.lock().await;
    (
      *academy.stats(),
      academy.recent_log(crate::insight::RECENT_LOG_WINDOW).to_vec(),
      academy.students().to_vec(),
    )
  };

  let text = state.insights.daily_insight(&stats, &recent, &students).await;
  Json(TextResponse { text })
}

/// `POST /snapshot/analyze`
pub async fn analyze_snapshot<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  body: Bytes,
) -> Result<Json<TextResponse>, ApiError> {
  if body.is_empty() {
    return Err(ApiError::BadRequest("empty image".to_owned()));
  }
  let text = state.insights.analyze_snapshot(&body).await;
  Ok(Json(TextResponse { text }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetBody {
  #[serde(default)]
  pub confirm: bool,
}

/// `POST /reset`
pub async fn reset<K: KeyValueStore + 'static>(
  State(state): State<AppState<K>>,
  Json(body): Json<ResetBody>,
) -> Result<StatusCode, ApiError> {
  if !body.confirm {
    return Err(ApiError::BadRequest(
      "reset permanently deletes all data; send {\"confirm\": true}".to_owned(),
    ));
  }
  state.academy.lock().await.reset_all().await?;
  Ok(StatusCode::NO_CONTENT)
}
