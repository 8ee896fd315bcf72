//! JSON REST API for the academy dashboard.
//!
//! Exposes an axum [`Router`] over one shared [`Academy`]. Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", academy_api::api_router(state))
//! ```

pub mod attendance;
pub mod dashboard;
pub mod error;
pub mod insight;
pub mod students;

use std::sync::Arc;

use academy_core::{Academy, kv::KeyValueStore};
use axum::{
  Router,
  routing::{get, post},
};
use tokio::sync::Mutex;

pub use error::ApiError;
pub use insight::{InsightClient, InsightConfig};

/// Shared state threaded through all handlers.
///
/// The academy sits behind one async mutex so every operation runs to
/// completion before the next one can observe it.
pub struct AppState<K> {
  pub academy:  Arc<Mutex<Academy<K>>>,
  pub insights: Arc<InsightClient>,
}

impl<K> AppState<K> {
  pub fn new(academy: Academy<K>, insights: InsightClient) -> Self {
    Self {
      academy:  Arc::new(Mutex::new(academy)),
      insights: Arc::new(insights),
    }
  }
}

impl<K> Clone for AppState<K> {
  fn clone(&self) -> Self {
    Self {
      academy:  Arc::clone(&self.academy),
      insights: Arc::clone(&self.insights),
    }
  }
}

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<K>(state: AppState<K>) -> Router<()>
where
  K: KeyValueStore + 'static,
{
  Router::new()
    // Roster & fees
    .route("/students", get(students::list::<K>).post(students::create::<K>))
    .route(
      "/students/{id}",
      get(students::get_one::<K>).patch(students::update::<K>),
    )
    .route("/students/{id}/pay", post(students::pay::<K>))
    .route("/students/{id}/reminder", get(students::reminder::<K>))
    .route("/register", post(students::register::<K>))
    // Attendance
    .route(
      "/attendance",
      get(attendance::list::<K>).post(attendance::create::<K>),
    )
    .route("/attendance/manual", post(attendance::manual::<K>))
    .route("/attendance/detect", post(attendance::detect::<K>))
    // Dashboard
    .route("/stats", get(dashboard::stats::<K>))
    .route("/insight", get(dashboard::insight::<K>))
    .route("/snapshot/analyze", post(dashboard::analyze_snapshot::<K>))
    .route("/reset", post(dashboard::reset::<K>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use academy_core::{
    kv::{LOGS_KEY, MemoryKv, STUDENTS_KEY},
    policy::AttendancePolicy,
  };
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use chrono::{DateTime, TimeZone, Utc};
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 2, 8, 30, 0).unwrap()
  }

  async fn make_state(seeded: bool) -> (AppState<MemoryKv>, MemoryKv) {
    let kv = MemoryKv::new();
    if !seeded {
      kv.set(STUDENTS_KEY, "[]".into()).await.unwrap();
      kv.set(LOGS_KEY, "[]".into()).await.unwrap();
    }
    let academy =
      Academy::initialize_with_clock(kv.clone(), AttendancePolicy::default(), morning)
        .await;
    (AppState::new(academy, InsightClient::disabled()), kv)
  }

  async fn send(
    state:  AppState<MemoryKv>,
    method: &str,
    uri:    &str,
    body:   Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    api_router(state).oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── Students ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_list_and_get() {
    let (state, _) = make_state(false).await;

    let resp = send(
      state.clone(),
      "POST",
      "/students",
      Some(json!({ "name": "Ada", "rollNumber": "A-1", "feeAmount": 300 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await;
    let id = created["id"].as_str().unwrap().to_owned();
    assert_eq!(created["feeStatus"], "Pending");
    assert_eq!(created["joinDate"], "2025-04-02");

    let list = json_body(send(state.clone(), "GET", "/students?q=ada", None).await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let resp = send(state, "GET", &format!("/students/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["name"], "Ada");
  }

  #[tokio::test]
  async fn create_without_name_is_400() {
    let (state, _) = make_state(false).await;
    let resp = send(state, "POST", "/students", Some(json!({ "name": " " }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn get_unknown_student_is_404() {
    let (state, _) = make_state(false).await;
    let resp = send(state, "GET", "/students/nope", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(json_body(resp).await["error"].as_str().unwrap().contains("nope"));
  }

  #[tokio::test]
  async fn patch_merges_and_unknown_is_204() {
    let (state, _) = make_state(true).await;

    let resp = send(
      state.clone(),
      "PATCH",
      "/students/2",
      Some(json!({ "feeAmount": 100 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let s = json_body(resp).await;
    assert_eq!(s["feeAmount"], 100.0);
    assert_eq!(s["name"], "Maya Patel");

    let resp = send(
      state,
      "PATCH",
      "/students/missing",
      Some(json!({ "feeAmount": 1 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  }

  #[tokio::test]
  async fn pay_updates_stats() {
    let (state, _) = make_state(true).await;
    let resp = send(state.clone(), "POST", "/students/2/pay", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["lastPaymentDate"], "2025-04-02");

    let stats = json_body(send(state, "GET", "/stats", None).await).await;
    assert_eq!(stats["totalRevenue"], 1400.0);
    assert_eq!(stats["pendingFees"], 900.0);
  }

  #[tokio::test]
  async fn reminder_text() {
    let (state, _) = make_state(true).await;
    let resp = send(state, "GET", "/students/2/reminder", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let r = json_body(resp).await;
    assert_eq!(r["contactNumber"], "+919876543211");
    assert!(r["message"].as_str().unwrap().contains("$500 is pending for Maya Patel"));
    assert_eq!(
      r["link"],
      "https://wa.me/919876543211?text=Dear+parent%2C+a+fee+of+%24500+is+pending+for+\
       Maya+Patel.+Please+pay+immediately."
    );
  }

  #[test]
  fn no_link_without_dialable_contact() {
    let reminder = academy_core::academy::FeeReminder {
      contact_number: "N/A".into(),
      message:        "Dear parent".into(),
    };
    assert!(students::whatsapp_link(&reminder).is_none());
  }

  #[tokio::test]
  async fn out_of_range_fee_or_rate_is_400() {
    let (state, kv) = make_state(true).await;

    let resp = send(
      state.clone(),
      "POST",
      "/students",
      Some(json!({ "name": "Neg", "feeAmount": -300 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].as_str().unwrap().contains("fee amount"));

    let resp = send(
      state.clone(),
      "PATCH",
      "/students/2",
      Some(json!({ "attendanceRate": 250 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let stats = json_body(send(state.clone(), "GET", "/stats", None).await).await;
    assert_eq!(stats["pendingFees"], 1400.0);
    assert_eq!(kv.snapshot(STUDENTS_KEY), None);

    let s = json_body(send(state, "GET", "/students/2", None).await).await;
    assert_ne!(s["attendanceRate"], 250.0);
  }

  #[tokio::test]
  async fn quick_register_checks_in() {
    let (state, _) = make_state(false).await;
    let resp = send(
      state.clone(),
      "POST",
      "/register",
      Some(json!({ "name": "Walk In", "rollNumber": "W-9" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["entry"]["type"], "ENTRY");
    assert_eq!(body["entry"]["studentId"], body["student"]["id"]);

    let stats = json_body(send(state, "GET", "/stats", None).await).await;
    assert_eq!(stats["presentToday"], 1);
    assert_eq!(stats["absentToday"], 0);
  }

  #[tokio::test]
  async fn quick_register_missing_roll_is_400() {
    let (state, _) = make_state(false).await;
    let resp = send(
      state,
      "POST",
      "/register",
      Some(json!({ "name": "Walk In", "rollNumber": "" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Attendance ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn manual_entry_and_miss() {
    let (state, _) = make_state(true).await;

    let resp = send(
      state.clone(),
      "POST",
      "/attendance/manual",
      Some(json!({ "query": "st-002", "type": "ENTRY" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["studentName"], "Maya Patel");

    let resp = send(
      state.clone(),
      "POST",
      "/attendance/manual",
      Some(json!({ "query": "nobody", "type": "EXIT" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
      json_body(resp).await["error"],
      "Student not found! Please check name or roll number."
    );

    let log = json_body(send(state, "GET", "/attendance?limit=1", None).await).await;
    assert_eq!(log.as_array().unwrap().len(), 1);
    assert_eq!(log[0]["studentName"], "Maya Patel");
  }

  #[tokio::test]
  async fn posted_entries_are_listed_newest_first() {
    let (state, kv) = make_state(false).await;
    for id in ["1", "2", "3"] {
      let resp = send(
        state.clone(),
        "POST",
        "/attendance",
        Some(json!({
          "id": id,
          "studentId": "s",
          "studentName": "S",
          "timestamp": "2025-04-02T08:00:00Z",
          "type": "ENTRY"
        })),
      )
      .await;
      assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let log = json_body(send(state, "GET", "/attendance", None).await).await;
    let ids: Vec<&str> = log
      .as_array()
      .unwrap()
      .iter()
      .map(|e| e["id"].as_str().unwrap())
      .collect();
    assert_eq!(ids, ["3", "2", "1"]);
    assert!(kv.snapshot(LOGS_KEY).unwrap().starts_with("[{\"id\":\"3\""));
  }

  #[tokio::test]
  async fn detect_on_empty_roster_never_matches() {
    let (state, _) = make_state(false).await;
    let resp = send(state, "POST", "/attendance/detect", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["matched"], false);
    assert_eq!(body["message"], "No match found in database.");
  }

  // ── Dashboard ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn insight_falls_back_without_api_key() {
    let (state, _) = make_state(true).await;
    let body = json_body(send(state, "GET", "/insight", None).await).await;
    assert_eq!(body["text"], insight::INSIGHT_UNAVAILABLE);
  }

  #[tokio::test]
  async fn snapshot_requires_body() {
    let (state, _) = make_state(true).await;
    let resp = send(state.clone(), "POST", "/snapshot/analyze", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
      .method("POST")
      .uri("/snapshot/analyze")
      .header(header::CONTENT_TYPE, "image/jpeg")
      .body(Body::from(vec![0xFFu8, 0xD8, 0xFF]))
      .unwrap();
    let resp = api_router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["text"], insight::VISION_UNAVAILABLE);
  }

  #[tokio::test]
  async fn reset_requires_confirmation() {
    let (state, kv) = make_state(true).await;
    // Touch storage so both keys exist.
    send(state.clone(), "POST", "/students/1/pay", None).await;
    send(
      state.clone(),
      "POST",
      "/attendance/manual",
      Some(json!({ "query": "aarav", "type": "ENTRY" })),
    )
    .await;

    let resp = send(state.clone(), "POST", "/reset", Some(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(kv.snapshot(STUDENTS_KEY).is_some());

    let resp = send(state.clone(), "POST", "/reset", Some(json!({ "confirm": true }))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(kv.snapshot(STUDENTS_KEY), None);
    assert_eq!(kv.snapshot(LOGS_KEY), None);

    let stats = json_body(send(state, "GET", "/stats", None).await).await;
    assert_eq!(
      stats,
      json!({
        "totalStudents": 0,
        "presentToday": 0,
        "absentToday": 0,
        "lateArrivals": 0,
        "earlyExits": 0,
        "totalRevenue": 0.0,
        "pendingFees": 0.0
      })
    );
  }
}
