//! HTTP server wiring for the academy dashboard.
//!
//! Loads [`ServerConfig`], and mounts the [`academy_api`] router under `/api`
//! with request tracing.

use std::path::{Path, PathBuf};

use academy_api::{AppState, InsightConfig, insight};
use academy_core::{kv::KeyValueStore, policy::AttendancePolicy};
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ACADEMY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  #[serde(default)]
  pub gemini_api_key:  Option<String>,
  pub gemini_model:    String,
  pub gemini_base_url: String,
  #[serde(default)]
  pub attendance:      AttendancePolicy,
}

impl ServerConfig {
  /// Layer defaults, the optional TOML file at `path`, and the environment.
  ///
  /// Nested keys use a double underscore in the environment, e.g.
  /// `ACADEMY_ATTENDANCE__UTC_OFFSET_MINUTES=330`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 5240)?
      .set_default("store_path", "academy.db")?
      .set_default("gemini_model", insight::DEFAULT_MODEL)?
      .set_default("gemini_base_url", insight::DEFAULT_BASE_URL)?
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ACADEMY")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn insight_config(&self) -> InsightConfig {
    InsightConfig {
      api_key:  self.gemini_api_key.clone(),
      model:    self.gemini_model.clone(),
      base_url: self.gemini_base_url.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the API nested under `/api`, with HTTP tracing.
pub fn app<K>(state: AppState<K>) -> Router
where
  K: KeyValueStore + 'static,
{
  Router::new()
    .nest("/api", academy_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use academy_api::InsightClient;
  use academy_core::{Academy, kv::MemoryKv};
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  use super::*;

  fn temp_config(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("academy-cfg-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn missing_file_uses_defaults() {
    let cfg = ServerConfig::load(Path::new("/definitely/not/here.toml")).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 5240);
    assert_eq!(cfg.store_path, PathBuf::from("academy.db"));
    assert_eq!(cfg.gemini_model, insight::DEFAULT_MODEL);
    assert_eq!(cfg.attendance, AttendancePolicy::default());
  }

  #[test]
  fn file_overrides_defaults_including_policy() {
    let path = temp_config(
      "academy.toml",
      r#"
        port = 8088
        store_path = "~/academy/data.db"
        gemini_api_key = "k"

        [attendance]
        utc_offset_minutes = 330
        late_after_hour = 8
      "#,
    );

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.port, 8088);
    assert_eq!(cfg.gemini_api_key.as_deref(), Some("k"));
    assert_eq!(cfg.attendance.utc_offset_minutes, 330);
    assert_eq!(cfg.attendance.late_after_hour, 8);
    assert_eq!(cfg.attendance.midday_hour, 12);
    assert_eq!(cfg.insight_config().api_key.as_deref(), Some("k"));
  }

  #[test]
  fn tilde_expands_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/a.db")),
      PathBuf::from(home).join("a.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs.db")), PathBuf::from("/abs.db"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let academy = Academy::initialize(MemoryKv::new(), AttendancePolicy::default()).await;
    let state = AppState::new(academy, InsightClient::disabled());

    let req = Request::builder().uri("/api/stats").body(Body::empty()).unwrap();
    let resp = app(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats["totalStudents"], 2);

    let req = Request::builder().uri("/stats").body(Body::empty()).unwrap();
    let resp = app(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
