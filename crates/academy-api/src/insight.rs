//! Best-effort AI narration backed by the Gemini `generateContent` REST API.
//!
//! Neither call ever fails from the caller's point of view: any error, or a
//! missing API key, yields a fixed fallback string.

use std::time::Duration;

use academy_core::{
  attendance::AttendanceLogEntry,
  stats::DashboardStats,
  student::{FeeStatus, Student, StudentStatus},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str =
  "https://generativelanguage.googleapis.com/v1beta";

pub const INSIGHT_EMPTY: &str = "No insights available at this time.";
pub const INSIGHT_UNAVAILABLE: &str = "AI insights service is currently \
  unavailable. Please check your connection or API key.";
pub const VISION_EMPTY: &str = "Analysis complete.";
pub const VISION_UNAVAILABLE: &str = "Could not analyze image.";

const VISION_PROMPT: &str = "Analyze this security camera frame. Describe \
  the person's appearance (clothing, estimated age, gender) and whether they \
  look suspicious or are carrying any visible objects. Keep it brief and \
  objective.";

/// How many of the newest log entries the narrative prompt includes.
pub const RECENT_LOG_WINDOW: usize = 5;

#[derive(Debug, Error)]
pub enum InsightError {
  #[error("no API key configured")]
  NotConfigured,
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
  #[error("unexpected status {0}")]
  Status(StatusCode),
}

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct InsightConfig {
  pub api_key:  Option<String>,
  pub model:    String,
  pub base_url: String,
}

impl Default for InsightConfig {
  fn default() -> Self {
    Self {
      api_key:  None,
      model:    DEFAULT_MODEL.to_owned(),
      base_url: DEFAULT_BASE_URL.to_owned(),
    }
  }
}

/// Async client for the narrative and vision prompts.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct InsightClient {
  client: Client,
  config: InsightConfig,
}

impl InsightClient {
  pub fn new(config: InsightConfig) -> Result<Self, InsightError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  /// A client that never calls out and always returns the fallbacks.
  pub fn disabled() -> Self {
    Self { client: Client::new(), config: InsightConfig::default() }
  }

  /// Three-bullet summary of health, safety and financial risks.
  pub async fn daily_insight(
    &self,
    stats: &DashboardStats,
    log: &[AttendanceLogEntry],
    students: &[Student],
  ) -> String {
    let prompt = insight_prompt(stats, log, students);
    match self.generate(vec![Part::Text { text: prompt }]).await {
      Ok(Some(text)) => text,
      Ok(None) => INSIGHT_EMPTY.to_owned(),
      Err(e) => {
        tracing::warn!(error = %e, "daily insight unavailable");
        INSIGHT_UNAVAILABLE.to_owned()
      }
    }
  }

  /// Free-text description of a single JPEG frame. Has no effect on state.
  pub async fn analyze_snapshot(&self, jpeg: &[u8]) -> String {
    let parts = vec![
      Part::Inline {
        inline_data: Blob { mime_type: "image/jpeg", data: B64.encode(jpeg) },
      },
      Part::Text { text: VISION_PROMPT.to_owned() },
    ];
    match self.generate(parts).await {
      Ok(Some(text)) => text,
      Ok(None) => VISION_EMPTY.to_owned(),
      Err(e) => {
        tracing::warn!(error = %e, "snapshot analysis unavailable");
        VISION_UNAVAILABLE.to_owned()
      }
    }
  }

  async fn generate(&self, parts: Vec<Part>) -> Result<Option<String>, InsightError> {
    let key = self
      .config
      .api_key
      .as_deref()
      .filter(|k| !k.is_empty())
      .ok_or(InsightError::NotConfigured)?;

    let url = format!(
      "{}/models/{}:generateContent",
      self.config.base_url.trim_end_matches('/'),
      self.config.model
    );
    let body = GenerateRequest { contents: vec![Content { parts }] };

    let resp = self
      .client
      .post(url)
      .header("x-goog-api-key", key)
      .json(&body)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(InsightError::Status(resp.status()));
    }
    let parsed: GenerateResponse = resp.json().await?;
    Ok(parsed.text())
  }
}

/// Build the narrative prompt. Only the newest [`RECENT_LOG_WINDOW`] entries
/// of `log` are included.
pub fn insight_prompt(
  stats: &DashboardStats,
  log: &[AttendanceLogEntry],
  students: &[Student],
) -> String {
  let recent = &log[..log.len().min(RECENT_LOG_WINDOW)];
  let active = students
    .iter()
    .filter(|s| s.status == StudentStatus::Active)
    .count();
  let pending = students
    .iter()
    .filter(|s| s.fee_status != FeeStatus::Paid)
    .count();

  let stats_json = serde_json::to_string(stats).unwrap_or_default();
  let recent_json = serde_json::to_string(recent).unwrap_or_default();

  format!(
    "You are an AI assistant for a school administrator. Analyze the \
     following academy data for today:\n\n\
     Dashboard Stats: {stats_json}\n\
     Recent Attendance Logs (Last {RECENT_LOG_WINDOW}): {recent_json}\n\
     Student Status Overview: Active ({active}), Pending Fees ({pending})\n\n\
     Provide a concise 3-bullet point summary of health, safety, and \
     financial risks.\n\
     Focus on anomalies like high absenteeism, late arrivals, or revenue \
     gaps.\n\
     Return plain text."
  )
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest {
  contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
  parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
  Text {
    text: String,
  },
  Inline {
    #[serde(rename = "inlineData")]
    inline_data: Blob,
  },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
  mime_type: &'static str,
  data:      String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  #[serde(default)]
  content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
  #[serde(default)]
  text: Option<String>,
}

impl GenerateResponse {
  /// Concatenated text of the first candidate; `None` when blank.
  fn text(&self) -> Option<String> {
    let text: String = self
      .candidates
      .first()
      .and_then(|c| c.content.as_ref())
      .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
      .unwrap_or_default();
    (!text.trim().is_empty()).then_some(text)
  }
}
