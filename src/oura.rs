//! Oura Ring API v2 client
//!
//! Read-only access to the `usercollection` endpoints. Every collection is
//! cursor-paginated; heart rate additionally rejects ranges longer than 30
//! days, so it is fetched in sequential windows. Tokens are obtained
//! elsewhere; this module only attaches them.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, SecondsFormat, Utc};
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::num::NonZeroUsize;
use tracing::debug;
use url::form_urlencoded;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const OURA_API_BASE: &str = "https://api.ouraring.com/v2";
const CURSOR_PARAM: &str = "next_token";

/// Longest range the heart rate endpoint accepts in one request
pub const HEART_RATE_MAX_SPAN_DAYS: i64 = 30;

/// ---------------------------------------------------------------------------
/// Client Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OuraConfig {
  pub access_token: String,
  pub api_base: String,
  /// Hard ceiling on pages per collection. `None` follows cursors until the
  /// server stops returning one.
  pub max_pages: Option<usize>,
}

impl OuraConfig {
  pub fn from_env() -> Result<Self, OuraError> {
    let max_pages = match env::var("OURA_MAX_PAGES") {
      Ok(raw) => Some(
        raw
          .trim()
          .parse::<NonZeroUsize>()
          .map_err(|_| OuraError::MissingConfig(format!("OURA_MAX_PAGES must be a positive page count, got '{}'", raw)))?
          .get(),
      ),
      Err(_) => None,
    };

    Ok(Self {
      access_token: env::var("OURA_ACCESS_TOKEN")
        .map_err(|_| OuraError::MissingConfig("OURA_ACCESS_TOKEN".into()))?,
      api_base: env::var("OURA_API_BASE").unwrap_or_else(|_| OURA_API_BASE.to_string()),
      max_pages,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum OuraError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(String),

  #[error("Error {status}: {status_text}")]
  Http { status: u16, status_text: String },

  #[error("Pagination of {endpoint} exceeded {limit} pages")]
  PageLimit { endpoint: String, limit: usize },
}

impl OuraError {
  fn from_status(status: reqwest::StatusCode) -> Self {
    OuraError::Http {
      status: status.as_u16(),
      status_text: status.canonical_reason().unwrap_or_default().to_string(),
    }
  }

  /// The credential was rejected; the auth layer should clear it and re-prompt
  pub fn is_unauthorized(&self) -> bool {
    matches!(self, OuraError::Http { status: 401, .. })
  }
}

// Convert reqwest::Error to OuraError
impl From<reqwest::Error> for OuraError {
  fn from(e: reqwest::Error) -> Self {
    OuraError::Request(e.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Oura API Data Structures
/// ---------------------------------------------------------------------------

/// One page of any collection endpoint
#[derive(Debug, Deserialize)]
pub struct Page<T> {
  pub data: Vec<T>,
  #[serde(default)]
  pub next_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepType {
  LongSleep,
  Sleep,
  LateNap,
  Rest,
  Deleted,
  #[default]
  #[serde(other)]
  Unknown,
}

/// Sleep period from `usercollection/sleep`, the primary collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepPeriod {
  pub id: Option<String>,
  #[serde(default)]
  pub day: String, // ISO date (YYYY-MM-DD)
  #[serde(rename = "type", default)]
  pub sleep_type: SleepType,
  pub bedtime_start: DateTime<FixedOffset>,
  pub bedtime_end: DateTime<FixedOffset>,
  pub average_breath: Option<f64>,      // breaths/min
  pub average_heart_rate: Option<f64>,  // bpm
  pub average_hrv: Option<i64>,         // ms
  pub awake_time: Option<i64>,          // seconds
  pub deep_sleep_duration: Option<i64>, // seconds
  pub efficiency: Option<i64>,          // percentage (0-100)
  pub latency: Option<i64>,             // seconds
  pub light_sleep_duration: Option<i64>,
  pub lowest_heart_rate: Option<i64>,
  pub rem_sleep_duration: Option<i64>,
  pub restless_periods: Option<i64>,
  pub time_in_bed: Option<i64>,
  pub total_sleep_duration: Option<i64>,
  pub readiness: Option<SleepReadiness>,
  pub sleep_algorithm_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepReadiness {
  pub score: Option<i64>,
  pub temperature_deviation: Option<f64>,       // °C
  pub temperature_trend_deviation: Option<f64>, // °C
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyActivity {
  #[serde(default)]
  pub day: String,
  pub score: Option<i64>,
  pub steps: Option<i64>,
  pub active_calories: Option<i64>,
  pub total_calories: Option<i64>,
  pub equivalent_walking_distance: Option<i64>, // meters
  pub high_activity_time: Option<i64>,          // seconds
  pub medium_activity_time: Option<i64>,
  pub low_activity_time: Option<i64>,
  pub sedentary_time: Option<i64>,
  pub resting_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySpo2 {
  #[serde(default)]
  pub day: String,
  pub spo2_percentage: Option<Spo2Percentage>,
  pub breathing_disturbance_index: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spo2Percentage {
  pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStress {
  #[serde(default)]
  pub day: String,
  pub stress_high: Option<i64>,   // seconds
  pub recovery_high: Option<i64>, // seconds
  pub day_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vo2Max {
  #[serde(default)]
  pub day: String,
  pub vo2_max: Option<f64>, // mL/kg/min
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
  #[serde(default)]
  pub day: String,
  pub activity: Option<String>,
  pub calories: Option<f64>,
  pub distance: Option<f64>,
  pub intensity: Option<String>,
  pub start_datetime: Option<DateTime<FixedOffset>>,
  pub end_datetime: Option<DateTime<FixedOffset>>,
}

impl Workout {
  /// Elapsed seconds, if both bounds are known
  pub fn duration_seconds(&self) -> Option<f64> {
    match (self.start_datetime, self.end_datetime) {
      (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
      _ => None,
    }
  }
}

/// Heart rate sample from the sub-day `heartrate` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartRateSample {
  pub bpm: i64,
  pub source: Option<String>,
  #[serde(default)]
  pub timestamp: String, // ISO timestamp
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalInfo {
  pub id: Option<String>,
  pub age: Option<i64>,
  pub weight: Option<f64>,
  pub height: Option<f64>,
  pub biological_sex: Option<String>,
  pub email: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Oura API Client
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OuraClient {
  client: Client,
  api_base: String,
  access_token: String,
  max_pages: Option<usize>,
}

impl OuraClient {
  pub fn new(config: &OuraConfig) -> Self {
    Self {
      client: Client::new(),
      api_base: config.api_base.trim_end_matches('/').to_string(),
      access_token: config.access_token.clone(),
      max_pages: config.max_pages,
    }
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, OuraError> {
    let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));

    let response = self
      .client
      .get(&url)
      .bearer_auth(&self.access_token)
      .header(CACHE_CONTROL, "no-cache")
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      debug!(%status, path, "Oura API request rejected");
      return Err(OuraError::from_status(status));
    }

    Ok(response.json().await?)
  }

  /// Fetch every page of a collection by following `next_token` cursors.
  ///
  /// Requests are sequential since each one depends on the previous cursor.
  /// Any failed page aborts the whole fetch and drops what was accumulated.
  pub async fn fetch_all<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    query: &[(&str, String)],
  ) -> Result<Vec<T>, OuraError> {
    let base_path = with_query(endpoint, query);
    let mut path = base_path.clone();
    let mut items = Vec::new();
    let mut pages = 0usize;

    loop {
      if let Some(limit) = self.max_pages {
        if pages >= limit {
          return Err(OuraError::PageLimit {
            endpoint: endpoint.to_string(),
            limit,
          });
        }
      }

      let page: Page<T> = self.get(&path).await?;
      pages += 1;
      debug!(endpoint, page = pages, items = page.data.len(), "Fetched page");
      items.extend(page.data);

      match page.next_token {
        Some(token) if !token.is_empty() => path = with_cursor(&base_path, &token),
        _ => return Ok(items),
      }
    }
  }

  /// Fetch `[start, end)` in consecutive windows no longer than `max_span`.
  pub async fn fetch_chunked<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_span: Duration,
  ) -> Result<Vec<T>, OuraError> {
    let mut items = Vec::new();

    for (chunk_start, chunk_end) in chunk_ranges(start, end, max_span) {
      let query = [
        ("start_datetime", chunk_start.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ("end_datetime", chunk_end.to_rfc3339_opts(SecondsFormat::Secs, true)),
      ];
      let chunk: Vec<T> = self.fetch_all(endpoint, &query).await?;
      debug!(endpoint, %chunk_start, %chunk_end, items = chunk.len(), "Fetched window");
      items.extend(chunk);
    }

    Ok(items)
  }

  /// ---------------------------------------------------------------------------
  /// Collections
  /// ---------------------------------------------------------------------------

  pub async fn personal_info(&self) -> Result<PersonalInfo, OuraError> {
    self.get("usercollection/personal_info").await
  }

  pub async fn sleep(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<SleepPeriod>, OuraError> {
    self.fetch_all("usercollection/sleep", &date_query(start, end)).await
  }

  pub async fn daily_activity(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<DailyActivity>, OuraError> {
    self.fetch_all("usercollection/daily_activity", &date_query(start, end)).await
  }

  pub async fn daily_spo2(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailySpo2>, OuraError> {
    self.fetch_all("usercollection/daily_spo2", &date_query(start, end)).await
  }

  pub async fn daily_stress(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<DailyStress>, OuraError> {
    self.fetch_all("usercollection/daily_stress", &date_query(start, end)).await
  }

  pub async fn vo2_max(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Vo2Max>, OuraError> {
    self.fetch_all("usercollection/vO2_max", &date_query(start, end)).await
  }

  pub async fn workouts(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Workout>, OuraError> {
    self.fetch_all("usercollection/workout", &date_query(start, end)).await
  }

  pub async fn heart_rate(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<HeartRateSample>, OuraError> {
    self
      .fetch_chunked(
        "usercollection/heartrate",
        start,
        end,
        Duration::days(HEART_RATE_MAX_SPAN_DAYS),
      )
      .await
  }
}

/// ---------------------------------------------------------------------------
/// Query Helpers
/// ---------------------------------------------------------------------------

fn date_query(start: NaiveDate, end: NaiveDate) -> [(&'static str, String); 2] {
  [
    ("start_date", start.format("%Y-%m-%d").to_string()),
    ("end_date", end.format("%Y-%m-%d").to_string()),
  ]
}

fn with_query(endpoint: &str, query: &[(&str, String)]) -> String {
  if query.is_empty() {
    return endpoint.to_string();
  }
  let encoded = form_urlencoded::Serializer::new(String::new())
    .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())))
    .finish();
  let separator = if endpoint.contains('?') { '&' } else { '?' };
  format!("{}{}{}", endpoint, separator, encoded)
}

/// Base path plus the cursor, keeping every query parameter
fn with_cursor(path: &str, token: &str) -> String {
  let separator = if path.contains('?') { '&' } else { '?' };
  let token: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
  format!("{}{}{}={}", path, separator, CURSOR_PARAM, token)
}

/// Split `[start, end)` into half-open windows of at most `max_span`.
///
/// Empty when `start >= end` or the span is not positive.
pub fn chunk_ranges(
  start: DateTime<Utc>,
  end: DateTime<Utc>,
  max_span: Duration,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
  let mut ranges = Vec::new();
  if max_span <= Duration::zero() {
    return ranges;
  }

  let mut chunk_start = start;
  while chunk_start < end {
    let chunk_end = (chunk_start + max_span).min(end);
    ranges.push((chunk_start, chunk_end));
    chunk_start = chunk_end;
  }
  ranges
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
