//! Test utilities shared by the unit tests
//!
//! Factories for API payloads and reconciled records, a client pointed at a
//! mock server, and float assertions.

use crate::models::{DailyRecord, DayCutoff};
use crate::oura::{DailyActivity, DailyStress, HeartRateSample, OuraClient, OuraConfig, SleepPeriod, Workout};
use crate::reconcile::{reconcile, Secondaries};
use crate::stats::Point;
use chrono::{DateTime, NaiveDate};
use serde_json::{json, Value};

/// ---------------------------------------------------------------------------
/// Client Helpers
/// ---------------------------------------------------------------------------

/// Client that talks to a mockito server with a fixed token
pub fn test_client(base_url: &str) -> OuraClient {
  OuraClient::new(&OuraConfig {
    access_token: "test-token".into(),
    api_base: base_url.into(),
    max_pages: None,
  })
}

/// Serialized collection page
pub fn page_body(data: Value, next_token: Option<&str>) -> String {
  json!({ "data": data, "next_token": next_token }).to_string()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

/// ---------------------------------------------------------------------------
/// Payload Factories
/// ---------------------------------------------------------------------------

/// Long sleep payload as the API sends it
pub fn sleep_json(day: &str, bedtime_start: &str, bedtime_end: &str) -> Value {
  json!({
    "id": format!("sleep-{}", day),
    "day": day,
    "type": "long_sleep",
    "bedtime_start": bedtime_start,
    "bedtime_end": bedtime_end,
    "average_breath": 14.5,
    "average_heart_rate": 52.3,
    "average_hrv": 48,
    "awake_time": 1800,
    "deep_sleep_duration": 5400,
    "efficiency": 88,
    "latency": 600,
    "light_sleep_duration": 12600,
    "lowest_heart_rate": 45,
    "rem_sleep_duration": 6300,
    "restless_periods": 210,
    "time_in_bed": 28800,
    "total_sleep_duration": 24300,
    "readiness": null,
    "sleep_algorithm_version": "v2"
  })
}

pub fn stress_json(day: &str) -> Value {
  json!({ "day": day, "stress_high": 3600, "recovery_high": 1800, "day_summary": "normal" })
}

pub fn sleep_period(day: &str, bedtime_start: &str, bedtime_end: &str) -> SleepPeriod {
  serde_json::from_value(sleep_json(day, bedtime_start, bedtime_end)).expect("valid sleep payload")
}

pub fn activity(day: &str, steps: i64) -> DailyActivity {
  DailyActivity {
    day: day.into(),
    score: Some(80),
    steps: Some(steps),
    active_calories: Some(450),
    total_calories: Some(2400),
    equivalent_walking_distance: Some(steps * 3 / 4),
    high_activity_time: Some(600),
    medium_activity_time: Some(1800),
    low_activity_time: Some(7200),
    sedentary_time: Some(28800),
    resting_time: Some(25200),
  }
}

pub fn stress(day: &str, stress_high: i64, recovery_high: i64) -> DailyStress {
  DailyStress {
    day: day.into(),
    stress_high: Some(stress_high),
    recovery_high: Some(recovery_high),
    day_summary: None,
  }
}

pub fn workout(day: &str, start: Option<&str>, end: Option<&str>) -> Workout {
  let parse = |s: &str| DateTime::parse_from_rfc3339(s).expect("valid test timestamp");
  Workout {
    day: day.into(),
    activity: Some("running".into()),
    calories: Some(300.0),
    distance: None,
    intensity: Some("moderate".into()),
    start_datetime: start.map(parse),
    end_datetime: end.map(parse),
  }
}

pub fn heart_rate(timestamp: &str, bpm: i64) -> HeartRateSample {
  HeartRateSample {
    bpm,
    source: Some("awake".into()),
    timestamp: timestamp.into(),
  }
}

/// ---------------------------------------------------------------------------
/// Series Factories
/// ---------------------------------------------------------------------------

/// Reconciled record with no secondaries and the given HRV
pub fn daily_record(day: &str, bedtime_start: &str, average_hrv: Option<i64>) -> DailyRecord {
  let start = DateTime::parse_from_rfc3339(bedtime_start).expect("valid test timestamp");
  let end = (start + chrono::Duration::hours(8)).to_rfc3339();
  let mut sleep = sleep_period(day, bedtime_start, &end);
  sleep.average_hrv = average_hrv;

  reconcile(vec![sleep], &Secondaries::default(), DayCutoff::DEFAULT)
    .pop()
    .expect("long sleep yields a record")
}

/// Points one unit apart on x
pub fn points(values: &[Option<f64>]) -> Vec<Point> {
  values
    .iter()
    .enumerate()
    .map(|(i, y)| Point::new(i as f64, *y))
    .collect()
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_daily_record_factory() {
    let record = daily_record("2024-01-05", "2024-01-04T23:30:00+00:00", Some(55));
    assert_eq!(record.sleep.average_hrv, Some(55));
    assert_eq!(record.bedtime_start_hour, -0.5);
    assert_eq!(record.bedtime_end_hour, 7.5);
  }

  #[test]
  fn test_points_factory() {
    let pts = points(&[Some(1.0), None]);
    assert_eq!(pts[1], Point::new(1.0, None));
  }

  #[test]
  fn test_page_body_shape() {
    let body: Value = serde_json::from_str(&page_body(json!([]), None)).unwrap();
    assert_eq!(body["next_token"], Value::Null);
  }
}
