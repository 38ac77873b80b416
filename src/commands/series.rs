use crate::models::{BodyCompositionLog, DailyRecord, DayCutoff};
use crate::oura::{HeartRateSample, OuraClient, OuraError};
use crate::reconcile::Collections;
use chrono::{NaiveDate, NaiveTime};
use tracing::{info, warn};

/// ---------------------------------------------------------------------------
/// Daily Series Query
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SeriesQuery {
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  /// All-day heart rate is large and slow to page through, so it is opt-in
  pub include_heart_rate: bool,
}

/// Fetch every collection for the range concurrently.
///
/// Required collections fail the whole query. Heart rate is optional: a
/// failure there is logged and treated as no samples.
pub async fn fetch_collections(client: &OuraClient, query: &SeriesQuery) -> Result<Collections, OuraError> {
  let (start, end) = (query.start_date, query.end_date);

  let (sleep, activity, spo2, stress, vo2_max, workouts, heart_rate) = tokio::try_join!(
    client.sleep(start, end),
    client.daily_activity(start, end),
    client.daily_spo2(start, end),
    client.daily_stress(start, end),
    client.vo2_max(start, end),
    client.workouts(start, end),
    optional_heart_rate(client, query),
  )?;

  Ok(Collections {
    sleep,
    activity,
    spo2,
    stress,
    vo2_max,
    workouts,
    heart_rate,
  })
}

async fn optional_heart_rate(client: &OuraClient, query: &SeriesQuery) -> Result<Vec<HeartRateSample>, OuraError> {
  if !query.include_heart_rate {
    return Ok(Vec::new());
  }

  let start = query.start_date.and_time(NaiveTime::MIN).and_utc();
  let end = query.end_date.and_time(NaiveTime::MIN).and_utc();

  match client.heart_rate(start, end).await {
    Ok(samples) => Ok(samples),
    Err(e) => {
      warn!(error = %e, "Heart rate unavailable, continuing without it");
      Ok(Vec::new())
    }
  }
}

/// Fetch and reconcile one record per long sleep in the range
pub async fn fetch_daily_series(
  client: &OuraClient,
  query: &SeriesQuery,
  body_composition: BodyCompositionLog,
  cutoff: DayCutoff,
) -> Result<Vec<DailyRecord>, OuraError> {
  let collections = fetch_collections(client, query).await?;
  info!(
    sleep = collections.sleep.len(),
    activity = collections.activity.len(),
    workouts = collections.workouts.len(),
    heart_rate = collections.heart_rate.len(),
    "Fetched collections"
  );

  let series = collections.reconcile(body_composition, cutoff);
  info!(
    records = series.len(),
    start = %query.start_date,
    end = %query.end_date,
    "Reconciled daily series"
  );
  Ok(series)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;
  use mockito::{Matcher, Mock, ServerGuard};
  use serde_json::{json, Value};

  async fn mock_collection(server: &mut ServerGuard, endpoint: &str, data: Value) -> Mock {
    server
      .mock("GET", format!("/usercollection/{}", endpoint).as_str())
      .match_query(Matcher::Regex("^start_date=2024-01-05&end_date=2024-01-07$".into()))
      .with_status(200)
      .with_body(page_body(data, None))
      .expect(1)
      .create_async()
      .await
  }

  async fn mock_required(server: &mut ServerGuard) -> Vec<Mock> {
    let mut napped = sleep_json("2024-01-06", "2024-01-06T14:00:00+01:00", "2024-01-06T14:40:00+01:00");
    napped["type"] = json!("late_nap");

    vec![
      mock_collection(
        server,
        "sleep",
        json!([
          sleep_json("2024-01-05", "2024-01-04T23:15:00+01:00", "2024-01-05T07:30:00+01:00"),
          napped,
          sleep_json("2024-01-06", "2024-01-06T00:10:00+01:00", "2024-01-06T08:00:00+01:00"),
        ]),
      )
      .await,
      mock_collection(server, "daily_activity", json!([{"day": "2024-01-06", "steps": 9100}])).await,
      mock_collection(server, "daily_spo2", json!([])).await,
      mock_collection(server, "daily_stress", json!([stress_json("2024-01-05")])).await,
      mock_collection(server, "vO2_max", json!([{"day": "2024-01-05", "vo2_max": 44.5}])).await,
      mock_collection(server, "workout", json!([])).await,
    ]
  }

  fn query(include_heart_rate: bool) -> SeriesQuery {
    SeriesQuery {
      start_date: date(2024, 1, 5),
      end_date: date(2024, 1, 7),
      include_heart_rate,
    }
  }

  #[tokio::test]
  async fn test_series_joins_every_collection() {
    let mut server = mockito::Server::new_async().await;
    let mocks = mock_required(&mut server).await;
    let heart_rate = server
      .mock("GET", "/usercollection/heartrate")
      .match_query(Matcher::Any)
      .expect(0)
      .create_async()
      .await;

    let client = test_client(&server.url());
    let series = fetch_daily_series(&client, &query(false), BodyCompositionLog::new(), DayCutoff::DEFAULT)
      .await
      .unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].sleep.day, "2024-01-05");
    assert_eq!(series[0].steps, None);
    assert_eq!(series[0].stress_high, Some(3600));
    assert_eq!(series[0].vo2_max, Some(44.5));
    assert_eq!(series[1].steps, Some(9100));
    assert_eq!(series[1].vo2_max, None);
    assert_eq!(series[1].hr_daily_average, None);

    for mock in mocks {
      mock.assert_async().await;
    }
    heart_rate.assert_async().await;
  }

  #[tokio::test]
  async fn test_heart_rate_failure_is_not_fatal() {
    let mut server = mockito::Server::new_async().await;
    let _required = mock_required(&mut server).await;
    let heart_rate = server
      .mock("GET", "/usercollection/heartrate")
      .match_query(Matcher::Any)
      .with_status(500)
      .expect(1)
      .create_async()
      .await;

    let client = test_client(&server.url());
    let series = fetch_daily_series(&client, &query(true), BodyCompositionLog::new(), DayCutoff::DEFAULT)
      .await
      .unwrap();

    assert_eq!(series.len(), 2);
    assert!(series.iter().all(|r| r.hr_daily_average.is_none()));
    heart_rate.assert_async().await;
  }

  #[tokio::test]
  async fn test_heart_rate_is_averaged_per_day() {
    let mut server = mockito::Server::new_async().await;
    let _required = mock_required(&mut server).await;
    let _heart_rate = server
      .mock("GET", "/usercollection/heartrate")
      .match_query(Matcher::Regex(
        "^start_datetime=2024-01-05T00%3A00%3A00Z&end_datetime=2024-01-07T00%3A00%3A00Z$".into(),
      ))
      .with_status(200)
      .with_body(page_body(
        json!([
          {"bpm": 58, "timestamp": "2024-01-06T09:00:00+00:00"},
          {"bpm": 64, "timestamp": "2024-01-06T12:00:00+00:00"}
        ]),
        None,
      ))
      .create_async()
      .await;

    let client = test_client(&server.url());
    let series = fetch_daily_series(&client, &query(true), BodyCompositionLog::new(), DayCutoff::DEFAULT)
      .await
      .unwrap();

    assert_eq!(series[0].hr_daily_average, None);
    assert_eq!(series[1].hr_daily_average, Some(61));
  }

  #[tokio::test]
  async fn test_required_collection_failure_fails_query() {
    let mut server = mockito::Server::new_async().await;
    let mut mocks = vec![mock_collection(&mut server, "sleep", json!([])).await];
    let _activity = server
      .mock("GET", "/usercollection/daily_activity")
      .match_query(Matcher::Any)
      .with_status(401)
      .create_async()
      .await;
    for endpoint in ["daily_spo2", "daily_stress", "vO2_max", "workout"] {
      mocks.push(mock_collection(&mut server, endpoint, json!([])).await);
    }

    let client = test_client(&server.url());
    let err = fetch_daily_series(&client, &query(false), BodyCompositionLog::new(), DayCutoff::DEFAULT)
      .await
      .unwrap_err();

    assert!(err.is_unauthorized());
  }
}
