use crate::models::{DailyRecord, DayCutoff, Metric, MetricInfo};
use crate::reconcile::{algorithm_changes, AlgorithmChange};
use crate::stats::{bin_by_interval, project, Aggregation, Bin, Interval, Point, StatsError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// ---------------------------------------------------------------------------
/// Trend Request
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TrendRequest {
  pub metric: Metric,
  pub aggregation: Aggregation,
  /// Rolling window length in records
  pub window: usize,
  /// LOESS neighbourhood as a fraction of the series
  pub span: f64,
  pub interval: Option<Interval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
  pub date: Option<DateTime<Utc>>,
  pub value: Option<f64>,
  /// 0-24 hour for bedtime metrics, decoded from the shifted axis
  #[serde(skip_serializing_if = "Option::is_none")]
  pub wall_clock: Option<f64>,
}

/// Chart-ready view of one metric
#[derive(Debug, Clone, Serialize)]
pub struct Trend {
  pub metric: MetricInfo,
  pub aggregation: String,
  pub raw: Vec<TrendPoint>,
  pub smoothed: Vec<TrendPoint>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub bins: Vec<Bin>,
  pub algorithm_changes: Vec<AlgorithmChange>,
}

/// ---------------------------------------------------------------------------
/// Compute
/// ---------------------------------------------------------------------------

/// Project a series onto one metric and smooth it.
///
/// Points are ordered by bedtime start before smoothing since both rolling
/// windows and LOESS assume increasing x.
pub fn compute_trend(series: &[DailyRecord], request: &TrendRequest, cutoff: DayCutoff) -> Result<Trend, StatsError> {
  let mut points = project(series, request.metric);
  points.sort_by(|a, b| a.x.total_cmp(&b.x));

  let smoothed = request.aggregation.apply(&points, request.window, request.span)?;
  debug!(
    metric = %request.metric,
    aggregation = %request.aggregation,
    raw = points.len(),
    smoothed = smoothed.len(),
    "Computed trend"
  );

  let bins = match request.interval {
    Some(interval) => bin_by_interval(series, request.metric, interval, request.aggregation.bin_reducer()),
    None => Vec::new(),
  };

  let to_trend_points = |points: &[Point]| -> Vec<TrendPoint> {
    points
      .iter()
      .map(|p| TrendPoint {
        date: DateTime::from_timestamp_millis(p.x as i64),
        value: p.y,
        wall_clock: if request.metric.is_shifted() {
          p.y.map(|y| cutoff.unshift(y))
        } else {
          None
        },
      })
      .collect()
  };

  Ok(Trend {
    metric: request.metric.info(),
    aggregation: request.aggregation.to_string(),
    raw: to_trend_points(&points),
    smoothed: to_trend_points(&smoothed),
    bins,
    algorithm_changes: algorithm_changes(series),
  })
}
