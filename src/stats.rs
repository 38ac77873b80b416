//! Aggregation and smoothing of daily series
//!
//! Everything here is a pure function over points ordered by x. Rolling
//! reducers and LOESS both rely on that ordering; callers sort first if the
//! source order is not chronological.
//!
//! Percentiles (and the median) use linear interpolation between closest
//! ranks: for sorted values `v` and fraction `p`, `h = (n - 1) * p` and the
//! result is `v[⌊h⌋] + (h - ⌊h⌋) * (v[⌊h⌋ + 1] - v[⌊h⌋])`. Deviation and
//! variance are population statistics (divide by n).

use crate::models::{DailyRecord, Day, Metric};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// ---------------------------------------------------------------------------
/// Constants
/// ---------------------------------------------------------------------------

const MIN_LOESS_POINTS: usize = 3;
/// Keeps the farthest neighbour's tricube weight above zero
const LOESS_BANDWIDTH_PAD: f64 = 1.0001;
/// Below this the local fit has no x spread; use the weighted mean instead
const DEGENERATE_DET: f64 = 1e-10;

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
pub enum StatsError {
  #[error("Window size must be at least 1, got {0}")]
  InvalidWindow(usize),

  #[error("LOESS span must be in (0, 1], got {0}")]
  InvalidSpan(f64),

  #[error("Unknown aggregation '{0}'")]
  UnknownAggregation(String),
}

/// ---------------------------------------------------------------------------
/// Points
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: Option<f64>,
}

impl Point {
  pub fn new(x: f64, y: Option<f64>) -> Self {
    Self { x, y }
  }
}

/// Project a series onto one metric; x is bedtime start in epoch milliseconds
pub fn project(series: &[DailyRecord], metric: Metric) -> Vec<Point> {
  series
    .iter()
    .map(|record| Point::new(record.date.timestamp_millis() as f64, record.metric(metric)))
    .collect()
}

/// ---------------------------------------------------------------------------
/// Reducers
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
  Mean,
  Sum,
  Median,
  Min,
  Max,
  Deviation,
  Variance,
  P01,
  P05,
  P10,
  P50,
  P95,
  P99,
}

impl Reducer {
  pub const ALL: [Reducer; 13] = [
    Reducer::Mean,
    Reducer::Sum,
    Reducer::Median,
    Reducer::Min,
    Reducer::Max,
    Reducer::Deviation,
    Reducer::Variance,
    Reducer::P01,
    Reducer::P05,
    Reducer::P10,
    Reducer::P50,
    Reducer::P95,
    Reducer::P99,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Reducer::Mean => "mean",
      Reducer::Sum => "sum",
      Reducer::Median => "median",
      Reducer::Min => "min",
      Reducer::Max => "max",
      Reducer::Deviation => "deviation",
      Reducer::Variance => "variance",
      Reducer::P01 => "p01",
      Reducer::P05 => "p05",
      Reducer::P10 => "p10",
      Reducer::P50 => "p50",
      Reducer::P95 => "p95",
      Reducer::P99 => "p99",
    }
  }

  /// Reduce the non-null values of a window; `None` when there are none
  pub fn reduce(&self, values: &[f64]) -> Option<f64> {
    if values.is_empty() {
      return None;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();

    match self {
      Reducer::Mean => Some(sum / n),
      Reducer::Sum => Some(sum),
      Reducer::Min => values.iter().copied().reduce(f64::min),
      Reducer::Max => values.iter().copied().reduce(f64::max),
      Reducer::Variance => Some(population_variance(values, sum / n)),
      Reducer::Deviation => Some(population_variance(values, sum / n).sqrt()),
      Reducer::Median | Reducer::P50 => quantile(values, 0.5),
      Reducer::P01 => quantile(values, 0.01),
      Reducer::P05 => quantile(values, 0.05),
      Reducer::P10 => quantile(values, 0.10),
      Reducer::P95 => quantile(values, 0.95),
      Reducer::P99 => quantile(values, 0.99),
    }
  }
}

impl fmt::Display for Reducer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Reducer {
  type Err = StatsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Reducer::ALL
      .iter()
      .copied()
      .find(|r| r.name() == s)
      .ok_or_else(|| StatsError::UnknownAggregation(s.to_string()))
  }
}

fn population_variance(values: &[f64], mean: f64) -> f64 {
  values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Linearly interpolated quantile, `p` in [0, 1]
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  let mut sorted = values.to_vec();
  sorted.sort_by(f64::total_cmp);

  let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
  let lo = h.floor() as usize;
  let hi = (lo + 1).min(sorted.len() - 1);
  Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Right-anchored rolling reduction.
///
/// The window at index `i` holds points `i + 1 - k ..= i`, clipped at the
/// start of the series. Null values are left out of each reduction.
pub fn rolling(points: &[Point], k: usize, reducer: Reducer) -> Result<Vec<Point>, StatsError> {
  if k == 0 {
    return Err(StatsError::InvalidWindow(k));
  }

  let mut window = Vec::with_capacity(k);
  Ok(
    points
      .iter()
      .enumerate()
      .map(|(i, point)| {
        let start = (i + 1).saturating_sub(k);
        window.clear();
        window.extend(points[start..=i].iter().filter_map(|p| p.y));
        Point::new(point.x, reducer.reduce(&window))
      })
      .collect(),
  )
}

/// ---------------------------------------------------------------------------
/// LOESS
/// ---------------------------------------------------------------------------

/// Locally weighted linear regression with a tricube kernel.
///
/// Null points are dropped first and the result only contains the remaining
/// points. Each point is refit from its `max(round(span * n), 3)` nearest
/// neighbours by x distance. Fewer than three valid points are returned as is.
pub fn loess(points: &[Point], span: f64) -> Result<Vec<Point>, StatsError> {
  if !(span > 0.0 && span <= 1.0) {
    return Err(StatsError::InvalidSpan(span));
  }

  let valid: Vec<(f64, f64)> = points.iter().filter_map(|p| p.y.map(|y| (p.x, y))).collect();
  if valid.len() < MIN_LOESS_POINTS {
    return Ok(valid.into_iter().map(|(x, y)| Point::new(x, Some(y))).collect());
  }

  let n = valid.len();
  let k = ((span * n as f64).round() as usize).clamp(MIN_LOESS_POINTS, n);
  let mut neighbours: Vec<(usize, f64)> = Vec::with_capacity(n);

  Ok(
    valid
      .iter()
      .map(|&(xi, _)| {
        neighbours.clear();
        neighbours.extend(valid.iter().enumerate().map(|(j, &(x, _))| (j, (x - xi).abs())));
        // Stable sort: equidistant neighbours keep input order
        neighbours.sort_by(|a, b| a.1.total_cmp(&b.1));
        neighbours.truncate(k);

        let max_dist = match neighbours.last() {
          Some(&(_, d)) if d > 0.0 => d,
          _ => 1.0,
        };

        let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for &(j, dist) in neighbours.iter() {
          let (xj, yj) = valid[j];
          let u = dist / (max_dist * LOESS_BANDWIDTH_PAD);
          let w = (1.0 - u * u * u).powi(3);
          let dx = xj - xi;
          sw += w;
          swx += w * dx;
          swy += w * yj;
          swxx += w * dx * dx;
          swxy += w * dx * yj;
        }

        let det = sw * swxx - swx * swx;
        let y_hat = if det.abs() < DEGENERATE_DET {
          swy / sw
        } else {
          (swxx * swy - swx * swxy) / det
        };
        Point::new(xi, Some(y_hat))
      })
      .collect(),
  )
}

/// ---------------------------------------------------------------------------
/// Aggregation Choice
/// ---------------------------------------------------------------------------

/// How a trend line is derived from the raw points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
  Window(Reducer),
  Loess,
}

impl Aggregation {
  /// `window` applies to rolling reducers, `span` (fraction) to LOESS
  pub fn apply(&self, points: &[Point], window: usize, span: f64) -> Result<Vec<Point>, StatsError> {
    match self {
      Aggregation::Window(reducer) => rolling(points, window, *reducer),
      Aggregation::Loess => loess(points, span),
    }
  }

  /// Reducer for calendar binning; LOESS bins fall back to the mean
  pub fn bin_reducer(&self) -> Reducer {
    match self {
      Aggregation::Window(reducer) => *reducer,
      Aggregation::Loess => Reducer::Mean,
    }
  }
}

impl fmt::Display for Aggregation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Aggregation::Window(reducer) => f.write_str(reducer.name()),
      Aggregation::Loess => f.write_str("loess"),
    }
  }
}

impl FromStr for Aggregation {
  type Err = StatsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s == "loess" {
      Ok(Aggregation::Loess)
    } else {
      s.parse().map(Aggregation::Window)
    }
  }
}

/// ---------------------------------------------------------------------------
/// Calendar Bins
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
  Day,
  Week,
  Month,
  Year,
}

impl Interval {
  /// First day of the bucket containing `date`. Weeks start on Sunday.
  pub fn floor(&self, date: NaiveDate) -> NaiveDate {
    match self {
      Interval::Day => date,
      Interval::Week => date - Duration::days(date.weekday().num_days_from_sunday() as i64),
      Interval::Month => date.with_day(1).unwrap_or(date),
      Interval::Year => date.with_ordinal(1).unwrap_or(date),
    }
  }
}

impl FromStr for Interval {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "day" => Ok(Interval::Day),
      "week" => Ok(Interval::Week),
      "month" => Ok(Interval::Month),
      "year" => Ok(Interval::Year),
      other => Err(format!("Unknown interval '{}'", other)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
  pub start: NaiveDate,
  pub value: Option<f64>,
  /// Non-null values that went into the bin
  pub count: usize,
}

/// Group records into calendar buckets by bedtime start and reduce each one.
///
/// Every bucket with at least one record is emitted, in chronological order;
/// a bucket of only nulls has a `None` value.
pub fn bin_by_interval(series: &[DailyRecord], metric: Metric, interval: Interval, reducer: Reducer) -> Vec<Bin> {
  let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
  for record in series {
    let start = interval.floor(Day::of(&record.date).date());
    let values = buckets.entry(start).or_default();
    if let Some(v) = record.metric(metric) {
      values.push(v);
    }
  }

  buckets
    .into_iter()
    .map(|(start, values)| Bin {
      start,
      value: reducer.reduce(&values),
      count: values.len(),
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
