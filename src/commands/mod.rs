pub mod series;
pub mod trend;

use crate::models::{BodyCompositionLog, DailyRecord, DayCutoff, Metric};
use crate::oura::{OuraClient, OuraError, PersonalInfo};
use crate::stats::{Aggregation, Interval, StatsError};
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use series::{fetch_collections, fetch_daily_series, SeriesQuery};
pub use trend::{compute_trend, Trend, TrendPoint, TrendRequest};

/// ---------------------------------------------------------------------------
/// Command Line
/// ---------------------------------------------------------------------------

#[derive(Parser, Debug, Clone)]
#[command(
  name = "oura-trends",
  about = "Fetch Oura sleep, activity and health data as one record per night",
  long_about = "Joins every Oura collection onto the nightly long sleep and prints the series as JSON.\n\
                With --metric, prints a smoothed trend of that metric instead."
)]
pub struct Cli {
  /// First day of the range (YYYY-MM-DD)
  #[arg(long)]
  pub from: NaiveDate,

  /// Last day of the range (YYYY-MM-DD)
  #[arg(long)]
  pub to: NaiveDate,

  /// Also fetch all-day heart rate
  #[arg(long)]
  pub heart_rate: bool,

  /// JSON map of day to body composition values
  #[arg(long, value_name = "FILE")]
  pub body_composition: Option<PathBuf>,

  /// Include the user's profile in the output
  #[arg(long)]
  pub profile: bool,

  /// Metric to trend, e.g. average_hrv or bedtime_start_hour
  #[arg(long)]
  pub metric: Option<Metric>,

  /// Reducer for the rolling window (mean, median, p95, ...) or loess
  #[arg(long, default_value = "mean")]
  pub agg: Aggregation,

  /// Rolling window length in nights
  #[arg(long, default_value_t = 7)]
  pub window: usize,

  /// LOESS span in percent of the series
  #[arg(long, default_value_t = 30.0)]
  pub span: f64,

  /// Also group the metric by day, week, month or year
  #[arg(long)]
  pub interval: Option<Interval>,

  /// Hour after which a bedtime belongs to the following night
  #[arg(long, default_value_t = DayCutoff::DEFAULT.hour(), value_parser = clap::value_parser!(u32).range(0..24))]
  pub cutoff: u32,

  /// Enable debug logging
  #[arg(long, short = 'v')]
  pub verbose: bool,
}

impl Cli {
  fn series_query(&self) -> SeriesQuery {
    SeriesQuery {
      start_date: self.from,
      end_date: self.to,
      include_heart_rate: self.heart_rate,
    }
  }

  fn trend_request(&self) -> Option<TrendRequest> {
    self.metric.map(|metric| TrendRequest {
      metric,
      aggregation: self.agg,
      window: self.window,
      span: self.span / 100.0,
      interval: self.interval,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
  #[error(transparent)]
  Oura(#[from] OuraError),

  #[error(transparent)]
  Stats(#[from] StatsError),

  #[error("Invalid range: {from} is after {to}")]
  InvalidRange { from: NaiveDate, to: NaiveDate },

  #[error("Failed to read {}: {}", .path.display(), .source)]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Invalid JSON: {0}")]
  Json(#[from] serde_json::Error),
}

/// ---------------------------------------------------------------------------
/// Execute
/// ---------------------------------------------------------------------------

/// What gets printed: the series, or the trend when a metric was asked for
#[derive(Debug, Serialize)]
pub struct Report {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub profile: Option<PersonalInfo>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub series: Option<Vec<DailyRecord>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub trend: Option<Trend>,
}

pub async fn execute(cli: &Cli, client: &OuraClient) -> Result<Report, CommandError> {
  if cli.from > cli.to {
    return Err(CommandError::InvalidRange { from: cli.from, to: cli.to });
  }

  let body_composition = match &cli.body_composition {
    Some(path) => load_body_composition(path)?,
    None => BodyCompositionLog::new(),
  };

  let cutoff = DayCutoff::new(cli.cutoff);
  let query = cli.series_query();
  let profile = async {
    if cli.profile {
      client.personal_info().await.map(Some)
    } else {
      Ok(None)
    }
  };

  let (profile, series) = tokio::try_join!(
    profile,
    fetch_daily_series(client, &query, body_composition, cutoff),
  )?;

  Ok(match cli.trend_request() {
    Some(request) => Report {
      profile,
      series: None,
      trend: Some(compute_trend(&series, &request, cutoff)?),
    },
    None => Report {
      profile,
      series: Some(series),
      trend: None,
    },
  })
}

/// Read an exported body composition log
pub fn load_body_composition(path: &Path) -> Result<BodyCompositionLog, CommandError> {
  let raw = std::fs::read_to_string(path).map_err(|source| CommandError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(serde_json::from_str(&raw)?)
}
