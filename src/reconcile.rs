//! Join of every collection onto the nightly sleep record
//!
//! The sleep collection is primary: one record per long sleep, in the order
//! the API returned them. Everything else is looked up by the sleep's day and
//! contributes `None` when that day has no entry.

use crate::index::{index_by_day, Cardinality, HeartRateByDay, IndexedCollection};
use crate::models::{BodyCompositionLog, DailyRecord, Day, DayCutoff};
use crate::oura::{
  DailyActivity, DailySpo2, DailyStress, HeartRateSample, SleepPeriod, SleepType, Vo2Max, Workout,
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Raw results of every collection fetch for one query
#[derive(Debug, Clone, Default)]
pub struct Collections {
  pub sleep: Vec<SleepPeriod>,
  pub activity: Vec<DailyActivity>,
  pub spo2: Vec<DailySpo2>,
  pub stress: Vec<DailyStress>,
  pub vo2_max: Vec<Vo2Max>,
  pub workouts: Vec<Workout>,
  pub heart_rate: Vec<HeartRateSample>,
}

impl Collections {
  /// Index the secondaries and join them onto the sleep periods
  pub fn reconcile(self, body_composition: BodyCompositionLog, cutoff: DayCutoff) -> Vec<DailyRecord> {
    let secondaries = Secondaries {
      activity: index_by_day(self.activity, Cardinality::One),
      spo2: index_by_day(self.spo2, Cardinality::One),
      stress: index_by_day(self.stress, Cardinality::One),
      vo2_max: index_by_day(self.vo2_max, Cardinality::One),
      workouts: index_by_day(self.workouts, Cardinality::Many),
      heart_rate: HeartRateByDay::from_samples(&self.heart_rate),
      body_composition,
    };
    reconcile(self.sleep, &secondaries, cutoff)
  }
}

/// Every non-primary source, keyed by day
#[derive(Debug, Clone)]
pub struct Secondaries {
  pub activity: IndexedCollection<DailyActivity>,
  pub spo2: IndexedCollection<DailySpo2>,
  pub stress: IndexedCollection<DailyStress>,
  pub vo2_max: IndexedCollection<Vo2Max>,
  pub workouts: IndexedCollection<Workout>,
  pub heart_rate: HeartRateByDay,
  pub body_composition: BodyCompositionLog,
}

impl Default for Secondaries {
  fn default() -> Self {
    Self {
      activity: IndexedCollection::empty(Cardinality::One),
      spo2: IndexedCollection::empty(Cardinality::One),
      stress: IndexedCollection::empty(Cardinality::One),
      vo2_max: IndexedCollection::empty(Cardinality::One),
      workouts: IndexedCollection::empty(Cardinality::Many),
      heart_rate: HeartRateByDay::default(),
      body_composition: BodyCompositionLog::new(),
    }
  }
}

/// Build one daily record per long sleep.
///
/// Naps and other short periods are dropped: the shifted-hour axis assumes a
/// single overnight span. Output order is the primary order; nothing is
/// re-sorted.
pub fn reconcile(primary: Vec<SleepPeriod>, secondaries: &Secondaries, cutoff: DayCutoff) -> Vec<DailyRecord> {
  primary
    .into_iter()
    .filter(|sleep| sleep.sleep_type == SleepType::LongSleep)
    .map(|sleep| merge(sleep, secondaries, cutoff))
    .collect()
}

fn merge(sleep: SleepPeriod, secondaries: &Secondaries, cutoff: DayCutoff) -> DailyRecord {
  let day = Day::parse(&sleep.day);

  let activity = day.and_then(|d| secondaries.activity.first(&d));
  let spo2 = day.and_then(|d| secondaries.spo2.first(&d));
  let stress = day.and_then(|d| secondaries.stress.first(&d));
  let vo2 = day.and_then(|d| secondaries.vo2_max.first(&d));
  let workouts: &[Workout] = day.map(|d| secondaries.workouts.all(&d)).unwrap_or(&[]);
  let body = day
    .and_then(|d| secondaries.body_composition.get(&d))
    .cloned()
    .unwrap_or_default();

  let workout_duration: f64 = workouts.iter().filter_map(Workout::duration_seconds).sum();
  let readiness = sleep.readiness.as_ref();

  DailyRecord {
    day,
    date: sleep.bedtime_start,
    bedtime_start_date: sleep.bedtime_start,
    bedtime_end_date: sleep.bedtime_end,
    bedtime_start_hour: cutoff.shifted_hours(&sleep.bedtime_start),
    bedtime_end_hour: cutoff.shifted_hours(&sleep.bedtime_end),
    readiness_score: readiness.and_then(|r| r.score),
    temperature_deviation: readiness.and_then(|r| r.temperature_deviation),
    temperature_trend_deviation: readiness.and_then(|r| r.temperature_trend_deviation),

    steps: activity.and_then(|a| a.steps),
    active_calories: activity.and_then(|a| a.active_calories),
    total_calories: activity.and_then(|a| a.total_calories),
    activity_score: activity.and_then(|a| a.score),
    equivalent_walking_distance: activity.and_then(|a| a.equivalent_walking_distance),
    high_activity_time: activity.and_then(|a| a.high_activity_time),
    medium_activity_time: activity.and_then(|a| a.medium_activity_time),
    low_activity_time: activity.and_then(|a| a.low_activity_time),
    sedentary_time: activity.and_then(|a| a.sedentary_time),
    resting_time: activity.and_then(|a| a.resting_time),

    spo2_average: spo2
      .and_then(|s| s.spo2_percentage.as_ref())
      .and_then(|p| p.average),
    breathing_disturbance_index: spo2.and_then(|s| s.breathing_disturbance_index),

    stress_high: stress.and_then(|s| s.stress_high),
    recovery_high: stress.and_then(|s| s.recovery_high),

    vo2_max: vo2.and_then(|v| v.vo2_max),

    hr_daily_average: day.and_then(|d| secondaries.heart_rate.mean(&d)),

    workout_count: (!workouts.is_empty()).then_some(workouts.len()),
    workout_duration: (workout_duration != 0.0).then_some(workout_duration),

    body,
    sleep,
  }
}

/// ---------------------------------------------------------------------------
/// Sleep Algorithm Changes
/// ---------------------------------------------------------------------------

/// Point where the ring's sleep staging algorithm changed version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmChange {
  pub date: DateTime<FixedOffset>,
  pub version: String,
}

/// Version transitions between consecutive records that both report one
pub fn algorithm_changes(series: &[DailyRecord]) -> Vec<AlgorithmChange> {
  series
    .windows(2)
    .filter_map(|pair| {
      let prev = pair[0].sleep.sleep_algorithm_version.as_deref()?;
      let curr = pair[1].sleep.sleep_algorithm_version.as_deref()?;
      (prev != curr).then(|| AlgorithmChange {
        date: pair[1].date,
        version: curr.to_string(),
      })
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
