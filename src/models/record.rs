use super::{Day, Metric};
use crate::oura::SleepPeriod;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body composition for one day, supplied by an external scale export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyComposition {
  pub weight: Option<f64>,      // kg
  pub fat_mass: Option<f64>,    // kg
  pub bone_mass: Option<f64>,   // kg
  pub muscle_mass: Option<f64>, // kg
  pub hydration: Option<f64>,   // kg
}

/// Already-parsed body composition log keyed by day
pub type BodyCompositionLog = HashMap<Day, BodyComposition>;

/// One reconciled night: the long sleep plus whatever the other collections
/// recorded for the same day.
///
/// Every field is serialized; a missing secondary value is `null`, never an
/// absent key.
#[derive(Debug, Clone, Serialize)]
pub struct DailyRecord {
  #[serde(skip)]
  pub day: Option<Day>,
  pub date: DateTime<FixedOffset>,
  pub bedtime_start_date: DateTime<FixedOffset>,
  pub bedtime_end_date: DateTime<FixedOffset>,
  pub bedtime_start_hour: f64,
  pub bedtime_end_hour: f64,
  pub readiness_score: Option<i64>,
  pub temperature_deviation: Option<f64>,
  pub temperature_trend_deviation: Option<f64>,

  // Activity
  pub steps: Option<i64>,
  pub active_calories: Option<i64>,
  pub total_calories: Option<i64>,
  pub activity_score: Option<i64>,
  pub equivalent_walking_distance: Option<i64>,
  pub high_activity_time: Option<i64>,
  pub medium_activity_time: Option<i64>,
  pub low_activity_time: Option<i64>,
  pub sedentary_time: Option<i64>,
  pub resting_time: Option<i64>,

  // SpO2
  pub spo2_average: Option<f64>,
  pub breathing_disturbance_index: Option<f64>,

  // Stress
  pub stress_high: Option<i64>,
  pub recovery_high: Option<i64>,

  pub vo2_max: Option<f64>,

  // Heart rate (all-day)
  pub hr_daily_average: Option<i64>,

  // Workouts
  pub workout_count: Option<usize>,
  pub workout_duration: Option<f64>, // seconds

  #[serde(flatten)]
  pub body: BodyComposition,

  #[serde(flatten)]
  pub sleep: SleepPeriod,
}

impl DailyRecord {
  /// Project one metric as a number
  pub fn metric(&self, metric: Metric) -> Option<f64> {
    let int = |v: Option<i64>| v.map(|v| v as f64);
    let sleep = &self.sleep;

    match metric {
      Metric::AverageBreath => sleep.average_breath,
      Metric::AverageHeartRate => sleep.average_heart_rate,
      Metric::HrDailyAverage => int(self.hr_daily_average),
      Metric::AverageHrv => int(sleep.average_hrv),
      Metric::AwakeTime => int(sleep.awake_time),
      Metric::BedtimeEndHour => Some(self.bedtime_end_hour),
      Metric::BedtimeStartHour => Some(self.bedtime_start_hour),
      Metric::DeepSleepDuration => int(sleep.deep_sleep_duration),
      Metric::Efficiency => int(sleep.efficiency),
      Metric::Latency => int(sleep.latency),
      Metric::LightSleepDuration => int(sleep.light_sleep_duration),
      Metric::LowestHeartRate => int(sleep.lowest_heart_rate),
      Metric::ReadinessScore => int(self.readiness_score),
      Metric::TemperatureDeviation => self.temperature_deviation,
      Metric::TemperatureTrendDeviation => self.temperature_trend_deviation,
      Metric::RemSleepDuration => int(sleep.rem_sleep_duration),
      Metric::RestlessPeriods => int(sleep.restless_periods),
      Metric::TimeInBed => int(sleep.time_in_bed),
      Metric::TotalSleepDuration => int(sleep.total_sleep_duration),
      Metric::Steps => int(self.steps),
      Metric::ActiveCalories => int(self.active_calories),
      Metric::TotalCalories => int(self.total_calories),
      Metric::ActivityScore => int(self.activity_score),
      Metric::EquivalentWalkingDistance => int(self.equivalent_walking_distance),
      Metric::HighActivityTime => int(self.high_activity_time),
      Metric::MediumActivityTime => int(self.medium_activity_time),
      Metric::LowActivityTime => int(self.low_activity_time),
      Metric::SedentaryTime => int(self.sedentary_time),
      Metric::RestingTime => int(self.resting_time),
      Metric::Spo2Average => self.spo2_average,
      Metric::BreathingDisturbanceIndex => self.breathing_disturbance_index,
      Metric::StressHigh => int(self.stress_high),
      Metric::RecoveryHigh => int(self.recovery_high),
      Metric::Vo2Max => self.vo2_max,
      Metric::WorkoutCount => self.workout_count.map(|c| c as f64),
      Metric::WorkoutDuration => self.workout_duration,
      Metric::Weight => self.body.weight,
      Metric::FatMass => self.body.fat_mass,
      Metric::BoneMass => self.body.bone_mass,
      Metric::MuscleMass => self.body.muscle_mass,
      Metric::Hydration => self.body.hydration,
    }
  }
}
