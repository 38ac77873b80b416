use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every numeric field of a daily record that can be charted or smoothed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
  // Sleep
  AverageBreath,
  AverageHeartRate,
  HrDailyAverage,
  AverageHrv,
  AwakeTime,
  BedtimeEndHour,
  BedtimeStartHour,
  DeepSleepDuration,
  Efficiency,
  Latency,
  LightSleepDuration,
  LowestHeartRate,
  ReadinessScore,
  TemperatureDeviation,
  TemperatureTrendDeviation,
  RemSleepDuration,
  RestlessPeriods,
  TimeInBed,
  TotalSleepDuration,
  // Activity
  Steps,
  ActiveCalories,
  TotalCalories,
  ActivityScore,
  EquivalentWalkingDistance,
  HighActivityTime,
  MediumActivityTime,
  LowActivityTime,
  SedentaryTime,
  RestingTime,
  // Health
  Spo2Average,
  BreathingDisturbanceIndex,
  StressHigh,
  RecoveryHigh,
  Vo2Max,
  // Workouts
  WorkoutCount,
  WorkoutDuration,
  // Body
  Weight,
  FatMass,
  BoneMass,
  MuscleMass,
  Hydration,
}

/// Display metadata for a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricInfo {
  pub name: &'static str,
  pub label: &'static str,
  pub unit: &'static str,
  pub section: &'static str,
}

impl Metric {
  pub const ALL: [Metric; 41] = [
    Metric::AverageBreath,
    Metric::AverageHeartRate,
    Metric::HrDailyAverage,
    Metric::AverageHrv,
    Metric::AwakeTime,
    Metric::BedtimeEndHour,
    Metric::BedtimeStartHour,
    Metric::DeepSleepDuration,
    Metric::Efficiency,
    Metric::Latency,
    Metric::LightSleepDuration,
    Metric::LowestHeartRate,
    Metric::ReadinessScore,
    Metric::TemperatureDeviation,
    Metric::TemperatureTrendDeviation,
    Metric::RemSleepDuration,
    Metric::RestlessPeriods,
    Metric::TimeInBed,
    Metric::TotalSleepDuration,
    Metric::Steps,
    Metric::ActiveCalories,
    Metric::TotalCalories,
    Metric::ActivityScore,
    Metric::EquivalentWalkingDistance,
    Metric::HighActivityTime,
    Metric::MediumActivityTime,
    Metric::LowActivityTime,
    Metric::SedentaryTime,
    Metric::RestingTime,
    Metric::Spo2Average,
    Metric::BreathingDisturbanceIndex,
    Metric::StressHigh,
    Metric::RecoveryHigh,
    Metric::Vo2Max,
    Metric::WorkoutCount,
    Metric::WorkoutDuration,
    Metric::Weight,
    Metric::FatMass,
    Metric::BoneMass,
    Metric::MuscleMass,
    Metric::Hydration,
  ];

  pub fn info(&self) -> MetricInfo {
    let (name, label, unit, section) = match self {
      Metric::AverageBreath => ("average_breath", "Average breath", "breaths/min", "Sleep"),
      Metric::AverageHeartRate => ("average_heart_rate", "Average heart rate (sleep)", "bpm", "Sleep"),
      Metric::HrDailyAverage => ("hr_daily_average", "Average heart rate (all-day)", "bpm", "Sleep"),
      Metric::AverageHrv => ("average_hrv", "Average HRV", "ms", "Sleep"),
      Metric::AwakeTime => ("awake_time", "Awake time", "s", "Sleep"),
      Metric::BedtimeEndHour => ("bedtime_end_hour", "Bedtime end", "h", "Sleep"),
      Metric::BedtimeStartHour => ("bedtime_start_hour", "Bedtime start", "h", "Sleep"),
      Metric::DeepSleepDuration => ("deep_sleep_duration", "Deep sleep", "s", "Sleep"),
      Metric::Efficiency => ("efficiency", "Efficiency", "%", "Sleep"),
      Metric::Latency => ("latency", "Latency", "s", "Sleep"),
      Metric::LightSleepDuration => ("light_sleep_duration", "Light sleep", "s", "Sleep"),
      Metric::LowestHeartRate => ("lowest_heart_rate", "Lowest heart rate", "bpm", "Sleep"),
      Metric::ReadinessScore => ("readiness_score", "Readiness score", "%", "Sleep"),
      Metric::TemperatureDeviation => ("temperature_deviation", "Temperature deviation", "°C", "Sleep"),
      Metric::TemperatureTrendDeviation => (
        "temperature_trend_deviation",
        "Temperature trend deviation",
        "°C",
        "Sleep",
      ),
      Metric::RemSleepDuration => ("rem_sleep_duration", "REM sleep", "s", "Sleep"),
      Metric::RestlessPeriods => ("restless_periods", "Restlessness periods", "periods", "Sleep"),
      Metric::TimeInBed => ("time_in_bed", "Time in bed", "s", "Sleep"),
      Metric::TotalSleepDuration => ("total_sleep_duration", "Total sleep", "s", "Sleep"),
      Metric::Steps => ("steps", "Steps", "steps", "Activity"),
      Metric::ActiveCalories => ("active_calories", "Active calories", "kcal", "Activity"),
      Metric::TotalCalories => ("total_calories", "Total calories", "kcal", "Activity"),
      Metric::ActivityScore => ("activity_score", "Activity score", "%", "Activity"),
      Metric::EquivalentWalkingDistance => {
        ("equivalent_walking_distance", "Walking distance", "m", "Activity")
      }
      Metric::HighActivityTime => ("high_activity_time", "High activity", "s", "Activity"),
      Metric::MediumActivityTime => ("medium_activity_time", "Medium activity", "s", "Activity"),
      Metric::LowActivityTime => ("low_activity_time", "Low activity", "s", "Activity"),
      Metric::SedentaryTime => ("sedentary_time", "Sedentary time", "s", "Activity"),
      Metric::RestingTime => ("resting_time", "Resting time", "s", "Activity"),
      Metric::Spo2Average => ("spo2_average", "SpO2 average", "%", "Health"),
      Metric::BreathingDisturbanceIndex => {
        ("breathing_disturbance_index", "Breathing disturbance", "", "Health")
      }
      Metric::StressHigh => ("stress_high", "Stress (high)", "s", "Health"),
      Metric::RecoveryHigh => ("recovery_high", "Recovery (high)", "s", "Health"),
      Metric::Vo2Max => ("vo2_max", "VO2 Max", "mL/kg/min", "Health"),
      Metric::WorkoutCount => ("workout_count", "Workout count", "", "Workouts"),
      Metric::WorkoutDuration => ("workout_duration", "Workout duration", "s", "Workouts"),
      Metric::Weight => ("weight", "Weight", "kg", "Body"),
      Metric::FatMass => ("fat_mass", "Fat mass", "kg", "Body"),
      Metric::BoneMass => ("bone_mass", "Bone mass", "kg", "Body"),
      Metric::MuscleMass => ("muscle_mass", "Muscle mass", "kg", "Body"),
      Metric::Hydration => ("hydration", "Hydration", "kg", "Body"),
    };
    MetricInfo { name, label, unit, section }
  }

  pub fn name(&self) -> &'static str {
    self.info().name
  }

  /// Values are shifted hours and need `DayCutoff::unshift` for display
  pub fn is_shifted(&self) -> bool {
    matches!(self, Metric::BedtimeStartHour | Metric::BedtimeEndHour)
  }
}

impl fmt::Display for Metric {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Metric {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Metric::ALL
      .iter()
      .copied()
      .find(|m| m.name() == s)
      .ok_or_else(|| format!("Unknown metric '{}'", s))
  }
}
