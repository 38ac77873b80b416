//! Day-keyed lookup structures built once per query
//!
//! Raw collections arrive as flat lists. Before the join they are keyed by
//! calendar day, either one sample per day or every sample per day.

use crate::models::Day;
use crate::oura::{DailyActivity, DailySpo2, DailyStress, HeartRateSample, Vo2Max, Workout};
use std::collections::HashMap;
use tracing::trace;

/// A sample that belongs to a calendar day
pub trait DayKeyed {
  /// Raw day key as sent by the API (`YYYY-MM-DD`)
  fn day_key(&self) -> &str;
}

macro_rules! day_keyed {
  ($($ty:ty),*) => {
    $(impl DayKeyed for $ty {
      fn day_key(&self) -> &str {
        &self.day
      }
    })*
  };
}

day_keyed!(DailyActivity, DailySpo2, DailyStress, Vo2Max, Workout);

impl DayKeyed for HeartRateSample {
  fn day_key(&self) -> &str {
    self.timestamp.get(..10).unwrap_or_default()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
  /// At most one sample per day; the first one seen is kept
  One,
  /// Every sample per day, in arrival order
  Many,
}

#[derive(Debug, Clone)]
pub enum IndexedCollection<T> {
  One(HashMap<Day, T>),
  Many(HashMap<Day, Vec<T>>),
}

/// Key samples by calendar day.
///
/// With `Cardinality::One` the first sample for a day wins and later ones are
/// dropped. Samples whose day key is not a valid date are skipped; looking
/// them up later simply finds nothing.
pub fn index_by_day<T: DayKeyed>(samples: Vec<T>, cardinality: Cardinality) -> IndexedCollection<T> {
  let keyed = samples.into_iter().filter_map(|sample| match Day::parse(sample.day_key()) {
    Some(day) => Some((day, sample)),
    None => {
      trace!(key = sample.day_key(), "Skipping sample without a valid day");
      None
    }
  });

  match cardinality {
    Cardinality::One => {
      let mut by_day = HashMap::new();
      for (day, sample) in keyed {
        by_day.entry(day).or_insert(sample);
      }
      IndexedCollection::One(by_day)
    }
    Cardinality::Many => {
      let mut by_day: HashMap<Day, Vec<T>> = HashMap::new();
      for (day, sample) in keyed {
        by_day.entry(day).or_default().push(sample);
      }
      IndexedCollection::Many(by_day)
    }
  }
}

impl<T> IndexedCollection<T> {
  pub fn empty(cardinality: Cardinality) -> Self {
    match cardinality {
      Cardinality::One => IndexedCollection::One(HashMap::new()),
      Cardinality::Many => IndexedCollection::Many(HashMap::new()),
    }
  }

  /// The sample for a day (the first one, for one-to-many collections)
  pub fn first(&self, day: &Day) -> Option<&T> {
    match self {
      IndexedCollection::One(by_day) => by_day.get(day),
      IndexedCollection::Many(by_day) => by_day.get(day).and_then(|samples| samples.first()),
    }
  }

  /// Every sample for a day, empty if the day is absent
  pub fn all(&self, day: &Day) -> &[T] {
    match self {
      IndexedCollection::One(by_day) => by_day.get(day).map(std::slice::from_ref).unwrap_or(&[]),
      IndexedCollection::Many(by_day) => by_day.get(day).map(Vec::as_slice).unwrap_or(&[]),
    }
  }

  /// Number of distinct days
  pub fn len(&self) -> usize {
    match self {
      IndexedCollection::One(by_day) => by_day.len(),
      IndexedCollection::Many(by_day) => by_day.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// ---------------------------------------------------------------------------
/// Heart Rate Accumulator
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct BpmSum {
  sum: i64,
  count: u32,
}

/// Running sum and count of heart rate samples per day
#[derive(Debug, Clone, Default)]
pub struct HeartRateByDay {
  days: HashMap<Day, BpmSum>,
}

impl HeartRateByDay {
  pub fn from_samples(samples: &[HeartRateSample]) -> Self {
    let mut days: HashMap<Day, BpmSum> = HashMap::new();
    for sample in samples {
      if let Some(day) = Day::parse(sample.day_key()) {
        let acc = days.entry(day).or_default();
        acc.sum += sample.bpm;
        acc.count += 1;
      }
    }
    Self { days }
  }

  /// Mean bpm for the day, rounded to a whole beat
  pub fn mean(&self, day: &Day) -> Option<i64> {
    self
      .days
      .get(day)
      .filter(|acc| acc.count > 0)
      .map(|acc| (acc.sum as f64 / acc.count as f64).round() as i64)
  }

  pub fn len(&self) -> usize {
    self.days.len()
  }

  pub fn is_empty(&self) -> bool {
    self.days.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;

  fn day(s: &str) -> Day {
    Day::parse(s).unwrap()
  }

  #[test]
  fn test_one_cardinality_first_write_wins() {
    let samples = vec![
      activity("2024-01-05", 1000),
      activity("2024-01-06", 2000),
      activity("2024-01-05", 9999),
    ];
    let index = index_by_day(samples, Cardinality::One);

    assert_eq!(index.len(), 2);
    assert_eq!(index.first(&day("2024-01-05")).unwrap().steps, Some(1000));
    assert_eq!(index.all(&day("2024-01-05")).len(), 1);
  }

  #[test]
  fn test_one_cardinality_is_order_sensitive() {
    let samples = vec![activity("2024-01-05", 9999), activity("2024-01-05", 1000)];
    let index = index_by_day(samples, Cardinality::One);
    assert_eq!(index.first(&day("2024-01-05")).unwrap().steps, Some(9999));
  }

  #[test]
  fn test_many_cardinality_keeps_arrival_order() {
    let samples = vec![
      workout("2024-01-05", Some("2024-01-05T07:00:00+00:00"), None),
      workout("2024-01-06", None, None),
      workout("2024-01-05", Some("2024-01-05T18:00:00+00:00"), None),
    ];
    let index = index_by_day(samples, Cardinality::Many);

    let same_day = index.all(&day("2024-01-05"));
    assert_eq!(same_day.len(), 2);
    assert_eq!(same_day[0].start_datetime.unwrap().to_rfc3339(), "2024-01-05T07:00:00+00:00");
    assert_eq!(same_day[1].start_datetime.unwrap().to_rfc3339(), "2024-01-05T18:00:00+00:00");
    assert_eq!(index.all(&day("2024-01-06")).len(), 1);
  }

  #[test]
  fn test_absent_day_is_empty() {
    let index = index_by_day(vec![activity("2024-01-05", 1)], Cardinality::Many);
    assert!(index.first(&day("2024-02-01")).is_none());
    assert!(index.all(&day("2024-02-01")).is_empty());
  }

  #[test]
  fn test_malformed_day_keys_are_dropped() {
    let samples = vec![activity("", 1), activity("05/01/2024", 2), activity("2024-01-05", 3)];
    let index = index_by_day(samples, Cardinality::One);
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn test_heart_rate_mean_is_rounded() {
    let samples = vec![
      heart_rate("2024-01-05T08:00:00+00:00", 60),
      heart_rate("2024-01-05T09:00:00+00:00", 61),
      heart_rate("2024-01-05T10:00:00+00:00", 61),
      heart_rate("2024-01-06T08:00:00+00:00", 70),
    ];
    let hr = HeartRateByDay::from_samples(&samples);

    // 182 / 3 = 60.67
    assert_eq!(hr.mean(&day("2024-01-05")), Some(61));
    assert_eq!(hr.mean(&day("2024-01-06")), Some(70));
    assert_eq!(hr.mean(&day("2024-01-07")), None);
    assert_eq!(hr.len(), 2);
    assert!(!hr.is_empty());
    assert!(HeartRateByDay::from_samples(&[]).is_empty());
  }

  #[test]
  fn test_heart_rate_day_comes_from_timestamp_prefix() {
    let samples = vec![heart_rate("2024-01-05T23:59:00-05:00", 50), heart_rate("garbage", 200)];
    let hr = HeartRateByDay::from_samples(&samples);
    assert_eq!(hr.mean(&day("2024-01-05")), Some(50));
    assert_eq!(hr.len(), 1);
  }
}
