use chrono::{DateTime, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar day used as the join key across every collection.
///
/// Two days are equal iff their calendar dates are equal. No time-zone
/// normalization happens here; the API has already assigned each sample a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Day(NaiveDate);

impl Day {
  /// Parse a `YYYY-MM-DD` key. Anything else yields `None`.
  pub fn parse(key: &str) -> Option<Self> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok().map(Self)
  }

  /// Calendar day of an instant, in the instant's own offset
  pub fn of<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
    Self(instant.date_naive())
  }

  pub fn date(&self) -> NaiveDate {
    self.0
  }
}

impl fmt::Display for Day {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.format("%Y-%m-%d"))
  }
}

impl FromStr for Day {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s).ok_or_else(|| format!("Invalid day '{}', expected YYYY-MM-DD", s))
  }
}

/// ---------------------------------------------------------------------------
/// Shifted Hours
/// ---------------------------------------------------------------------------

/// Time-of-day boundary used to lay overnight spans on a continuous axis.
///
/// Wall-clock hours after the cutoff are represented as `hour - 24`, so a
/// bedtime of 23:30 becomes -0.5 and sits right next to 00:30 (0.5) instead of
/// wrapping around to the top of the chart. The same value decodes the shifted
/// hours back to wall clock for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCutoff {
  hour: u32,
}

impl DayCutoff {
  pub const DEFAULT: DayCutoff = DayCutoff { hour: 16 };

  pub const fn new(hour: u32) -> Self {
    Self { hour }
  }

  pub const fn hour(&self) -> u32 {
    self.hour
  }

  pub fn shift_hour(&self, hour: u32) -> i32 {
    if hour > self.hour {
      hour as i32 - 24
    } else {
      hour as i32
    }
  }

  /// Shifted hour-of-day of an instant, with minutes as a fraction
  pub fn shifted_hours<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> f64 {
    self.shift_hour(instant.hour()) as f64 + instant.minute() as f64 / 60.0
  }

  /// Decode a shifted hour back to a 0-24 wall-clock hour
  pub fn unshift(&self, shifted: f64) -> f64 {
    if shifted < 0.0 {
      shifted + 24.0
    } else {
      shifted
    }
  }
}

impl Default for DayCutoff {
  fn default() -> Self {
    Self::DEFAULT
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::FixedOffset;

  #[test]
  fn test_day_parse_and_display() {
    let day = Day::parse("2024-01-05").unwrap();
    assert_eq!(day.to_string(), "2024-01-05");
    assert_eq!(day, "2024-01-05".parse::<Day>().unwrap());
  }

  #[test]
  fn test_day_parse_rejects_garbage() {
    assert!(Day::parse("").is_none());
    assert!(Day::parse("not-a-day").is_none());
    assert!(Day::parse("2024-13-40").is_none());
  }

  #[test]
  fn test_day_of_instant_uses_its_offset() {
    // 23:30 on the 4th in UTC+2 is still the 4th locally
    let instant = DateTime::parse_from_rfc3339("2024-01-04T23:30:00+02:00").unwrap();
    assert_eq!(Day::of(&instant), Day::parse("2024-01-04").unwrap());
  }

  #[test]
  fn test_shift_hour_at_cutoff() {
    let cutoff = DayCutoff::DEFAULT;
    for h in 0..=16 {
      assert_eq!(cutoff.shift_hour(h), h as i32);
    }
    for h in 17..24 {
      assert_eq!(cutoff.shift_hour(h), h as i32 - 24);
    }
  }

  #[test]
  fn test_shift_round_trip_recovers_wall_clock() {
    let cutoff = DayCutoff::DEFAULT;
    for h in 0..24u32 {
      let shifted = cutoff.shift_hour(h) as f64;
      assert_eq!(cutoff.unshift(shifted), h as f64);
    }
  }

  #[test]
  fn test_shifted_hours_includes_minutes() {
    let cutoff = DayCutoff::DEFAULT;
    let tz = FixedOffset::east_opt(3600).unwrap();
    let bedtime = tz.with_ymd_and_hms(2024, 1, 4, 22, 30, 0).unwrap();
    let wake = tz.with_ymd_and_hms(2024, 1, 5, 7, 15, 0).unwrap();

    assert_eq!(cutoff.shifted_hours(&bedtime), -1.5);
    assert_eq!(cutoff.shifted_hours(&wake), 7.25);
    assert_eq!(cutoff.unshift(-1.5), 22.5);
  }

  #[test]
  fn test_custom_cutoff_moves_the_boundary() {
    let cutoff = DayCutoff::new(20);
    assert_eq!(cutoff.hour(), 20);
    assert_eq!(cutoff.shift_hour(18), 18);
    assert_eq!(cutoff.shift_hour(21), -3);
    assert_eq!(DayCutoff::default().hour(), 16);
  }

  #[test]
  fn test_hour_equal_to_cutoff_is_not_shifted() {
    let cutoff = DayCutoff::DEFAULT;
    let tz = FixedOffset::east_opt(0).unwrap();
    let nap = tz.with_ymd_and_hms(2024, 1, 4, 16, 30, 0).unwrap();
    assert_eq!(cutoff.shifted_hours(&nap), 16.5);
  }
}
