use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time taken to cover one mile of a run, or the trailing fraction of one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MileSplit {
  pub duration_seconds: f64,
  /// 1.0 for a full mile, less for a trailing partial split
  pub distance_miles: f64,
}

impl MileSplit {
  pub fn full(duration_seconds: f64) -> Self {
    Self {
      duration_seconds,
      distance_miles: 1.0,
    }
  }

  pub fn is_partial(&self) -> bool {
    self.distance_miles < 1.0
  }

  pub fn pace_seconds_per_mile(&self) -> Option<f64> {
    if self.distance_miles > 0.0 && self.duration_seconds.is_finite() {
      Some(self.duration_seconds / self.distance_miles)
    } else {
      None
    }
  }
}

/// A cleaned running activity, as handed to the prediction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
  pub date: DateTime<Utc>,
  pub distance_miles: f64,
  pub average_pace_sec_per_mile: f64,
  #[serde(default)]
  pub mile_splits: Vec<MileSplit>,
}

impl Run {
  pub fn new(date: DateTime<Utc>, distance_miles: f64, average_pace_sec_per_mile: f64) -> Self {
    Self {
      date,
      distance_miles,
      average_pace_sec_per_mile,
      mile_splits: Vec::new(),
    }
  }

  pub fn with_splits(mut self, mile_splits: Vec<MileSplit>) -> Self {
    self.mile_splits = mile_splits;
    self
  }

  /// Zero, negative or non-finite distance/pace makes a run unusable.
  pub fn is_usable(&self) -> bool {
    self.distance_miles.is_finite()
      && self.distance_miles > 0.0
      && self.average_pace_sec_per_mile.is_finite()
      && self.average_pace_sec_per_mile > 0.0
  }

  /// Total elapsed time implied by pace and distance
  pub fn total_seconds(&self) -> f64 {
    self.average_pace_sec_per_mile * self.distance_miles
  }

  /// Build a run from a Strava-style moving time and distance in meters.
  pub fn from_moving_time(
    date: DateTime<Utc>,
    distance_meters: f64,
    moving_time_seconds: f64,
  ) -> Option<Self> {
    let distance_miles = distance_meters * METERS_TO_MILES;
    if distance_miles <= 0.0 || moving_time_seconds <= 0.0 {
      return None;
    }
    let run = Self::new(date, distance_miles, moving_time_seconds / distance_miles);
    run.is_usable().then_some(run)
  }
}

pub const METERS_PER_MILE: f64 = 1609.34;
pub const METERS_TO_MILES: f64 = 0.000621371;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_usable_rejects_zero_and_nan() {
    let now = Utc::now();
    assert!(Run::new(now, 3.1, 480.0).is_usable());
    assert!(!Run::new(now, 0.0, 480.0).is_usable());
    assert!(!Run::new(now, 3.1, f64::NAN).is_usable());
    assert!(!Run::new(now, -1.0, 480.0).is_usable());
  }

  #[test]
  fn test_from_moving_time_converts_units() {
    let now = Utc::now();
    let run = Run::from_moving_time(now, 5000.0, 1500.0).unwrap();

    // 5000 m ≈ 3.1069 mi, 1500 s / 3.1069 mi ≈ 482.8 s/mi
    assert!((run.distance_miles - 3.106855).abs() < 1e-4);
    assert!((run.average_pace_sec_per_mile - 482.8).abs() < 0.1);
    assert!((run.total_seconds() - 1500.0).abs() < 1e-6);

    assert!(Run::from_moving_time(now, 0.0, 1500.0).is_none());
    assert!(Run::from_moving_time(now, 5000.0, 0.0).is_none());
  }

  #[test]
  fn test_partial_split_pace() {
    let split = MileSplit {
      duration_seconds: 240.0,
      distance_miles: 0.5,
    };
    assert!(split.is_partial());
    assert_eq!(split.pace_seconds_per_mile(), Some(480.0));
    assert!(!MileSplit::full(480.0).is_partial());
  }
}
