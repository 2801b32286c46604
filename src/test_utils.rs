//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Helper assertions

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::analysis::TrainingSnapshot;
use crate::db::Store;
use crate::models::{Activity, MileSplit, Run};
use crate::strava::StravaActivity;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// In-memory store with every migration applied
pub async fn setup_test_db() -> Store {
  Store::open_in_memory()
    .await
    .expect("Failed to create in-memory database")
}

pub async fn teardown_test_db(store: Store) {
  store.close().await;
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Reference "now" shared by every test: 2025-06-01 12:00 UTC
pub fn fixed_now() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_run(now: DateTime<Utc>, days_ago: i64, miles: f64, pace: f64) -> Run {
  Run::new(now - Duration::days(days_ago), miles, pace)
}

/// Six months of weekly runs from 3.1 to 13.1 miles plus a recent mile
/// time trial. The twelve most recent runs carry full mile splits.
pub fn mock_training_history(now: DateTime<Utc>) -> Vec<Run> {
  const DISTANCES: [f64; 6] = [3.1, 5.0, 6.2, 10.0, 13.1, 4.0];

  let mut runs: Vec<Run> = (0..24)
    .map(|i| {
      let miles = DISTANCES[i % DISTANCES.len()];
      let pace = 480.0 + (i % 4) as f64 * 10.0 + miles * 2.0;
      let run = mock_run(now, 3 + i as i64 * 7, miles, pace);
      if i < 12 {
        let splits = (0..miles.floor() as usize)
          .map(|k| MileSplit::full(pace - 5.0 + (k % 3) as f64 * 5.0))
          .collect();
        run.with_splits(splits)
      } else {
        run
      }
    })
    .collect();

  runs.push(mock_run(now, 10, 1.0, 400.0).with_splits(vec![MileSplit::full(400.0)]));
  runs.sort_by_key(|r| r.date);
  runs
}

pub fn mock_snapshot() -> TrainingSnapshot {
  let now = fixed_now();
  TrainingSnapshot {
    total_runs: 20,
    first_run_at: Some(now - Duration::days(200)),
    last_run_at: Some(now - Duration::days(2)),
    total_miles: 140.0,
    recent_runs: 10,
    longest_run_miles: 13.1,
    longest_recent_run_miles: Some(10.0),
    recent_pace_std_seconds: Some(30.0),
    weekly_miles_recent: 12.0,
    weekly_miles_30: 14.0,
    fitness_trend: 1.0,
  }
}

/// Strava activity as returned by `/athlete/activities`: 10 km in 50 min
pub fn mock_strava_activity(id: i64, kind: &str, start_date: DateTime<Utc>) -> StravaActivity {
  StravaActivity {
    id,
    name: format!("Activity {}", id),
    activity_type: kind.to_string(),
    start_date,
    moving_time: Some(3000),
    distance: Some(10000.0),
    total_elevation_gain: Some(100.0),
    average_heartrate: Some(145.0),
    max_heartrate: Some(165.0),
  }
}

/// Stored activity row, without elevation
pub fn mock_activity(
  kind: &str,
  started_at: DateTime<Utc>,
  meters: f64,
  moving_seconds: i64,
  average_heartrate: Option<f64>,
) -> Activity {
  Activity {
    id: 0,
    strava_id: format!("{}-{}", kind, started_at.timestamp()),
    name: None,
    activity_type: kind.to_string(),
    started_at,
    moving_time_seconds: Some(moving_seconds),
    distance_meters: Some(meters),
    elevation_gain_meters: None,
    average_heartrate,
    max_heartrate: None,
    raw_json: None,
    splits_fetched_at: None,
    created_at: None,
  }
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_empty_store() {
    let store = setup_test_db().await;

    assert!(store.load_activities().await.unwrap().is_empty());
    assert!(store.load_tokens().await.unwrap().is_none());

    teardown_test_db(store).await;
  }

  #[test]
  fn test_training_history_is_sorted_and_usable() {
    let now = fixed_now();
    let runs = mock_training_history(now);

    assert_eq!(runs.len(), 25);
    assert!(runs.windows(2).all(|w| w[0].date <= w[1].date));
    assert!(runs.iter().all(Run::is_usable));
    assert_eq!(runs.iter().filter(|r| !r.mile_splits.is_empty()).count(), 13);
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let activity = mock_strava_activity(7, "Run", fixed_now());
    assert_eq!(activity.activity_type, "Run");
    assert_eq!(activity.distance, Some(10000.0));

    let stored = mock_activity("Ride", fixed_now(), 20000.0, 3600, None);
    assert_eq!(stored.activity_type, "Ride");
    assert_approx_eq!(mock_snapshot().fitness_trend, 1.0, 1e-12);
  }
}
