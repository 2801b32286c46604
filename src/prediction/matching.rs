//! Distance-similarity matching between historical runs and a target race

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::weighting::WeightedRun;

/// min/max ratio of two distances: 1.0 for identical, toward 0 as they diverge.
pub fn similarity(run_miles: f64, target_miles: f64) -> f64 {
  let hi = run_miles.max(target_miles);
  if hi <= 0.0 {
    return 0.0;
  }
  run_miles.min(target_miles) / hi
}

/// Fastest observed pace at or near a distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecord {
  pub pace_seconds_per_mile: f64,
  pub distance_miles: f64,
  pub date: DateTime<Utc>,
}

impl PersonalRecord {
  /// The record pace held over the target distance
  pub fn time_at(&self, target_miles: f64) -> f64 {
    self.pace_seconds_per_mile * target_miles
  }
}

/// Fastest run in an iterator; ties keep the first seen.
pub fn fastest<'r, 'a: 'r>(
  runs: impl IntoIterator<Item = &'r WeightedRun<'a>>,
) -> Option<&'r WeightedRun<'a>> {
  runs.into_iter().min_by(|a, b| a.pace().total_cmp(&b.pace()))
}

/// Personal-record anchor: chosen by pace among similar runs of any age.
pub fn personal_record(
  runs: &[WeightedRun<'_>],
  target_miles: f64,
  min_similarity: f64,
) -> Option<PersonalRecord> {
  fastest(
    runs
      .iter()
      .filter(|r| similarity(r.distance(), target_miles) >= min_similarity),
  )
  .map(|r| PersonalRecord {
    pace_seconds_per_mile: r.pace(),
    distance_miles: r.distance(),
    date: r.run.date,
  })
}

/// Fastest similar run carrying at least `min_weight`.
pub fn best_similar<'r, 'a>(
  runs: &'r [WeightedRun<'a>],
  target_miles: f64,
  min_similarity: f64,
  min_weight: f64,
) -> Option<&'r WeightedRun<'a>> {
  fastest(runs.iter().filter(|r| {
    r.weight >= min_weight && similarity(r.distance(), target_miles) >= min_similarity
  }))
}

/// Up to `limit` runs with at least `min_weight`, nearest in absolute
/// distance first. The head of the list is the scaling anchor.
pub fn closest_runs<'r, 'a>(
  runs: &'r [WeightedRun<'a>],
  target_miles: f64,
  min_weight: f64,
  limit: usize,
) -> Vec<&'r WeightedRun<'a>> {
  let mut candidates: Vec<&WeightedRun> = runs.iter().filter(|r| r.weight >= min_weight).collect();
  candidates.sort_by(|a, b| {
    (a.distance() - target_miles)
      .abs()
      .total_cmp(&(b.distance() - target_miles).abs())
  });
  candidates.truncate(limit);
  candidates
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::RecencyTiers;
  use crate::models::Run;
  use crate::prediction::weighting::weigh_runs;
  use crate::test_utils::*;

  #[test]
  fn test_similarity_is_symmetric_ratio() {
    assert_eq!(similarity(3.0, 6.0), 0.5);
    assert_eq!(similarity(6.0, 3.0), 0.5);
    assert_eq!(similarity(5.0, 5.0), 1.0);
    assert_eq!(similarity(0.0, 0.0), 0.0);
  }

  #[test]
  fn test_personal_record_picks_fastest_not_most_recent() {
    let now = fixed_now();
    let runs = vec![
      mock_run(now, 2, 3.1, 500.0),
      mock_run(now, 400, 3.2, 470.0),
      mock_run(now, 10, 10.0, 400.0), // fast but not similar
    ];
    let set = weigh_runs(&runs, now, &RecencyTiers::default());

    let pr = personal_record(&set.runs, 3.10686, 0.7).unwrap();

    assert_eq!(pr.pace_seconds_per_mile, 470.0);
    assert_eq!(pr.distance_miles, 3.2);
    assert_approx_eq!(pr.time_at(3.0), 1410.0, 1e-9);
  }

  #[test]
  fn test_personal_record_accepts_shorter_run_within_tolerance() {
    let now = fixed_now();
    // 2.4 / 3.10686 ≈ 0.77: inside the similarity threshold
    let runs = vec![mock_run(now, 10, 2.4, 450.0), mock_run(now, 10, 2.1, 400.0)];
    let set = weigh_runs(&runs, now, &RecencyTiers::default());

    let pr = personal_record(&set.runs, 3.10686, 0.7).unwrap();

    // 2.1 mi is below 0.7 and never counts
    assert_eq!(pr.distance_miles, 2.4);
    assert_eq!(pr.pace_seconds_per_mile, 450.0);
  }

  #[test]
  fn test_no_match_returns_empty() {
    let now = fixed_now();
    let runs = vec![mock_run(now, 2, 1.0, 420.0)];
    let set = weigh_runs(&runs, now, &RecencyTiers::default());

    assert!(personal_record(&set.runs, 26.2, 0.7).is_none());
    assert!(best_similar(&set.runs, 26.2, 0.7, 0.6).is_none());
    // Closeness has no tolerance, only the weight floor filters
    assert_eq!(closest_runs(&set.runs, 26.2, 0.3, 5).len(), 1);
    assert!(closest_runs(&set.runs, 26.2, 1.01, 5).is_empty());
  }

  #[test]
  fn test_best_similar_respects_weight_floor() {
    let now = fixed_now();
    let runs = vec![
      mock_run(now, 300, 3.1, 450.0), // weight 0.3
      mock_run(now, 20, 3.0, 490.0),
    ];
    let set = weigh_runs(&runs, now, &RecencyTiers::default());

    let best = best_similar(&set.runs, 3.10686, 0.7, 0.6).unwrap();
    assert_eq!(best.pace(), 490.0);
  }

  #[test]
  fn test_closest_runs_orders_by_distance_and_truncates() {
    let now = fixed_now();
    let runs: Vec<Run> = [4.0, 12.0, 8.0, 14.0, 13.0, 20.0, 2.0]
      .iter()
      .map(|d| mock_run(now, 10, *d, 500.0))
      .collect();
    let set = weigh_runs(&runs, now, &RecencyTiers::default());

    let closest = closest_runs(&set.runs, 13.1, 0.3, 5);
    let distances: Vec<f64> = closest.iter().map(|r| r.distance()).collect();

    assert_eq!(distances, vec![13.0, 14.0, 12.0, 8.0, 20.0]);
  }
}
