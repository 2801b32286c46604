use chrono::{DateTime, Utc};

use crate::analysis::days_between;
use crate::config::RecencyTiers;
use crate::models::Run;

/// A run paired with how much it should count toward current fitness.
#[derive(Debug, Clone, Copy)]
pub struct WeightedRun<'a> {
  pub run: &'a Run,
  pub weight: f64,
  pub days_ago: u32,
}

impl WeightedRun<'_> {
  pub fn pace(&self) -> f64 {
    self.run.average_pace_sec_per_mile
  }

  pub fn distance(&self) -> f64 {
    self.run.distance_miles
  }
}

/// Usable runs with their weights, plus how many inputs were dropped.
#[derive(Debug, Clone, Default)]
pub struct WeightedSet<'a> {
  pub runs: Vec<WeightedRun<'a>>,
  pub skipped: usize,
}

impl<'a> WeightedSet<'a> {
  pub fn is_empty(&self) -> bool {
    self.runs.is_empty()
  }
}

pub fn weigh_run<'a>(run: &'a Run, now: DateTime<Utc>, tiers: &RecencyTiers) -> WeightedRun<'a> {
  let days = days_between(run.date, now);
  WeightedRun {
    run,
    weight: tiers.weight_for(days),
    days_ago: days.max(0) as u32,
  }
}

/// Weigh every usable run. Malformed runs are counted, never fatal.
pub fn weigh_runs<'a>(runs: &'a [Run], now: DateTime<Utc>, tiers: &RecencyTiers) -> WeightedSet<'a> {
  let mut set = WeightedSet::default();

  for run in runs {
    if !run.is_usable() {
      tracing::debug!(
        date = %run.date,
        distance = run.distance_miles,
        pace = run.average_pace_sec_per_mile,
        "skipping malformed run"
      );
      set.skipped += 1;
      continue;
    }
    if run.date > now {
      tracing::warn!(date = %run.date, "run is dated after the analysis time, using minimum weight");
    }
    set.runs.push(weigh_run(run, now, tiers));
  }

  set
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;
  use chrono::Duration;

  #[test]
  fn test_weight_never_increases_with_age() {
    let now = fixed_now();
    let tiers = RecencyTiers::default();
    let ages = [0, 30, 89, 90, 91, 150, 180, 181, 300, 365, 366, 1000];

    let runs: Vec<Run> = ages.iter().map(|d| mock_run(now, *d, 5.0, 480.0)).collect();
    let weights: Vec<f64> = runs.iter().map(|r| weigh_run(r, now, &tiers).weight).collect();

    assert!(weights.windows(2).all(|w| w[0] >= w[1]), "weights: {:?}", weights);
    assert!(weights.iter().all(|w| *w > 0.0 && *w <= 1.0));
  }

  #[test]
  fn test_adjacent_tier_boundaries() {
    let now = fixed_now();
    let tiers = RecencyTiers::default();

    let at_89 = weigh_run(&mock_run(now, 89, 5.0, 480.0), now, &tiers).weight;
    let at_91 = weigh_run(&mock_run(now, 91, 5.0, 480.0), now, &tiers).weight;
    let at_180 = weigh_run(&mock_run(now, 180, 5.0, 480.0), now, &tiers).weight;
    let at_181 = weigh_run(&mock_run(now, 181, 5.0, 480.0), now, &tiers).weight;

    assert!(at_89 > at_91);
    assert!(at_180 > at_181, "180 and 181 days must land in different tiers");
    assert_eq!(at_180, 0.6);
    assert_eq!(at_181, 0.3);
  }

  #[test]
  fn test_future_run_gets_minimum_weight() {
    let now = fixed_now();
    let run = Run::new(now + Duration::days(3), 5.0, 480.0);
    let weighted = weigh_run(&run, now, &RecencyTiers::default());

    assert_eq!(weighted.weight, 0.1);
    assert_eq!(weighted.days_ago, 0);
  }

  #[test]
  fn test_malformed_runs_are_skipped_not_fatal() {
    let now = fixed_now();
    let runs = vec![
      mock_run(now, 1, 0.0, 480.0),
      mock_run(now, 2, 3.1, f64::INFINITY),
      mock_run(now, 3, 3.1, 480.0),
    ];

    let set = weigh_runs(&runs, now, &RecencyTiers::default());

    assert_eq!(set.runs.len(), 1);
    assert_eq!(set.skipped, 2);
    assert_eq!(set.runs[0].days_ago, 3);
  }
}
