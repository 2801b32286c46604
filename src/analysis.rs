//! Deterministic training metrics over a run history
//!
//! These aggregate numbers feed confidence scoring and the report header.
//! Everything is computed relative to an explicit `now`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PredictionConfig;
use crate::models::Run;

const TREND_WINDOW_DAYS: i64 = 60;
const TREND_MIN_RUNS: usize = 10;
const SHORT_WINDOW_DAYS: i64 = 30;

/// ---------------------------------------------------------------------------
/// Training Snapshot
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
  pub total_runs: usize,
  pub first_run_at: Option<DateTime<Utc>>,
  pub last_run_at: Option<DateTime<Utc>>,
  pub total_miles: f64,

  /// Runs inside the recent window (90 days by default)
  pub recent_runs: usize,
  pub longest_run_miles: f64,
  pub longest_recent_run_miles: Option<f64>,

  /// Population std-dev of recent paces, when enough recent runs exist
  pub recent_pace_std_seconds: Option<f64>,

  pub weekly_miles_recent: f64,
  pub weekly_miles_30: f64,

  /// Mean pace early in the last 60 days over mean pace late; >1 means faster
  pub fitness_trend: f64,
}

impl TrainingSnapshot {
  pub fn compute(runs: &[Run], now: DateTime<Utc>, config: &PredictionConfig) -> Self {
    let usable: Vec<&Run> = runs.iter().filter(|r| r.is_usable()).collect();
    let window = config.confidence.recent_window_days;

    let recent = within_days(&usable, now, window);
    let recent_paces: Vec<f64> = recent.iter().map(|r| r.average_pace_sec_per_mile).collect();

    let recent_pace_std_seconds = if recent_paces.len() >= config.confidence.spread_min_runs {
      population_std(&recent_paces)
    } else {
      None
    };

    Self {
      total_runs: usable.len(),
      first_run_at: usable.iter().map(|r| r.date).min(),
      last_run_at: usable.iter().map(|r| r.date).max(),
      total_miles: usable.iter().map(|r| r.distance_miles).sum(),
      recent_runs: recent.len(),
      longest_run_miles: max_distance(&usable).unwrap_or(0.0),
      longest_recent_run_miles: max_distance(&recent),
      recent_pace_std_seconds,
      weekly_miles_recent: weekly_miles(&recent, window),
      weekly_miles_30: weekly_miles(&within_days(&usable, now, SHORT_WINDOW_DAYS), SHORT_WINDOW_DAYS),
      fitness_trend: fitness_trend(&usable, now),
    }
  }
}

/// Whole days elapsed between a run and `now`; negative for future dates.
pub fn days_between(date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
  (now - date).num_days()
}

fn within_days<'a>(runs: &[&'a Run], now: DateTime<Utc>, days: i64) -> Vec<&'a Run> {
  runs
    .iter()
    .filter(|r| days_between(r.date, now) <= days)
    .copied()
    .collect()
}

fn max_distance(runs: &[&Run]) -> Option<f64> {
  runs.iter().map(|r| r.distance_miles).reduce(f64::max)
}

fn weekly_miles(runs: &[&Run], days: i64) -> f64 {
  if days <= 0 {
    return 0.0;
  }
  let total: f64 = runs.iter().map(|r| r.distance_miles).sum();
  total / (days as f64 / 7.0)
}

fn fitness_trend(runs: &[&Run], now: DateTime<Utc>) -> f64 {
  let mut recent = within_days(runs, now, TREND_WINDOW_DAYS);
  if recent.len() < TREND_MIN_RUNS {
    return 1.0;
  }
  recent.sort_by_key(|r| r.date);

  let quarter = recent.len() / 4;
  let first = mean(recent[..quarter].iter().map(|r| r.average_pace_sec_per_mile));
  let last = mean(recent[recent.len() - quarter..].iter().map(|r| r.average_pace_sec_per_mile));

  match (first, last) {
    (Some(f), Some(l)) if l > 0.0 => f / l,
    _ => 1.0,
  }
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
  let (sum, count) = values
    .into_iter()
    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
  (count > 0).then(|| sum / count as f64)
}

pub fn population_std(values: &[f64]) -> Option<f64> {
  let avg = mean(values.iter().copied())?;
  let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
  Some(variance.sqrt())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
