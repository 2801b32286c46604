//! Split-based readiness model
//!
//! Derives a speed score from the fastest single miles, an endurance score
//! from long-run paces, and a fatigue-resistance score from how much the back
//! end of long runs slows down. Volume and long-run readiness then inflate the
//! pace for the longer race tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnalysisContext, RaceFormula};
use crate::analysis::{days_between, mean};
use crate::config::ReadinessConfig;
use crate::models::{Estimate, FormulaKind, Run, TargetRace};

/// ---------------------------------------------------------------------------
/// Race Tiers
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessTier {
  Mile,
  FiveK,
  TenK,
  Half,
  Marathon,
  FiftyK,
  FiftyMile,
  HundredMile,
}

impl ReadinessTier {
  /// Nearest catalog race at or above the distance, so custom races still
  /// land on a tier.
  pub fn for_distance(miles: f64) -> Self {
    match miles {
      m if m <= 1.5 => ReadinessTier::Mile,
      m if m <= 4.0 => ReadinessTier::FiveK,
      m if m <= 8.0 => ReadinessTier::TenK,
      m if m <= 16.0 => ReadinessTier::Half,
      m if m <= 28.0 => ReadinessTier::Marathon,
      m if m <= 40.0 => ReadinessTier::FiftyK,
      m if m <= 75.0 => ReadinessTier::FiftyMile,
      _ => ReadinessTier::HundredMile,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Scores
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessScores {
  /// Seconds per mile
  pub speed: f64,
  /// Seconds per mile
  pub endurance: f64,
  /// 0-1, higher holds pace better
  pub fatigue_resistance: f64,
  pub volume_readiness: f64,
  pub long_run_readiness: f64,
  pub ultra_readiness: f64,
}

/// A run reduced to its plausible split paces.
struct SplitRun<'a> {
  run: &'a Run,
  paces: Vec<f64>,
  fastest_mile: f64,
}

impl<'a> SplitRun<'a> {
  fn from_run(run: &'a Run, config: &ReadinessConfig) -> Option<Self> {
    let paces: Vec<f64> = run
      .mile_splits
      .iter()
      .filter_map(|s| s.pace_seconds_per_mile())
      .filter(|p| (config.min_split_pace..=config.max_split_pace).contains(p))
      .collect();
    let fastest_mile = paces.iter().copied().reduce(f64::min)?;
    Some(Self {
      run,
      paces,
      fastest_mile,
    })
  }
}

impl ReadinessScores {
  /// `None` when no run carries a usable split.
  pub fn compute<'a>(
    runs: impl IntoIterator<Item = &'a Run>,
    now: DateTime<Utc>,
    config: &ReadinessConfig,
  ) -> Option<Self> {
    let mut split_runs: Vec<SplitRun> = runs
      .into_iter()
      .filter_map(|r| SplitRun::from_run(r, config))
      .collect();
    if split_runs.is_empty() {
      return None;
    }
    split_runs.sort_by_key(|s| s.run.date);

    let (weekly_miles, max_long) = training_volume(&split_runs, now, config);

    Some(Self {
      speed: speed_score(&split_runs, now, config)?,
      endurance: endurance_score(&split_runs, now, config)?,
      fatigue_resistance: fatigue_resistance(&split_runs, config),
      volume_readiness: (weekly_miles / config.weekly_miles_target).min(1.0),
      long_run_readiness: (max_long / config.long_run_target_miles).min(1.0),
      ultra_readiness: (max_long / config.ultra_target_miles).min(1.0),
    })
  }

  /// Predicted race pace in seconds per mile.
  pub fn pace_for(&self, tier: ReadinessTier) -> f64 {
    let s = self.speed;
    let e = self.endurance;
    let fatigue = 1.0 - self.fatigue_resistance;
    let v = self.volume_readiness;
    let ultra = v * self.ultra_readiness;

    match tier {
      ReadinessTier::Mile => s * 1.15,
      ReadinessTier::FiveK => s * 1.35 + fatigue * 5.0,
      ReadinessTier::TenK => (s * 0.7 + e * 0.3) * 1.20 + fatigue * 8.0,
      ReadinessTier::Half => {
        ((s * 0.3 + e * 0.7) * 1.15 + fatigue * 15.0) * (1.0 + (1.0 - v) * 0.05)
      }
      ReadinessTier::Marathon => {
        (e * 1.20 + fatigue * 20.0) * (1.0 + (1.0 - v * self.long_run_readiness) * 0.12)
      }
      ReadinessTier::FiftyK => (e * 1.25 + fatigue * 25.0) * (1.0 + (1.0 - ultra) * 0.15),
      ReadinessTier::FiftyMile => (e * 1.35 + fatigue * 30.0) * (1.0 + (1.0 - ultra) * 0.20),
      ReadinessTier::HundredMile => (e * 1.50 + fatigue * 40.0) * (1.0 + (1.0 - ultra) * 0.30),
    }
  }
}

/// Runs inside the window, or the most recent `fallback` runs when the window is empty.
fn window_or_latest<'r, 'a>(
  runs: &'r [SplitRun<'a>],
  now: DateTime<Utc>,
  days: i64,
  fallback: usize,
) -> Vec<&'r SplitRun<'a>> {
  let recent: Vec<&SplitRun> = runs
    .iter()
    .filter(|s| days_between(s.run.date, now) <= days)
    .collect();
  if !recent.is_empty() {
    return recent;
  }
  runs.iter().skip(runs.len().saturating_sub(fallback)).collect()
}

fn speed_score(runs: &[SplitRun<'_>], now: DateTime<Utc>, config: &ReadinessConfig) -> Option<f64> {
  let recent = window_or_latest(runs, now, config.speed_window_days, config.speed_fallback_runs);

  let mut fastest: Vec<f64> = recent
    .iter()
    .filter(|s| s.run.distance_miles <= config.speed_max_miles)
    .map(|s| s.fastest_mile)
    .collect();

  if fastest.is_empty() {
    return recent.iter().map(|s| s.fastest_mile).reduce(f64::min);
  }
  fastest.sort_by(f64::total_cmp);
  mean(fastest.into_iter().take(config.speed_top_miles))
}

fn endurance_score(
  runs: &[SplitRun<'_>],
  now: DateTime<Utc>,
  config: &ReadinessConfig,
) -> Option<f64> {
  let recent = window_or_latest(
    runs,
    now,
    config.endurance_window_days,
    config.endurance_fallback_runs,
  );
  let pace = |s: &&SplitRun| s.run.average_pace_sec_per_mile;

  let mut long: Vec<f64> = recent
    .iter()
    .filter(|s| s.run.distance_miles >= config.endurance_long_miles)
    .map(pace)
    .collect();
  if !long.is_empty() {
    long.sort_by(f64::total_cmp);
    return mean(long.into_iter().take(config.endurance_top_runs));
  }

  let medium = recent
    .iter()
    .filter(|s| {
      s.run.distance_miles >= config.endurance_medium_miles
        && s.run.distance_miles < config.endurance_long_miles
    })
    .map(pace);
  mean(medium).or_else(|| mean(recent.iter().map(pace)))
}

fn fatigue_resistance(runs: &[SplitRun<'_>], config: &ReadinessConfig) -> f64 {
  let slowdowns = runs
    .iter()
    .filter(|s| {
      s.run.distance_miles >= config.fatigue_min_miles && s.paces.len() >= config.fatigue_min_splits
    })
    .filter_map(|s| {
      let n = s.paces.len();
      let k = (n / 4).max(2);
      let first = mean(s.paces[..k].iter().copied())?;
      let last = mean(s.paces[n - k..].iter().copied())?;
      Some((last - first) / first)
    });

  let slowdown = mean(slowdowns).unwrap_or(config.default_slowdown);
  (1.0 - slowdown * 5.0).max(0.0)
}

/// Weekly miles and longest long run over the volume window.
fn training_volume(runs: &[SplitRun<'_>], now: DateTime<Utc>, config: &ReadinessConfig) -> (f64, f64) {
  let days = config.volume_window_days;
  let recent: Vec<f64> = runs
    .iter()
    .filter(|s| days_between(s.run.date, now) <= days)
    .map(|s| s.run.distance_miles)
    .collect();
  if recent.is_empty() || days <= 0 {
    return (0.0, 0.0);
  }

  let weekly = recent.iter().sum::<f64>() / (days as f64 / 7.0);
  let max_long = recent
    .iter()
    .copied()
    .filter(|d| *d >= config.long_run_min_miles)
    .reduce(f64::max)
    .or_else(|| recent.iter().copied().reduce(f64::max))
    .unwrap_or(0.0);

  (weekly, max_long)
}

/// ---------------------------------------------------------------------------
/// Formula
/// ---------------------------------------------------------------------------

pub struct Readiness;

impl RaceFormula for Readiness {
  fn kind(&self) -> FormulaKind {
    FormulaKind::Readiness
  }

  fn estimate(&self, ctx: &AnalysisContext<'_>, race: &TargetRace) -> Estimate {
    let Some(scores) = ReadinessScores::compute(ctx.usable_runs(), ctx.now, &ctx.config.readiness)
    else {
      return Estimate::missing("no runs with usable mile splits");
    };

    let pace = scores.pace_for(ReadinessTier::for_distance(race.distance_miles));
    ctx.prediction(self.kind(), race, pace * race.distance_miles)
  }
}
