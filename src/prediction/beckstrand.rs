//! Beckstrand race-time heuristic
//!
//! Three distance regimes, each with its own blending policy:
//! - Sprint (≤1.5 mi): a fixed fraction faster than the fastest recent effort
//!   at any distance.
//! - Short (≤5 mi): best similar recent pace or PR pace, with bounded
//!   optimism depending on whether a PR exists.
//! - Long (>5 mi): power-law extrapolation from the distance-closest runs.
//!
//! Whatever the regime, a prediction is never allowed to run away from a
//! demonstrated personal record: it is capped at a small improvement on it.

use serde::{Deserialize, Serialize};

use super::matching::{self, PersonalRecord};
use super::{AnalysisContext, RaceFormula};
use crate::analysis::mean;
use crate::config::PredictionConfig;
use crate::models::{Estimate, FormulaKind, TargetRace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
  Sprint,
  Short,
  Long,
}

impl Regime {
  pub fn for_distance(target_miles: f64, config: &PredictionConfig) -> Self {
    if target_miles <= config.sprint_max_miles {
      Regime::Sprint
    } else if target_miles <= config.short_max_miles {
      Regime::Short
    } else {
      Regime::Long
    }
  }
}

pub struct Beckstrand;

impl RaceFormula for Beckstrand {
  fn kind(&self) -> FormulaKind {
    FormulaKind::Beckstrand
  }

  fn estimate(&self, ctx: &AnalysisContext<'_>, race: &TargetRace) -> Estimate {
    let config = ctx.config;
    let target = race.distance_miles;
    let pr = ctx.personal_record(target);

    let pace = match Regime::for_distance(target, config) {
      Regime::Sprint => sprint_pace(ctx),
      Regime::Short => short_pace(ctx, target, pr.as_ref()),
      Regime::Long => long_pace(ctx, target),
    };

    let pace = match pace {
      Ok(pace) => pace,
      Err(reason) => return Estimate::missing(reason),
    };

    let mut predicted_seconds = pace * target;

    if let Some(pr) = &pr {
      let cap = if target <= config.short_max_miles {
        config.short_pr_cap
      } else {
        config.long_pr_cap
      };
      predicted_seconds = predicted_seconds.min(pr.time_at(target) * cap);
    }

    ctx.prediction(FormulaKind::Beckstrand, race, predicted_seconds)
  }
}

/// Fastest recent pace at any distance, sharpened for an all-out effort.
fn sprint_pace(ctx: &AnalysisContext<'_>) -> Result<f64, String> {
  let config = ctx.config;
  matching::fastest(ctx.runs.iter().filter(|r| r.weight >= config.recent_weight_min))
    .map(|r| r.pace() * config.sprint_factor)
    .ok_or_else(|| "no recent runs to anchor a sprint estimate".to_string())
}

fn short_pace(
  ctx: &AnalysisContext<'_>,
  target: f64,
  pr: Option<&PersonalRecord>,
) -> Result<f64, String> {
  let config = ctx.config;
  let best_match = matching::best_similar(
    &ctx.runs,
    target,
    config.similarity_threshold,
    config.recent_weight_min,
  )
  .map(|r| r.pace());
  let pr_pace = pr.map(|p| p.pace_seconds_per_mile);

  let base = match (best_match, pr_pace) {
    (Some(recent), Some(record)) => recent.min(record),
    (None, Some(record)) => record,
    (Some(recent), None) => recent,
    (None, None) => top_quartile_recent_pace(ctx)
      .ok_or_else(|| "no similar or recent runs for a short-race estimate".to_string())?,
  };

  let factor = if pr.is_some() {
    config.short_pr_factor
  } else {
    config.short_no_pr_factor
  };

  Ok(base * factor)
}

/// Mean of the fastest quarter (at least one) of recent paces.
fn top_quartile_recent_pace(ctx: &AnalysisContext<'_>) -> Option<f64> {
  let mut paces: Vec<f64> = ctx
    .runs
    .iter()
    .filter(|r| r.weight >= ctx.config.recent_weight_min)
    .map(|r| r.pace())
    .collect();
  paces.sort_by(f64::total_cmp);

  let take = (paces.len() / 4).max(1);
  mean(paces.into_iter().take(take))
}

fn long_pace(ctx: &AnalysisContext<'_>, target: f64) -> Result<f64, String> {
  let config = ctx.config;
  let pool = matching::closest_runs(&ctx.runs, target, config.long_weight_min, config.long_pool_size);

  let anchor = pool
    .first()
    .ok_or_else(|| "no runs within the last year to extrapolate from".to_string())?;
  let best = matching::fastest(pool.iter().copied())
    .map(|r| r.pace())
    .unwrap_or_else(|| anchor.pace());

  let scaling = (target / anchor.distance()).powf(config.long_exponent);
  Ok(best * scaling * config.long_optimism)
}
