//! Textbook race-time formulas
//!
//! Riegel and Cameron extrapolate the longest run on record with a power
//! law. Daniels scales the fastest pace on record from a 5K reference.
//! None of them look at recency.

use super::{AnalysisContext, RaceFormula};
use crate::models::{Estimate, FormulaKind, TargetRace};

/// T2 = T1 × (D2 / D1)^exponent, anchored on the longest run.
fn scale_longest_run(
  ctx: &AnalysisContext<'_>,
  kind: FormulaKind,
  race: &TargetRace,
  exponent: f64,
) -> Estimate {
  let Some(longest) = ctx
    .usable_runs()
    .reduce(|a, b| if b.distance_miles > a.distance_miles { b } else { a })
  else {
    return Estimate::missing("no runs with a distance to extrapolate from");
  };

  let predicted =
    longest.total_seconds() * (race.distance_miles / longest.distance_miles).powf(exponent);
  ctx.prediction(kind, race, predicted)
}

pub struct Riegel;

impl RaceFormula for Riegel {
  fn kind(&self) -> FormulaKind {
    FormulaKind::Riegel
  }

  fn estimate(&self, ctx: &AnalysisContext<'_>, race: &TargetRace) -> Estimate {
    scale_longest_run(ctx, self.kind(), race, ctx.config.riegel_exponent)
  }
}

pub struct Cameron;

impl RaceFormula for Cameron {
  fn kind(&self) -> FormulaKind {
    FormulaKind::Cameron
  }

  fn estimate(&self, ctx: &AnalysisContext<'_>, race: &TargetRace) -> Estimate {
    scale_longest_run(ctx, self.kind(), race, ctx.config.cameron_exponent)
  }
}

/// Jack Daniels-style pace scaling from the fastest recorded pace.
pub struct Daniels;

impl RaceFormula for Daniels {
  fn kind(&self) -> FormulaKind {
    FormulaKind::Daniels
  }

  fn estimate(&self, ctx: &AnalysisContext<'_>, race: &TargetRace) -> Estimate {
    let config = ctx.config;
    let Some(fastest) = ctx
      .usable_runs()
      .map(|r| r.average_pace_sec_per_mile)
      .reduce(f64::min)
    else {
      return Estimate::missing("no runs with a recorded pace");
    };

    let pace = fastest
      * (race.distance_miles / config.daniels_reference_miles).powf(config.daniels_exponent);
    ctx.prediction(self.kind(), race, pace * race.distance_miles)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PredictionConfig;
  use crate::test_utils::*;

  #[test]
  fn test_riegel_and_cameron_extrapolate_longest_run() {
    // Arrange: longest run 10 mi at 9:00/mi = 5400 s
    let now = fixed_now();
    let runs = vec![mock_run(now, 3, 10.0, 540.0), mock_run(now, 8, 3.0, 450.0)];
    let config = PredictionConfig::default();
    let ctx = AnalysisContext::new(&runs, now, &config);
    let race = TargetRace::find("Marathon").unwrap();

    // Act
    let riegel = Riegel.estimate(&ctx, &race).prediction().cloned().unwrap();
    let cameron = Cameron.estimate(&ctx, &race).prediction().cloned().unwrap();

    // Assert
    let ratio = 26.2188f64 / 10.0;
    assert_approx_eq!(riegel.predicted_seconds, 5400.0 * ratio.powf(1.06), 1e-6);
    assert_approx_eq!(cameron.predicted_seconds, 5400.0 * ratio.powf(1.077), 1e-6);
    assert!(cameron.predicted_seconds > riegel.predicted_seconds);
  }

  #[test]
  fn test_daniels_scales_fastest_pace() {
    let now = fixed_now();
    let runs = vec![mock_run(now, 3, 10.0, 540.0), mock_run(now, 8, 3.0, 450.0)];
    let config = PredictionConfig::default();
    let ctx = AnalysisContext::new(&runs, now, &config);

    // At the reference distance the pace is unchanged
    let five_k = Daniels
      .estimate(&ctx, &TargetRace::find("5K").unwrap())
      .prediction()
      .cloned()
      .unwrap();
    assert_approx_eq!(five_k.pace_seconds_per_mile, 450.0, 1e-9);

    let marathon = Daniels
      .estimate(&ctx, &TargetRace::find("Marathon").unwrap())
      .prediction()
      .cloned()
      .unwrap();
    let expected_pace = 450.0 * (26.2188f64 / 3.10686).powf(0.07);
    assert_approx_eq!(marathon.pace_seconds_per_mile, expected_pace, 1e-6);
  }

  #[test]
  fn test_classic_formulas_ignore_recency() {
    // A single run from years ago still anchors Riegel
    let now = fixed_now();
    let runs = vec![mock_run(now, 1500, 6.0, 500.0)];
    let config = PredictionConfig::default();
    let ctx = AnalysisContext::new(&runs, now, &config);

    let estimate = Riegel.estimate(&ctx, &TargetRace::find("10K").unwrap());
    assert!(!estimate.is_missing());
  }
}
