//! Race-time prediction engine
//!
//! Each formula is an interchangeable [`RaceFormula`]. The [`Forecaster`]
//! weighs the run history once per analysis, then asks every formula for an
//! estimate at every target race. The whole pass is a pure function of
//! (runs, now, config): no clock reads, no I/O.

pub mod beckstrand;
pub mod classic;
pub mod confidence;
pub mod matching;
pub mod readiness;
pub mod weighting;

use chrono::{DateTime, Utc};

use crate::analysis::TrainingSnapshot;
use crate::config::PredictionConfig;
use crate::models::{
  DatasetStatus, Estimate, FormulaEstimate, FormulaKind, ForecastReport, Prediction, RaceForecast,
  Run, TargetRace,
};

pub use beckstrand::{Beckstrand, Regime};
pub use classic::{Cameron, Daniels, Riegel};
pub use matching::PersonalRecord;
pub use readiness::Readiness;
pub use weighting::{weigh_runs, WeightedRun, WeightedSet};

/// ---------------------------------------------------------------------------
/// Formula Contract
/// ---------------------------------------------------------------------------

pub trait RaceFormula {
  fn kind(&self) -> FormulaKind;

  /// Predict a finish time for one race, or explain why not.
  fn estimate(&self, ctx: &AnalysisContext<'_>, race: &TargetRace) -> Estimate;
}

pub fn formula_for(kind: FormulaKind) -> Box<dyn RaceFormula> {
  match kind {
    FormulaKind::Beckstrand => Box::new(Beckstrand),
    FormulaKind::Riegel => Box::new(Riegel),
    FormulaKind::Cameron => Box::new(Cameron),
    FormulaKind::Daniels => Box::new(Daniels),
    FormulaKind::Readiness => Box::new(Readiness),
  }
}

/// ---------------------------------------------------------------------------
/// Analysis Context
/// ---------------------------------------------------------------------------

/// Everything a formula may look at during one analysis pass.
pub struct AnalysisContext<'a> {
  pub now: DateTime<Utc>,
  pub config: &'a PredictionConfig,
  /// Usable runs only
  pub runs: Vec<WeightedRun<'a>>,
  pub skipped: usize,
  pub snapshot: TrainingSnapshot,
}

impl<'a> AnalysisContext<'a> {
  pub fn new(runs: &'a [Run], now: DateTime<Utc>, config: &'a PredictionConfig) -> Self {
    let WeightedSet { runs: weighted, skipped } = weigh_runs(runs, now, &config.recency);
    let snapshot = TrainingSnapshot::compute(runs, now, config);
    Self {
      now,
      config,
      runs: weighted,
      skipped,
      snapshot,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.runs.is_empty()
  }

  pub fn personal_record(&self, target_miles: f64) -> Option<PersonalRecord> {
    matching::personal_record(&self.runs, target_miles, self.config.similarity_threshold)
  }

  pub fn usable_runs(&self) -> impl Iterator<Item = &'a Run> + '_ {
    self.runs.iter().map(|w| w.run)
  }

  /// Wrap a finish time with the shared confidence and uncertainty scoring.
  pub fn prediction(&self, formula: FormulaKind, race: &TargetRace, predicted_seconds: f64) -> Estimate {
    if !predicted_seconds.is_finite() || predicted_seconds < 0.0 {
      tracing::warn!(
        formula = %formula,
        race = %race.name,
        predicted_seconds,
        "discarding non-finite prediction"
      );
      return Estimate::missing("prediction was not a finite, non-negative time");
    }

    let target = race.distance_miles;
    let has_pr = self.personal_record(target).is_some();

    Estimate::Predicted(Prediction {
      race: race.clone(),
      formula,
      predicted_seconds,
      pace_seconds_per_mile: predicted_seconds / target,
      confidence_pct: confidence::confidence_score(
        &self.snapshot,
        target,
        has_pr,
        &self.config.confidence,
      ),
      uncertainty_seconds: confidence::uncertainty_seconds(target, &self.config.uncertainty),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Orchestration
/// ---------------------------------------------------------------------------

pub struct Forecaster {
  config: PredictionConfig,
  formulas: Vec<Box<dyn RaceFormula>>,
  races: Vec<TargetRace>,
}

impl Forecaster {
  /// Every formula over the full race catalog
  pub fn new(config: PredictionConfig) -> Self {
    Self {
      config,
      formulas: FormulaKind::ALL.iter().map(|k| formula_for(*k)).collect(),
      races: TargetRace::catalog(),
    }
  }

  pub fn with_formulas(mut self, kinds: &[FormulaKind]) -> Self {
    if !kinds.is_empty() {
      let mut kinds = kinds.to_vec();
      kinds.sort();
      kinds.dedup();
      self.formulas = kinds.into_iter().map(formula_for).collect();
    }
    self
  }

  pub fn with_formula(mut self, formula: Box<dyn RaceFormula>) -> Self {
    self.formulas.push(formula);
    self
  }

  pub fn with_races(mut self, races: Vec<TargetRace>) -> Self {
    self.races = races;
    self
  }

  pub fn config(&self) -> &PredictionConfig {
    &self.config
  }

  pub fn forecast(&self, runs: &[Run], now: DateTime<Utc>) -> ForecastReport {
    let ctx = AnalysisContext::new(runs, now, &self.config);

    if ctx.is_empty() {
      tracing::warn!(
        skipped = ctx.skipped,
        "no usable runs, every race reports insufficient data"
      );
      return ForecastReport {
        generated_at: now,
        dataset: DatasetStatus::Empty,
        runs_used: 0,
        runs_skipped: ctx.skipped,
        snapshot: None,
        races: self
          .races
          .iter()
          .map(|race| RaceForecast {
            race: race.clone(),
            estimates: self
              .formulas
              .iter()
              .map(|f| FormulaEstimate {
                formula: f.kind(),
                estimate: Estimate::missing("insufficient data: no usable runs"),
              })
              .collect(),
          })
          .collect(),
      };
    }

    tracing::info!(
      runs = ctx.runs.len(),
      skipped = ctx.skipped,
      formulas = self.formulas.len(),
      "forecasting race times"
    );

    let races = self
      .races
      .iter()
      .map(|race| RaceForecast {
        race: race.clone(),
        estimates: self
          .formulas
          .iter()
          .map(|formula| {
            let estimate = formula.estimate(&ctx, race);
            if let Estimate::MissingData { reason } = &estimate {
              tracing::debug!(formula = %formula.kind(), race = %race.name, reason = %reason, "no estimate");
            }
            FormulaEstimate {
              formula: formula.kind(),
              estimate,
            }
          })
          .collect(),
      })
      .collect();

    ForecastReport {
      generated_at: now,
      dataset: DatasetStatus::Usable,
      runs_used: ctx.runs.len(),
      runs_skipped: ctx.skipped,
      snapshot: Some(ctx.snapshot.clone()),
      races,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;

  #[test]
  fn test_empty_history_reports_missing_data_for_every_race() {
    let now = fixed_now();
    let report = Forecaster::new(PredictionConfig::default()).forecast(&[], now);

    assert_eq!(report.dataset, DatasetStatus::Empty);
    assert_eq!(report.races.len(), 8);
    for race in &report.races {
      assert_eq!(race.estimates.len(), FormulaKind::ALL.len());
      assert!(race.estimates.iter().all(|e| e.estimate.is_missing()));
    }
  }

  #[test]
  fn test_all_malformed_history_is_degenerate() {
    let now = fixed_now();
    let runs = vec![mock_run(now, 3, 0.0, 480.0), mock_run(now, 4, 5.0, 0.0)];

    let report = Forecaster::new(PredictionConfig::default()).forecast(&runs, now);

    assert_eq!(report.dataset, DatasetStatus::Empty);
    assert_eq!(report.runs_skipped, 2);
    assert!(report.snapshot.is_none());
  }

  #[test]
  fn test_forecast_is_idempotent() {
    let now = fixed_now();
    let runs = mock_training_history(now);
    let forecaster = Forecaster::new(PredictionConfig::default());

    let first = serde_json::to_string(&forecaster.forecast(&runs, now)).unwrap();
    let second = serde_json::to_string(&forecaster.forecast(&runs, now)).unwrap();

    assert_eq!(first, second);
  }

  #[test]
  fn test_predictions_are_non_negative_and_confidence_bounded() {
    let now = fixed_now();
    let runs = mock_training_history(now);

    let report = Forecaster::new(PredictionConfig::default()).forecast(&runs, now);

    assert_eq!(report.dataset, DatasetStatus::Usable);
    for race in &report.races {
      for entry in &race.estimates {
        if let Some(p) = entry.estimate.prediction() {
          assert!(p.predicted_seconds >= 0.0);
          assert!(p.confidence_pct <= 100);
          assert!(p.uncertainty_seconds > 0.0);
        }
      }
    }
  }

  #[test]
  fn test_with_formulas_selects_and_dedups() {
    let now = fixed_now();
    let runs = mock_training_history(now);

    let report = Forecaster::new(PredictionConfig::default())
      .with_formulas(&[FormulaKind::Riegel, FormulaKind::Beckstrand, FormulaKind::Riegel])
      .forecast(&runs, now);

    let kinds: Vec<FormulaKind> = report.races[0].estimates.iter().map(|e| e.formula).collect();
    assert_eq!(kinds, vec![FormulaKind::Beckstrand, FormulaKind::Riegel]);
  }

  struct FixedPace(f64);

  impl RaceFormula for FixedPace {
    fn kind(&self) -> FormulaKind {
      FormulaKind::Daniels
    }

    fn estimate(&self, ctx: &AnalysisContext<'_>, race: &TargetRace) -> Estimate {
      ctx.prediction(self.kind(), race, self.0 * race.distance_miles)
    }
  }

  #[test]
  fn test_custom_formula_plugs_into_orchestration() {
    let now = fixed_now();
    let runs = mock_training_history(now);

    let report = Forecaster::new(PredictionConfig::default())
      .with_formulas(&[FormulaKind::Beckstrand])
      .with_formula(Box::new(FixedPace(600.0)))
      .with_races(vec![TargetRace::new("10 Mile", 10.0)])
      .forecast(&runs, now);

    let estimate = report.races[0].estimate(FormulaKind::Daniels).unwrap();
    let prediction = estimate.prediction().unwrap();
    assert_eq!(prediction.predicted_seconds, 6000.0);
    assert_eq!(prediction.pace_seconds_per_mile, 600.0);
  }

  #[test]
  fn test_non_finite_prediction_becomes_missing() {
    let now = fixed_now();
    let runs = mock_training_history(now);
    let config = PredictionConfig::default();
    let ctx = AnalysisContext::new(&runs, now, &config);

    let race = TargetRace::new("Mile", 1.0);
    assert!(ctx.prediction(FormulaKind::Riegel, &race, f64::NAN).is_missing());
    assert!(ctx.prediction(FormulaKind::Riegel, &race, -1.0).is_missing());
  }
}
