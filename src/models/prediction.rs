use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::race::TargetRace;
use crate::analysis::TrainingSnapshot;

/// ---------------------------------------------------------------------------
/// Formula Kind
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaKind {
  /// Recency-weighted, regime-tiered blend with PR clamping
  Beckstrand,
  /// Longest run extrapolated with exponent 1.06
  Riegel,
  /// Longest run extrapolated with exponent 1.077
  Cameron,
  /// Fastest pace scaled from a 5K reference
  Daniels,
  /// Speed/endurance/fatigue model over mile splits
  Readiness,
}

impl FormulaKind {
  pub const ALL: [FormulaKind; 5] = [
    FormulaKind::Beckstrand,
    FormulaKind::Riegel,
    FormulaKind::Cameron,
    FormulaKind::Daniels,
    FormulaKind::Readiness,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      Self::Beckstrand => "Beckstrand",
      Self::Riegel => "Riegel",
      Self::Cameron => "Cameron",
      Self::Daniels => "Jack Daniels",
      Self::Readiness => "Readiness",
    }
  }
}

impl std::fmt::Display for FormulaKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Beckstrand => write!(f, "beckstrand"),
      Self::Riegel => write!(f, "riegel"),
      Self::Cameron => write!(f, "cameron"),
      Self::Daniels => write!(f, "daniels"),
      Self::Readiness => write!(f, "readiness"),
    }
  }
}

impl std::str::FromStr for FormulaKind {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "beckstrand" => Ok(Self::Beckstrand),
      "riegel" => Ok(Self::Riegel),
      "cameron" => Ok(Self::Cameron),
      "daniels" | "jack_daniels" | "jack-daniels" => Ok(Self::Daniels),
      "readiness" => Ok(Self::Readiness),
      _ => Err(format!("Unknown formula: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Per-race Output
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
  pub race: TargetRace,
  pub formula: FormulaKind,
  pub predicted_seconds: f64,
  pub pace_seconds_per_mile: f64,
  /// Heuristic 0-100 reliability rating, not a probability
  pub confidence_pct: u8,
  /// Half-width of a heuristic ± band, not a statistical interval
  pub uncertainty_seconds: f64,
}

/// A prediction, or the reason one could not be made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Estimate {
  Predicted(Prediction),
  MissingData { reason: String },
}

impl Estimate {
  pub fn missing(reason: impl Into<String>) -> Self {
    Estimate::MissingData {
      reason: reason.into(),
    }
  }

  pub fn prediction(&self) -> Option<&Prediction> {
    match self {
      Estimate::Predicted(p) => Some(p),
      Estimate::MissingData { .. } => None,
    }
  }

  pub fn is_missing(&self) -> bool {
    matches!(self, Estimate::MissingData { .. })
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaEstimate {
  pub formula: FormulaKind,
  pub estimate: Estimate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceForecast {
  pub race: TargetRace,
  pub estimates: Vec<FormulaEstimate>,
}

impl RaceForecast {
  pub fn estimate(&self, formula: FormulaKind) -> Option<&Estimate> {
    self
      .estimates
      .iter()
      .find(|e| e.formula == formula)
      .map(|e| &e.estimate)
  }
}

/// Whether the input contained anything to analyze at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
  Usable,
  /// No usable runs: distinct from per-race missing data
  Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
  pub generated_at: DateTime<Utc>,
  pub dataset: DatasetStatus,
  pub runs_used: usize,
  pub runs_skipped: usize,
  pub snapshot: Option<TrainingSnapshot>,
  pub races: Vec<RaceForecast>,
}

impl ForecastReport {
  pub fn race(&self, name: &str) -> Option<&RaceForecast> {
    self.races.iter().find(|r| r.race.name == name)
  }
}
