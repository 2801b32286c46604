//! Configuration for the prediction engine and the CLI
//!
//! Every tier boundary, multiplier and variance constant used by the formulas
//! lives here with its empirical default. A JSON file may override any subset.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config file {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("Invalid config JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Invalid recency tiers: {0}")]
  InvalidTiers(String),

  #[error("Invalid config value: {0}")]
  Invalid(String),
}

/// ---------------------------------------------------------------------------
/// Recency Tiers
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyTier {
  /// Inclusive upper bound on days elapsed
  pub max_days: u32,
  pub weight: f64,
}

/// Step-function decay: the first tier whose bound covers `days_ago` wins,
/// anything older gets `floor_weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyTiers {
  pub tiers: Vec<RecencyTier>,
  pub floor_weight: f64,
}

impl Default for RecencyTiers {
  fn default() -> Self {
    Self {
      tiers: vec![
        RecencyTier { max_days: 90, weight: 1.0 },
        RecencyTier { max_days: 180, weight: 0.6 },
        RecencyTier { max_days: 365, weight: 0.3 },
      ],
      floor_weight: 0.1,
    }
  }
}

impl RecencyTiers {
  pub fn new(tiers: Vec<RecencyTier>, floor_weight: f64) -> Result<Self, ConfigError> {
    let scale = Self { tiers, floor_weight };
    scale.validate()?;
    Ok(scale)
  }

  /// Weights must lie in (0, 1] and strictly decrease as bounds grow.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let weights: Vec<f64> = self
      .tiers
      .iter()
      .map(|t| t.weight)
      .chain(std::iter::once(self.floor_weight))
      .collect();

    if weights.iter().any(|w| !(*w > 0.0 && *w <= 1.0)) {
      return Err(ConfigError::InvalidTiers(
        "weights must lie in (0, 1]".into(),
      ));
    }
    if weights.windows(2).any(|w| w[1] >= w[0]) {
      return Err(ConfigError::InvalidTiers(
        "weights must strictly decrease".into(),
      ));
    }
    if self.tiers.windows(2).any(|t| t[1].max_days <= t[0].max_days) {
      return Err(ConfigError::InvalidTiers(
        "day bounds must strictly increase".into(),
      ));
    }
    Ok(())
  }

  /// Weight for a run `days_ago` days old. Negative ages (future-dated runs)
  /// clamp to the floor weight.
  pub fn weight_for(&self, days_ago: i64) -> f64 {
    if days_ago < 0 {
      return self.floor_weight;
    }
    self
      .tiers
      .iter()
      .find(|t| days_ago <= t.max_days as i64)
      .map(|t| t.weight)
      .unwrap_or(self.floor_weight)
  }
}

/// ---------------------------------------------------------------------------
/// Confidence and Uncertainty Tables
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBonus {
  pub min_runs: usize,
  pub bonus: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReachBonus {
  /// Target distance as a multiple of the longest recent run
  pub max_ratio: f64,
  pub bonus: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadBonus {
  pub max_std_seconds: f64,
  pub bonus: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
  pub base: u8,
  pub recent_window_days: i64,
  /// Checked in order; first match wins
  pub volume: Vec<VolumeBonus>,
  pub personal_record_bonus: u8,
  pub reach: Vec<ReachBonus>,
  pub spread_min_runs: usize,
  pub spread: Vec<SpreadBonus>,
}

impl Default for ConfidenceConfig {
  fn default() -> Self {
    Self {
      base: 50,
      recent_window_days: 90,
      volume: vec![
        VolumeBonus { min_runs: 20, bonus: 20 },
        VolumeBonus { min_runs: 10, bonus: 10 },
        VolumeBonus { min_runs: 5, bonus: 5 },
      ],
      personal_record_bonus: 15,
      reach: vec![
        ReachBonus { max_ratio: 1.0, bonus: 15 },
        ReachBonus { max_ratio: 1.3, bonus: 10 },
        ReachBonus { max_ratio: 1.5, bonus: 5 },
      ],
      spread_min_runs: 5,
      spread: vec![
        SpreadBonus { max_std_seconds: 30.0, bonus: 10 },
        SpreadBonus { max_std_seconds: 60.0, bonus: 5 },
      ],
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceTier {
  pub max_miles: f64,
  pub seconds_per_mile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyConfig {
  pub tiers: Vec<VarianceTier>,
  pub beyond_seconds_per_mile: f64,
}

impl Default for UncertaintyConfig {
  fn default() -> Self {
    Self {
      tiers: vec![
        VarianceTier { max_miles: 5.0, seconds_per_mile: 4.0 },
        VarianceTier { max_miles: 15.0, seconds_per_mile: 6.0 },
      ],
      beyond_seconds_per_mile: 10.0,
    }
  }
}

impl UncertaintyConfig {
  pub fn seconds_per_mile(&self, target_miles: f64) -> f64 {
    self
      .tiers
      .iter()
      .find(|t| target_miles <= t.max_miles)
      .map(|t| t.seconds_per_mile)
      .unwrap_or(self.beyond_seconds_per_mile)
  }
}

/// ---------------------------------------------------------------------------
/// Readiness Model
/// ---------------------------------------------------------------------------

/// Windows, cut-offs and targets for the split-based readiness formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
  /// Split paces outside this range are treated as GPS noise
  pub min_split_pace: f64,
  pub max_split_pace: f64,

  pub speed_window_days: i64,
  pub speed_fallback_runs: usize,
  pub speed_max_miles: f64,
  pub speed_top_miles: usize,

  pub endurance_window_days: i64,
  pub endurance_fallback_runs: usize,
  pub endurance_long_miles: f64,
  pub endurance_medium_miles: f64,
  pub endurance_top_runs: usize,

  pub fatigue_min_miles: f64,
  pub fatigue_min_splits: usize,
  pub default_slowdown: f64,

  pub volume_window_days: i64,
  pub weekly_miles_target: f64,
  pub long_run_min_miles: f64,
  pub long_run_target_miles: f64,
  pub ultra_target_miles: f64,
}

impl Default for ReadinessConfig {
  fn default() -> Self {
    Self {
      min_split_pace: 240.0,
      max_split_pace: 1200.0,
      speed_window_days: 60,
      speed_fallback_runs: 20,
      speed_max_miles: 8.0,
      speed_top_miles: 5,
      endurance_window_days: 90,
      endurance_fallback_runs: 30,
      endurance_long_miles: 10.0,
      endurance_medium_miles: 6.0,
      endurance_top_runs: 3,
      fatigue_min_miles: 10.0,
      fatigue_min_splits: 8,
      default_slowdown: 0.05,
      volume_window_days: 90,
      weekly_miles_target: 50.0,
      long_run_min_miles: 13.0,
      long_run_target_miles: 20.0,
      ultra_target_miles: 26.0,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Prediction Config
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
  pub recency: RecencyTiers,

  /// min/max distance ratio for a run to count as "similar", personal
  /// records included
  pub similarity_threshold: f64,
  /// Weight needed to count as a recent effort
  pub recent_weight_min: f64,
  /// Weight needed to anchor a long-race extrapolation
  pub long_weight_min: f64,

  pub sprint_max_miles: f64,
  pub short_max_miles: f64,

  pub sprint_factor: f64,
  pub short_pr_factor: f64,
  pub short_no_pr_factor: f64,
  pub long_exponent: f64,
  pub long_optimism: f64,
  pub long_pool_size: usize,

  /// Cap on predicted time as a fraction of PR time
  pub short_pr_cap: f64,
  pub long_pr_cap: f64,

  pub confidence: ConfidenceConfig,
  pub uncertainty: UncertaintyConfig,

  pub riegel_exponent: f64,
  pub cameron_exponent: f64,
  pub daniels_exponent: f64,
  pub daniels_reference_miles: f64,

  pub readiness: ReadinessConfig,
}

impl Default for PredictionConfig {
  fn default() -> Self {
    Self {
      recency: RecencyTiers::default(),
      similarity_threshold: 0.7,
      recent_weight_min: 0.6,
      long_weight_min: 0.3,
      sprint_max_miles: 1.5,
      short_max_miles: 5.0,
      sprint_factor: 0.95,
      short_pr_factor: 0.99,
      short_no_pr_factor: 0.97,
      long_exponent: 1.05,
      long_optimism: 0.98,
      long_pool_size: 5,
      short_pr_cap: 0.98,
      long_pr_cap: 0.99,
      confidence: ConfidenceConfig::default(),
      uncertainty: UncertaintyConfig::default(),
      riegel_exponent: 1.06,
      cameron_exponent: 1.077,
      daniels_exponent: 0.07,
      daniels_reference_miles: 3.10686,
      readiness: ReadinessConfig::default(),
    }
  }
}

impl PredictionConfig {
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&json)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.recency.validate()?;

    if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
      return Err(ConfigError::Invalid(
        "similarity_threshold must lie in (0, 1]".into(),
      ));
    }
    if self.sprint_max_miles >= self.short_max_miles {
      return Err(ConfigError::Invalid(
        "sprint_max_miles must be below short_max_miles".into(),
      ));
    }
    if self.readiness.min_split_pace >= self.readiness.max_split_pace {
      return Err(ConfigError::Invalid(
        "readiness.min_split_pace must be below max_split_pace".into(),
      ));
    }
    if self.long_pool_size == 0 {
      return Err(ConfigError::Invalid("long_pool_size must be positive".into()));
    }
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Application Config (environment)
/// ---------------------------------------------------------------------------

const DEFAULT_DB_PATH: &str = "race-forecast.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub db_path: PathBuf,
  /// Skips OAuth entirely when set
  pub strava_access_token: Option<String>,
}

impl AppConfig {
  pub fn from_env() -> Self {
    Self {
      db_path: env::var("RACE_FORECAST_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH)),
      strava_access_token: env::var("STRAVA_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty()),
    }
  }
}
