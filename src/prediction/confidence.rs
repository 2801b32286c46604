//! Heuristic confidence and uncertainty attached to every prediction
//!
//! Confidence is a 0-100 reliability rating, not a probability. The
//! uncertainty band is a fixed seconds-per-mile allowance times the race
//! distance, not a statistical interval.

use crate::analysis::TrainingSnapshot;
use crate::config::{ConfidenceConfig, UncertaintyConfig};

pub fn confidence_score(
  snapshot: &TrainingSnapshot,
  target_miles: f64,
  has_personal_record: bool,
  config: &ConfidenceConfig,
) -> u8 {
  let mut score = config.base as i32;

  // Recent volume
  if let Some(tier) = config.volume.iter().find(|t| snapshot.recent_runs >= t.min_runs) {
    score += tier.bonus as i32;
  }

  if has_personal_record {
    score += config.personal_record_bonus as i32;
  }

  // How far past the longest recent run the target reaches
  if let Some(longest) = snapshot.longest_recent_run_miles {
    if let Some(tier) = config
      .reach
      .iter()
      .find(|t| target_miles <= longest * t.max_ratio)
    {
      score += tier.bonus as i32;
    }
  }

  // Pace consistency
  if let Some(std) = snapshot.recent_pace_std_seconds {
    if let Some(tier) = config.spread.iter().find(|t| std < t.max_std_seconds) {
      score += tier.bonus as i32;
    }
  }

  score.clamp(0, 100) as u8
}

pub fn uncertainty_seconds(target_miles: f64, config: &UncertaintyConfig) -> f64 {
  config.seconds_per_mile(target_miles) * target_miles
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PredictionConfig;
  use crate::test_utils::*;

  fn snapshot(recent_runs: usize, longest: Option<f64>, std: Option<f64>) -> TrainingSnapshot {
    TrainingSnapshot {
      recent_runs,
      longest_recent_run_miles: longest,
      recent_pace_std_seconds: std,
      ..mock_snapshot()
    }
  }

  #[test]
  fn test_base_confidence_without_evidence() {
    let config = ConfidenceConfig::default();
    assert_eq!(confidence_score(&snapshot(0, None, None), 3.1, false, &config), 50);
  }

  #[test]
  fn test_confidence_bonuses_accumulate() {
    let config = ConfidenceConfig::default();

    // 12 recent runs (+10), PR (+15), 5K under a 6-mile long run (+15), std 45s (+5)
    let score = confidence_score(&snapshot(12, Some(6.0), Some(45.0)), 3.1, true, &config);
    assert_eq!(score, 95);

    // Half marathon is 13.1/10 = 1.31x the long run: +5 reach tier
    let score = confidence_score(&snapshot(5, Some(10.0), None), 13.1, false, &config);
    assert_eq!(score, 50 + 5 + 5);

    // Marathon beyond 1.5x the long run: no reach bonus
    let score = confidence_score(&snapshot(5, Some(10.0), None), 26.2, false, &config);
    assert_eq!(score, 55);
  }

  #[test]
  fn test_confidence_is_clamped_to_100() {
    let config = ConfidenceConfig {
      base: 90,
      ..ConfidenceConfig::default()
    };
    let score = confidence_score(&snapshot(30, Some(30.0), Some(10.0)), 3.1, true, &config);
    assert_eq!(score, 100);
  }

  #[test]
  fn test_uncertainty_scales_with_distance() {
    let config = PredictionConfig::default().uncertainty;
    assert_approx_eq!(uncertainty_seconds(3.10686, &config), 4.0 * 3.10686, 1e-9);
    assert_approx_eq!(uncertainty_seconds(13.1094, &config), 6.0 * 13.1094, 1e-9);
    assert_approx_eq!(uncertainty_seconds(100.0, &config), 1000.0, 1e-9);
  }
}
