use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::config::PredictionConfig;
use crate::db::Store;
use crate::error::AppError;
use crate::loader::{load_runs_from_file, LoadedRuns};
use crate::models::{FormulaKind, ForecastReport};
use crate::prediction::Forecaster;
use crate::report::{self, OutputFormat};

#[derive(Debug, Clone, Default)]
pub struct PredictOptions {
  /// JSON run file; the store is used when absent
  pub runs_file: Option<PathBuf>,
  pub config_file: Option<PathBuf>,
  /// Empty means every formula
  pub formulas: Vec<FormulaKind>,
  pub now: Option<DateTime<Utc>>,
  pub format: OutputFormat,
  pub output: Option<PathBuf>,
}

/// RFC 3339 timestamp for `--now`.
pub fn parse_now(text: &str) -> Result<DateTime<Utc>, AppError> {
  DateTime::parse_from_rfc3339(text)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| AppError::InvalidArgument(format!("--now '{}': {}", text, e)))
}

pub async fn predict(db_path: &Path, options: &PredictOptions) -> Result<(), AppError> {
  let loaded = match &options.runs_file {
    Some(path) => load_runs_from_file(path)?,
    None => {
      let store = Store::open(db_path).await?;
      let loaded = store.load_runs().await?;
      store.close().await;
      loaded
    }
  };

  let report = build_forecast(&loaded, options)?;
  let rendered = report::render(&report, options.format)?;
  write_output(&rendered, options.output.as_deref())
}

/// Run the engine over already-loaded runs. Records dropped while loading
/// count towards `runs_skipped`.
pub fn build_forecast(loaded: &LoadedRuns, options: &PredictOptions) -> Result<ForecastReport, AppError> {
  let config = match &options.config_file {
    Some(path) => PredictionConfig::from_file(path)?,
    None => PredictionConfig::default(),
  };
  let now = options.now.unwrap_or_else(Utc::now);

  let mut report = Forecaster::new(config)
    .with_formulas(&options.formulas)
    .forecast(&loaded.runs, now);
  report.runs_skipped += loaded.skipped;
  Ok(report)
}

/// Write to `output`, or stdout when absent.
pub fn write_output(text: &str, output: Option<&Path>) -> Result<(), AppError> {
  match output {
    Some(path) => {
      std::fs::write(path, text).map_err(|source| AppError::Write {
        path: path.to_path_buf(),
        source,
      })?;
      tracing::info!(path = %path.display(), "wrote report");
    }
    None => print!("{}", text),
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::DatasetStatus;
  use crate::test_utils::*;

  #[test]
  fn test_parse_now() {
    assert_eq!(parse_now("2025-06-01T12:00:00Z").unwrap(), fixed_now());
    assert_eq!(parse_now("2025-06-01T14:00:00+02:00").unwrap(), fixed_now());
    assert!(matches!(parse_now("June 1st"), Err(AppError::InvalidArgument(_))));
  }

  #[test]
  fn test_build_forecast_counts_loader_skips() {
    // Arrange
    let now = fixed_now();
    let loaded = LoadedRuns {
      runs: mock_training_history(now),
      skipped: 3,
    };
    let options = PredictOptions {
      formulas: vec![FormulaKind::Riegel],
      now: Some(now),
      ..PredictOptions::default()
    };

    // Act
    let report = build_forecast(&loaded, &options).unwrap();

    // Assert
    assert_eq!(report.dataset, DatasetStatus::Usable);
    assert_eq!(report.runs_skipped, 3);
    assert_eq!(report.generated_at, now);
    assert!(report
      .races
      .iter()
      .all(|r| r.estimates.len() == 1 && r.estimates[0].formula == FormulaKind::Riegel));
  }

  #[test]
  fn test_build_forecast_rejects_bad_config_file() {
    let dir = std::env::temp_dir().join(format!("race-forecast-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("bad.json");
    std::fs::write(&path, r#"{"long_pool_size": 0}"#).unwrap();

    let options = PredictOptions {
      config_file: Some(path),
      now: Some(fixed_now()),
      ..PredictOptions::default()
    };
    let result = build_forecast(&LoadedRuns::default(), &options);

    assert!(matches!(result, Err(AppError::Config(_))));
    std::fs::remove_dir_all(&dir).ok();
  }

  #[tokio::test]
  async fn test_predict_from_run_file_writes_json() {
    // Arrange
    let dir = std::env::temp_dir().join(format!("race-forecast-predict-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let runs = dir.join("runs.json");
    let output = dir.join("report.json");
    std::fs::write(
      &runs,
      r#"[
        {"date": "2025-05-20", "distance_miles": 6.2, "average_pace": "8:00",
         "mile_splits": ["8:05", "8:00", "7:58", "8:01", "7:59", "7:57"]},
        {"date": "2025-05-25", "distance_miles": 10.0, "average_pace": "8:30"},
        {"date": "2025-05-27", "distance_miles": 3.1, "average_pace": "N/A"}
      ]"#,
    )
    .unwrap();
    let options = PredictOptions {
      runs_file: Some(runs),
      now: Some(fixed_now()),
      format: OutputFormat::Json,
      output: Some(output.clone()),
      ..PredictOptions::default()
    };

    // Act
    predict(&dir.join("unused.db"), &options).await.unwrap();

    // Assert
    let json: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["dataset"], "usable");
    assert_eq!(json["runs_used"], 2);
    assert_eq!(json["runs_skipped"], 1);
    assert!(!dir.join("unused.db").exists());
    std::fs::remove_dir_all(&dir).ok();
  }

  #[tokio::test]
  async fn test_predict_with_empty_store_reports_empty_dataset() {
    let dir = std::env::temp_dir().join(format!("race-forecast-empty-{}", std::process::id()));
    let output = dir.join("report.txt");
    let options = PredictOptions {
      now: Some(fixed_now()),
      output: Some(output.clone()),
      ..PredictOptions::default()
    };

    predict(&dir.join("runs.db"), &options).await.unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("NO USABLE RUNS"));
    std::fs::remove_dir_all(&dir).ok();
  }
}
