use std::path::PathBuf;

use crate::config::ConfigError;
use crate::db::StoreError;
use crate::loader::LoadError;
use crate::strava::StravaError;

/// Everything a CLI command can fail with. Subsystem errors convert via `From`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("{0}")]
  Strava(#[from] StravaError),

  #[error("{0}")]
  Store(#[from] StoreError),

  #[error("{0}")]
  Load(#[from] LoadError),

  #[error("{0}")]
  Config(#[from] ConfigError),

  #[error("Failed to serialize output: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),
}
