//! JSON run-file loader for offline analysis
//!
//! Accepts an array of run records, or an object keyed by activity id whose
//! values are run records. A record without an average pace takes the mean
//! of its mile splits. Records that cannot be turned into a usable
//! [`Run`] are logged and counted, never fatal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::mean;
use crate::models::{MileSplit, Run};
use crate::splits::parse_pace;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
  #[error("Failed to read run file {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("Invalid run file JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Run record {index} is malformed: {reason}")]
  Malformed { index: usize, reason: String },
}

/// Runs that passed validation, and how many records were dropped.
#[derive(Debug, Clone, Default)]
pub struct LoadedRuns {
  pub runs: Vec<Run>,
  pub skipped: usize,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RunFile {
  List(Vec<RunRecord>),
  Keyed(BTreeMap<String, RunRecord>),
}

/// Distance as a number, or text like "3.10 miles"
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Miles {
  Number(f64),
  Text(String),
}

impl Miles {
  fn value(&self) -> Option<f64> {
    match self {
      Miles::Number(n) => Some(*n),
      Miles::Text(text) => text.split_whitespace().next()?.parse().ok(),
    }
  }
}

#[derive(Debug, Deserialize)]
struct RunRecord {
  date: Option<String>,
  #[serde(alias = "distance")]
  distance_miles: Option<Miles>,
  average_pace: Option<String>,
  #[serde(default)]
  mile_splits: Vec<String>,
}

pub fn load_runs_from_file(path: &Path) -> Result<LoadedRuns, LoadError> {
  let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let loaded = parse_runs(&json)?;

  tracing::info!(
    path = %path.display(),
    runs = loaded.runs.len(),
    skipped = loaded.skipped,
    "loaded run file"
  );
  Ok(loaded)
}

/// Parse a run file. Only invalid JSON as a whole is an error.
pub fn parse_runs(json: &str) -> Result<LoadedRuns, LoadError> {
  let records = match serde_json::from_str::<RunFile>(json)? {
    RunFile::List(records) => records,
    RunFile::Keyed(records) => records.into_values().collect(),
  };

  let mut loaded = LoadedRuns::default();
  for (index, record) in records.into_iter().enumerate() {
    match to_run(index, record) {
      Ok(run) => loaded.runs.push(run),
      Err(e) => {
        tracing::warn!(error = %e, "skipping run record");
        loaded.skipped += 1;
      }
    }
  }

  loaded.runs.sort_by_key(|r| r.date);
  Ok(loaded)
}

fn to_run(index: usize, record: RunRecord) -> Result<Run, LoadError> {
  let malformed = |reason: &str| LoadError::Malformed {
    index,
    reason: reason.to_string(),
  };

  let date = record
    .date
    .as_deref()
    .and_then(parse_date)
    .ok_or_else(|| malformed("missing or unreadable date"))?;
  let distance = record
    .distance_miles
    .as_ref()
    .and_then(Miles::value)
    .ok_or_else(|| malformed("missing distance"))?;

  let splits: Vec<MileSplit> = record
    .mile_splits
    .iter()
    .filter_map(|s| parse_pace(s))
    .map(MileSplit::full)
    .collect();

  // Split-only files carry no average pace; fall back to the mean split
  let pace = record
    .average_pace
    .as_deref()
    .and_then(parse_pace)
    .or_else(|| mean(splits.iter().map(|s| s.duration_seconds)))
    .ok_or_else(|| malformed("missing average pace and splits"))?;

  let run = Run::new(date, distance, pace).with_splits(splits);
  if !run.is_usable() {
    return Err(malformed("distance and pace must be positive"));
  }
  Ok(run)
}

/// RFC 3339, or a bare `YYYY-MM-DD` taken as midnight UTC.
fn parse_date(text: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
    return Some(dt.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(text, "%Y-%m-%d")
    .ok()?
    .and_hms_opt(0, 0, 0)
    .map(|dt| dt.and_utc())
}
