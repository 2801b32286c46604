use std::path::Path;

use crate::db::Store;
use crate::error::AppError;
use crate::report::OutputFormat;
use crate::summary::{render_text, summarize, ActivitySummary};

pub async fn load_summary(store: &Store) -> Result<ActivitySummary, AppError> {
  let activities = store.load_activities().await?;
  tracing::debug!(count = activities.len(), "summarizing stored activities");
  Ok(summarize(&activities))
}

pub fn render_summary(summary: &ActivitySummary, format: OutputFormat) -> Result<String, AppError> {
  match format {
    OutputFormat::Text => Ok(render_text(summary)),
    OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
  }
}

pub async fn summary(db_path: &Path, format: OutputFormat) -> Result<(), AppError> {
  let store = Store::open(db_path).await?;
  let summary = load_summary(&store).await?;
  store.close().await;

  print!("{}", render_summary(&summary, format)?);
  Ok(())
}
