//! SQLite persistence for synced activities, mile splits and OAuth state

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::loader::LoadedRuns;
use crate::models::{Activity, MileSplit, Run, SyncState};
use crate::strava::{StravaActivity, StravaTokens};

const STRAVA_SOURCE: &str = "strava";

pub type DbPool = SqlitePool;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Failed to prepare database directory {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
}

/// ---------------------------------------------------------------------------
/// Store
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Store {
  pool: DbPool,
}

impl Store {
  /// Open (creating if needed) the database file and run migrations.
  pub async fn open(path: &Path) -> Result<Self, StoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
      fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
      })?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", path.display());
    tracing::debug!(path = %path.display(), "opening database");

    let pool = SqlitePoolOptions::new()
      .max_connections(5)
      .connect(&db_url)
      .await?;

    Self::migrate(pool).await
  }

  /// Single-connection in-memory database; each pool connection would
  /// otherwise see its own empty database.
  pub async fn open_in_memory() -> Result<Self, StoreError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await?;

    Self::migrate(pool).await
  }

  async fn migrate(pool: DbPool) -> Result<Self, StoreError> {
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(Self { pool })
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  pub async fn close(self) {
    self.pool.close().await;
  }

  // Activities

  /// Insert an activity unless its Strava id is already stored.
  /// Returns true when a row was inserted.
  pub async fn save_activity(&self, activity: &StravaActivity) -> Result<bool, StoreError> {
    let raw_json = serde_json::to_string(activity).ok();

    let result = sqlx::query(
      r#"
      INSERT INTO activities (
        strava_id, name, activity_type, started_at, moving_time_seconds,
        distance_meters, elevation_gain_meters, average_heartrate,
        max_heartrate, raw_json
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
      ON CONFLICT(strava_id) DO NOTHING
      "#,
    )
    .bind(activity.id.to_string())
    .bind(&activity.name)
    .bind(&activity.activity_type)
    .bind(activity.start_date)
    .bind(activity.moving_time)
    .bind(activity.distance)
    .bind(activity.total_elevation_gain)
    .bind(activity.average_heartrate)
    .bind(activity.max_heartrate)
    .bind(raw_json)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() > 0)
  }

  /// Replace the stored splits of one activity.
  pub async fn save_splits(&self, strava_id: i64, splits: &[MileSplit]) -> Result<(), StoreError> {
    let mut tx = self.pool.begin().await?;

    let activity_id: Option<i64> = sqlx::query_scalar("SELECT id FROM activities WHERE strava_id = ?1")
      .bind(strava_id.to_string())
      .fetch_optional(&mut *tx)
      .await?;
    let Some(activity_id) = activity_id else {
      tracing::warn!(strava_id, "no stored activity for splits");
      return Ok(());
    };

    sqlx::query("DELETE FROM mile_splits WHERE activity_id = ?1")
      .bind(activity_id)
      .execute(&mut *tx)
      .await?;

    for (index, split) in splits.iter().enumerate() {
      sqlx::query(
        r#"
        INSERT INTO mile_splits (activity_id, split_index, duration_seconds, distance_miles)
        VALUES (?1, ?2, ?3, ?4)
        "#,
      )
      .bind(activity_id)
      .bind(index as i64)
      .bind(split.duration_seconds)
      .bind(split.distance_miles)
      .execute(&mut *tx)
      .await?;
    }

    sqlx::query("UPDATE activities SET splits_fetched_at = ?1 WHERE id = ?2")
      .bind(Utc::now())
      .bind(activity_id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(())
  }

  /// Runs whose streams were never fetched, oldest first, as
  /// `(strava_id, distance_meters)`.
  pub async fn runs_missing_splits(&self) -> Result<Vec<(i64, Option<f64>)>, StoreError> {
    let rows = sqlx::query_as(
      r#"
      SELECT CAST(strava_id AS INTEGER), distance_meters
      FROM activities
      WHERE activity_type = 'Run' AND splits_fetched_at IS NULL
      ORDER BY started_at
      "#,
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  /// Start time of the newest stored activity, as unix seconds.
  pub async fn latest_activity_timestamp(&self) -> Result<Option<i64>, StoreError> {
    let timestamp: Option<i64> = sqlx::query_scalar(
      "SELECT CAST(strftime('%s', MAX(started_at)) AS INTEGER) FROM activities",
    )
    .fetch_one(&self.pool)
    .await?;
    Ok(timestamp)
  }

  pub async fn load_activities(&self) -> Result<Vec<Activity>, StoreError> {
    let activities = sqlx::query_as::<_, Activity>(
      r#"
      SELECT id, strava_id, name, activity_type, started_at, moving_time_seconds,
             distance_meters, elevation_gain_meters, average_heartrate, max_heartrate,
             raw_json, splits_fetched_at, created_at
      FROM activities
      ORDER BY started_at
      "#,
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(activities)
  }

  /// Running activities as engine input, with their splits attached.
  pub async fn load_runs(&self) -> Result<LoadedRuns, StoreError> {
    let rows: Vec<(i64, DateTime<Utc>, Option<f64>, Option<i64>)> = sqlx::query_as(
      r#"
      SELECT id, started_at, distance_meters, moving_time_seconds
      FROM activities
      WHERE activity_type = 'Run'
      ORDER BY started_at
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    let mut splits = self.load_splits_by_activity().await?;
    let mut loaded = LoadedRuns::default();

    for (id, started_at, distance, moving_time) in rows {
      let run = match (distance, moving_time) {
        (Some(meters), Some(seconds)) => Run::from_moving_time(started_at, meters, seconds as f64),
        _ => None,
      };
      match run {
        Some(run) => loaded
          .runs
          .push(run.with_splits(splits.remove(&id).unwrap_or_default())),
        None => {
          tracing::debug!(activity_id = id, "run has no usable distance or moving time");
          loaded.skipped += 1;
        }
      }
    }

    Ok(loaded)
  }

  async fn load_splits_by_activity(&self) -> Result<HashMap<i64, Vec<MileSplit>>, StoreError> {
    let rows: Vec<(i64, f64, f64)> = sqlx::query_as(
      r#"
      SELECT activity_id, duration_seconds, distance_miles
      FROM mile_splits
      ORDER BY activity_id, split_index
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    let mut by_activity: HashMap<i64, Vec<MileSplit>> = HashMap::new();
    for (activity_id, duration_seconds, distance_miles) in rows {
      by_activity.entry(activity_id).or_default().push(MileSplit {
        duration_seconds,
        distance_miles,
      });
    }
    Ok(by_activity)
  }

  // Sync State

  pub async fn save_tokens(&self, tokens: &StravaTokens) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO sync_state (source, access_token, refresh_token, token_expires_at)
      VALUES (?1, ?2, ?3, ?4)
      ON CONFLICT(source) DO UPDATE SET
        access_token = excluded.access_token,
        refresh_token = excluded.refresh_token,
        token_expires_at = excluded.token_expires_at
      "#,
    )
    .bind(STRAVA_SOURCE)
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(tokens.expires_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  pub async fn load_tokens(&self) -> Result<Option<StravaTokens>, StoreError> {
    let state = self.load_sync_state().await?;

    Ok(state.and_then(|s| match (s.access_token, s.refresh_token, s.token_expires_at) {
      (Some(access_token), Some(refresh_token), Some(expires_at)) => Some(StravaTokens {
        access_token,
        refresh_token,
        expires_at,
      }),
      _ => None,
    }))
  }

  pub async fn clear_tokens(&self) -> Result<(), StoreError> {
    sqlx::query(
      "UPDATE sync_state SET access_token = NULL, refresh_token = NULL,
         token_expires_at = NULL WHERE source = ?1",
    )
    .bind(STRAVA_SOURCE)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  pub async fn load_sync_state(&self) -> Result<Option<SyncState>, StoreError> {
    let state = sqlx::query_as::<_, SyncState>(
      r#"
      SELECT id, source, last_sync_at, access_token, refresh_token, token_expires_at
      FROM sync_state WHERE source = ?1
      "#,
    )
    .bind(STRAVA_SOURCE)
    .fetch_optional(&self.pool)
    .await?;
    Ok(state)
  }

  pub async fn touch_sync_time(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO sync_state (source, last_sync_at)
      VALUES (?1, ?2)
      ON CONFLICT(source) DO UPDATE SET last_sync_at = excluded.last_sync_at
      "#,
    )
    .bind(STRAVA_SOURCE)
    .bind(at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
