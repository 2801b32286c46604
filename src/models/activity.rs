use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
  pub id: i64,
  pub strava_id: String,
  pub name: Option<String>,
  pub activity_type: String,
  pub started_at: DateTime<Utc>,
  pub moving_time_seconds: Option<i64>,
  pub distance_meters: Option<f64>,
  pub elevation_gain_meters: Option<f64>,
  pub average_heartrate: Option<f64>,
  pub max_heartrate: Option<f64>,
  pub raw_json: Option<String>,
  pub splits_fetched_at: Option<DateTime<Utc>>,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SyncState {
  pub id: i64,
  pub source: String,
  pub last_sync_at: Option<DateTime<Utc>>,
  pub access_token: Option<String>,
  pub refresh_token: Option<String>,
  pub token_expires_at: Option<DateTime<Utc>>,
}
