use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AppConfig;
use crate::db::Store;
use crate::error::AppError;
use crate::models::MileSplit;
use crate::strava::{
  build_auth_url, exchange_code_for_tokens, refresh_tokens, wait_for_callback, StravaClient,
  StravaConfig, StravaError, StravaTokens,
};

const CALLBACK_TIMEOUT_SECONDS: u64 = 120;

/// ---------------------------------------------------------------------------
/// OAuth Flow
/// ---------------------------------------------------------------------------

/// Print the authorization URL, wait for the browser redirect, exchange the
/// code and store the tokens.
pub async fn authenticate(store: &Store) -> Result<(), AppError> {
  let config = StravaConfig::from_env()?;
  let auth_url = build_auth_url(&config)?;

  println!("Open this URL in your browser to authorize Strava access:\n");
  println!("  {}\n", auth_url);
  println!("Waiting up to {} seconds for the redirect...", CALLBACK_TIMEOUT_SECONDS);

  // The listener blocks, keep it off the runtime threads
  let code = tokio::task::spawn_blocking(|| wait_for_callback(CALLBACK_TIMEOUT_SECONDS))
    .await
    .map_err(|e| StravaError::Server(e.to_string()))??;

  let tokens = exchange_code_for_tokens(&config, &code).await?;
  store.save_tokens(&tokens).await?;

  tracing::info!(expires_at = %tokens.expires_at, "Strava OAuth completed");
  println!("Strava connected.");
  Ok(())
}

pub async fn disconnect(store: &Store) -> Result<(), AppError> {
  store.clear_tokens().await?;
  tracing::info!("Strava tokens cleared");
  println!("Strava disconnected.");
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Access Tokens
/// ---------------------------------------------------------------------------

/// A usable access token: the `STRAVA_ACCESS_TOKEN` override when set,
/// otherwise the stored token, refreshed when close to expiry.
pub async fn get_valid_access_token(store: &Store, app_config: &AppConfig) -> Result<String, AppError> {
  if let Some(token) = &app_config.strava_access_token {
    tracing::debug!("using STRAVA_ACCESS_TOKEN override");
    return Ok(token.clone());
  }

  let tokens = store.load_tokens().await?.ok_or(StravaError::NotAuthenticated)?;
  if !tokens.needs_refresh() {
    return Ok(tokens.access_token);
  }

  let config = StravaConfig::from_env()?;
  let tokens = refresh_stored_tokens(store, &config, &tokens, Utc::now()).await?;
  Ok(tokens.access_token)
}

/// Refresh `tokens` when they expire within the buffer at `now`, persisting
/// the new pair.
pub async fn refresh_stored_tokens(
  store: &Store,
  config: &StravaConfig,
  tokens: &StravaTokens,
  now: DateTime<Utc>,
) -> Result<StravaTokens, AppError> {
  if !tokens.needs_refresh_at(now) {
    return Ok(tokens.clone());
  }

  let fresh = refresh_tokens(config, &tokens.refresh_token).await?;
  store.save_tokens(&fresh).await?;
  tracing::info!(expires_at = %fresh.expires_at, "Strava tokens auto-refreshed");
  Ok(fresh)
}

/// ---------------------------------------------------------------------------
/// Activity Sync
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncResult {
  pub new_activities: usize,
  pub total_fetched: usize,
  /// Runs whose mile splits were stored this sync
  pub runs_with_splits: usize,
  /// Runs whose streams could not be fetched; retried next sync
  pub split_failures: usize,
}

/// Fetch activities newer than the latest stored one, then fetch mile splits
/// for every stored run still missing them. A stream failure on one run is
/// logged and left for the next sync.
pub async fn sync_activities(
  store: &Store,
  client: &StravaClient,
  per_page: u32,
) -> Result<SyncResult, AppError> {
  let after = store.latest_activity_timestamp().await?;
  let activities = client.fetch_activities(after, per_page).await?;

  let mut result = SyncResult {
    total_fetched: activities.len(),
    ..SyncResult::default()
  };

  for activity in &activities {
    if store.save_activity(activity).await? {
      result.new_activities += 1;
    }
  }

  for (strava_id, distance_meters) in store.runs_missing_splits().await? {
    match fetch_splits(client, strava_id, distance_meters.unwrap_or(0.0)).await {
      Ok(splits) => {
        if splits.is_empty() {
          tracing::debug!(activity_id = strava_id, "no distance streams for run");
        } else {
          result.runs_with_splits += 1;
        }
        store.save_splits(strava_id, &splits).await?;
      }
      Err(e) => {
        tracing::warn!(activity_id = strava_id, error = %e, "failed to fetch splits, will retry");
        result.split_failures += 1;
      }
    }
  }

  store.touch_sync_time(Utc::now()).await?;

  tracing::info!(
    new = result.new_activities,
    fetched = result.total_fetched,
    splits = result.runs_with_splits,
    failures = result.split_failures,
    "Strava sync complete"
  );
  Ok(result)
}

async fn fetch_splits(
  client: &StravaClient,
  strava_id: i64,
  distance_meters: f64,
) -> Result<Vec<MileSplit>, StravaError> {
  let streams = client.fetch_distance_streams(strava_id).await?;
  Ok(streams.mile_splits(distance_meters))
}
