//! Strava OAuth and REST client

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::{Duration as StdDuration, Instant};
use url::Url;

use crate::models::MileSplit;
use crate::splits::extract_mile_splits;

const AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";
const TOKEN_URL: &str = "https://www.strava.com/oauth/token";
pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
const CALLBACK_PORT: u16 = 8765;
const REFRESH_MARGIN_MINUTES: i64 = 5;
const REQUEST_TIMEOUT_SECONDS: u64 = 10;
const POLL_INTERVAL_MS: u64 = 100;

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StravaError {
  #[error("Missing environment variable {0}")]
  MissingConfig(String),

  #[error("Strava request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Strava API returned {status}: {message}")]
  Api { status: u16, message: String },

  #[error("Unexpected Strava response: {0}")]
  Parse(String),

  #[error("Strava authorization failed: {0}")]
  OAuth(String),

  #[error("OAuth callback listener failed: {0}")]
  Server(String),

  #[error("Rate limited by Strava")]
  RateLimited,

  #[error("Not authenticated with Strava")]
  NotAuthenticated,
}

/// ---------------------------------------------------------------------------
/// OAuth
/// ---------------------------------------------------------------------------

/// App credentials plus where the OAuth endpoints live.
#[derive(Debug, Clone)]
pub struct StravaConfig {
  pub client_id: String,
  pub client_secret: String,
  pub redirect_uri: String,
  pub token_url: String,
}

impl StravaConfig {
  pub fn from_env() -> Result<Self, StravaError> {
    let required = |name: &str| env::var(name).map_err(|_| StravaError::MissingConfig(name.to_string()));

    Ok(Self {
      client_id: required("STRAVA_CLIENT_ID")?,
      client_secret: required("STRAVA_CLIENT_SECRET")?,
      redirect_uri: format!("http://localhost:{}/callback", CALLBACK_PORT),
      token_url: TOKEN_URL.to_string(),
    })
  }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
  access_token: String,
  refresh_token: String,
  /// Unix seconds
  expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaTokens {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
}

impl From<TokenGrant> for StravaTokens {
  fn from(grant: TokenGrant) -> Self {
    Self {
      access_token: grant.access_token,
      refresh_token: grant.refresh_token,
      expires_at: DateTime::from_timestamp(grant.expires_at, 0).unwrap_or_else(Utc::now),
    }
  }
}

impl StravaTokens {
  pub fn needs_refresh(&self) -> bool {
    self.needs_refresh_at(Utc::now())
  }

  /// True once `now` is within the refresh margin of expiry.
  pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at - now <= Duration::minutes(REFRESH_MARGIN_MINUTES)
  }
}

pub fn build_auth_url(config: &StravaConfig) -> Result<String, StravaError> {
  let url = Url::parse_with_params(
    AUTHORIZE_URL,
    &[
      ("client_id", config.client_id.as_str()),
      ("redirect_uri", config.redirect_uri.as_str()),
      ("response_type", "code"),
      ("scope", "activity:read_all"),
      ("approval_prompt", "auto"),
    ],
  )
  .map_err(|e| StravaError::OAuth(e.to_string()))?;

  Ok(url.into())
}

pub async fn exchange_code_for_tokens(config: &StravaConfig, code: &str) -> Result<StravaTokens, StravaError> {
  post_token_grant(config, &[("grant_type", "authorization_code"), ("code", code)]).await
}

pub async fn refresh_tokens(config: &StravaConfig, refresh_token: &str) -> Result<StravaTokens, StravaError> {
  post_token_grant(
    config,
    &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
  )
  .await
}

async fn post_token_grant(config: &StravaConfig, grant: &[(&str, &str)]) -> Result<StravaTokens, StravaError> {
  let mut form = vec![
    ("client_id", config.client_id.as_str()),
    ("client_secret", config.client_secret.as_str()),
  ];
  form.extend_from_slice(grant);

  let response = Client::new().post(&config.token_url).form(&form).send().await?;
  let status = response.status();
  if !status.is_success() {
    let body = response.text().await.unwrap_or_default();
    return Err(StravaError::OAuth(format!("token endpoint returned {}: {}", status, body)));
  }

  let grant: TokenGrant = response.json().await?;
  Ok(grant.into())
}

/// Listen on the redirect port until Strava redirects the browser back, and
/// return the authorization code. Blocking.
pub fn wait_for_callback(timeout_seconds: u64) -> Result<String, StravaError> {
  let listener = TcpListener::bind(("127.0.0.1", CALLBACK_PORT))
    .map_err(|e| StravaError::Server(format!("cannot listen on port {}: {}", CALLBACK_PORT, e)))?;
  listener
    .set_nonblocking(true)
    .map_err(|e| StravaError::Server(e.to_string()))?;

  let deadline = Instant::now() + StdDuration::from_secs(timeout_seconds);

  while Instant::now() < deadline {
    match listener.accept() {
      Ok((stream, _)) => {
        if let Some(outcome) = handle_callback(stream) {
          return outcome;
        }
      }
      Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
        std::thread::sleep(StdDuration::from_millis(POLL_INTERVAL_MS));
      }
      Err(e) => return Err(StravaError::Server(e.to_string())),
    }
  }

  Err(StravaError::Server(format!(
    "no authorization received within {} seconds",
    timeout_seconds
  )))
}

/// `None` for requests that are not the OAuth redirect (favicon and such).
fn handle_callback(mut stream: TcpStream) -> Option<Result<String, StravaError>> {
  let mut buffer = [0u8; 2048];
  let read = stream.read(&mut buffer).unwrap_or(0);
  let request = String::from_utf8_lossy(&buffer[..read]);

  let outcome = if let Some(code) = query_param(&request, "code") {
    Ok(code)
  } else if let Some(error) = query_param(&request, "error") {
    Err(StravaError::OAuth(error))
  } else {
    return None;
  };

  let page = match &outcome {
    Ok(_) => callback_page("200 OK", "Connected to Strava. You can close this tab."),
    Err(e) => callback_page("400 Bad Request", &e.to_string()),
  };
  if let Err(e) = stream.write_all(page.as_bytes()).and_then(|_| stream.flush()) {
    tracing::debug!(error = %e, "could not answer OAuth callback");
  }
  Some(outcome)
}

/// Pull a query parameter out of the request line of a `/callback` request.
fn query_param(request: &str, name: &str) -> Option<String> {
  let target = request.lines().next()?.split_whitespace().nth(1)?;
  let (path, query) = target.split_once('?')?;
  if path != "/callback" {
    return None;
  }

  url::form_urlencoded::parse(query.as_bytes())
    .find(|(key, _)| key == name)
    .map(|(_, value)| value.into_owned())
}

fn callback_page(status: &str, message: &str) -> String {
  let html = format!(
    "<!DOCTYPE html><html><head><title>race-forecast</title></head>\
     <body style=\"font-family: system-ui; text-align: center; padding: 50px;\"><p>{}</p></body></html>",
    message
  );
  format!(
    "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
    status,
    html.len(),
    html
  )
}

/// ---------------------------------------------------------------------------
/// API Data Structures
/// ---------------------------------------------------------------------------

/// Activity summary from Strava API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StravaActivity {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  #[serde(rename = "type", default)]
  pub activity_type: String,
  pub start_date: DateTime<Utc>,
  #[serde(default)]
  pub moving_time: Option<i64>,
  #[serde(default)]
  pub distance: Option<f64>,
  #[serde(default)]
  pub total_elevation_gain: Option<f64>,
  #[serde(default)]
  pub average_heartrate: Option<f64>,
  #[serde(default)]
  pub max_heartrate: Option<f64>,
}

/// One stream when requested with key_by_type=true
#[derive(Debug, Clone, Deserialize)]
struct KeyedStream {
  #[serde(default)]
  data: Vec<serde_json::Value>,
}

/// Elapsed-time and cumulative-distance samples of one activity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceStreams {
  /// Seconds since start
  pub time: Vec<f64>,
  /// Meters since start
  pub distance: Vec<f64>,
}

impl DistanceStreams {
  pub fn is_empty(&self) -> bool {
    self.time.is_empty() || self.distance.is_empty()
  }

  pub fn mile_splits(&self, total_distance_meters: f64) -> Vec<MileSplit> {
    extract_mile_splits(&self.time, &self.distance, total_distance_meters)
  }

  fn from_keyed(mut keyed: HashMap<String, KeyedStream>) -> Self {
    let mut numbers = |key: &str| -> Vec<f64> {
      keyed
        .remove(key)
        .map(|s| s.data.iter().filter_map(|v| v.as_f64()).collect())
        .unwrap_or_default()
    };
    Self {
      time: numbers("time"),
      distance: numbers("distance"),
    }
  }
}

/// ---------------------------------------------------------------------------
/// API Client
/// ---------------------------------------------------------------------------

/// How failed API calls are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  pub attempts: u32,
  /// Wait after an HTTP 429
  pub rate_limit_delay: StdDuration,
  /// Wait after any other failure
  pub retry_delay: StdDuration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempts: 3,
      rate_limit_delay: StdDuration::from_secs(15),
      retry_delay: StdDuration::from_secs(5),
    }
  }
}

pub struct StravaClient {
  http: Client,
  base_url: String,
  access_token: String,
  retry: RetryPolicy,
}

impl StravaClient {
  pub fn new(access_token: impl Into<String>) -> Self {
    let http = Client::builder()
      .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECONDS))
      .build()
      .unwrap_or_default();
    Self {
      http,
      base_url: STRAVA_API_BASE.to_string(),
      access_token: access_token.into(),
      retry: RetryPolicy::default(),
    }
  }

  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into().trim_end_matches('/').to_string();
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Fetch every activity after `after` (unix seconds), walking pages until
  /// Strava returns an empty one.
  pub async fn fetch_activities(
    &self,
    after: Option<i64>,
    per_page: u32,
  ) -> Result<Vec<StravaActivity>, StravaError> {
    let mut activities = Vec::new();
    let mut page = 1u32;

    loop {
      let mut query = vec![("per_page", per_page.to_string()), ("page", page.to_string())];
      if let Some(after) = after {
        query.push(("after", after.to_string()));
      }

      let batch: Vec<StravaActivity> = self
        .get_json("/athlete/activities", &query)
        .await?
        .unwrap_or_default();

      tracing::debug!(page, count = batch.len(), "fetched activity page");
      if batch.is_empty() {
        break;
      }
      activities.extend(batch);
      page += 1;
    }

    tracing::info!(count = activities.len(), "fetched activities from Strava");
    Ok(activities)
  }

  /// Time and distance streams for one activity. Manual entries have no
  /// streams and come back empty.
  pub async fn fetch_distance_streams(&self, activity_id: i64) -> Result<DistanceStreams, StravaError> {
    let path = format!("/activities/{}/streams", activity_id);
    let query = [
      ("keys", "time,distance".to_string()),
      ("key_by_type", "true".to_string()),
    ];

    let keyed: Option<HashMap<String, KeyedStream>> = self.get_json(&path, &query).await?;
    Ok(keyed.map(DistanceStreams::from_keyed).unwrap_or_default())
  }

  /// GET with retries. `Ok(None)` on 404.
  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<Option<T>, StravaError> {
    let url = format!("{}{}", self.base_url, path);
    let attempts = self.retry.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
      let result = self
        .http
        .get(&url)
        .bearer_auth(&self.access_token)
        .query(query)
        .send()
        .await;

      let delay = match result {
        Ok(response) => match response.status() {
          StatusCode::UNAUTHORIZED => return Err(StravaError::NotAuthenticated),
          StatusCode::NOT_FOUND => return Ok(None),
          StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!(path, attempt, "rate limited by Strava");
            last_error = Some(StravaError::RateLimited);
            self.retry.rate_limit_delay
          }
          status if status.is_success() => {
            let body = response.text().await?;
            return serde_json::from_str(&body).map(Some).map_err(|e| {
              let preview: String = body.chars().take(500).collect();
              tracing::error!(path, body = %preview, "unexpected Strava response");
              StravaError::Parse(e.to_string())
            });
          }
          status => {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(path, attempt, status = status.as_u16(), "Strava request failed");
            last_error = Some(StravaError::Api {
              status: status.as_u16(),
              message,
            });
            self.retry.retry_delay
          }
        },
        Err(e) => {
          tracing::warn!(path, attempt, error = %e, "Strava request failed");
          last_error = Some(StravaError::Request(e));
          self.retry.retry_delay
        }
      };

      if attempt < attempts {
        tokio::time::sleep(delay).await;
      }
    }

    Err(last_error.unwrap_or(StravaError::RateLimited))
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
