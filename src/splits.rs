//! Mile-split extraction from Strava distance streams, plus pace and
//! duration formatting shared by the loader and the report.

use crate::models::run::METERS_PER_MILE;
use crate::models::MileSplit;

/// Walk parallel `time` (seconds) and `distance` (meters) samples and emit a
/// split each time the distance crosses the next mile mark.
///
/// An activity shorter than a mile yields a single partial split covering
/// the whole activity. A longer activity's trailing fraction is dropped.
pub fn extract_mile_splits(
  times: &[f64],
  distances: &[f64],
  total_distance_meters: f64,
) -> Vec<MileSplit> {
  if times.is_empty() || distances.is_empty() || times.len() != distances.len() {
    return Vec::new();
  }

  let mut splits = Vec::new();
  let mut mile_index = 1u32;
  let mut last_time = 0.0;

  for (&t, &d) in times.iter().zip(distances) {
    if d >= mile_index as f64 * METERS_PER_MILE {
      splits.push(MileSplit::full(t - last_time));
      last_time = t;
      mile_index += 1;
    }
  }

  let covered_miles = total_distance_meters / METERS_PER_MILE;
  if splits.is_empty() && covered_miles > 0.0 && covered_miles < 1.0 {
    if let Some(&elapsed) = times.last() {
      splits.push(MileSplit {
        duration_seconds: elapsed,
        distance_miles: covered_miles,
      });
    }
  }

  splits
}

/// Parse a pace as seconds per mile.
///
/// Accepts `m:ss`, `m:ss min/mile`, `m:ss/mi` or plain decimal minutes.
/// `N/A` and anything unparseable give `None`.
pub fn parse_pace(text: &str) -> Option<f64> {
  let text = text.trim();
  let text = text
    .strip_suffix("min/mile")
    .or_else(|| text.strip_suffix("/mi"))
    .unwrap_or(text)
    .trim();

  if text.is_empty() || text.eq_ignore_ascii_case("n/a") {
    return None;
  }

  let seconds = match text.split_once(':') {
    Some((minutes, seconds)) => {
      let minutes: u32 = minutes.trim().parse().ok()?;
      let seconds: f64 = seconds.trim().parse().ok()?;
      if !(0.0..60.0).contains(&seconds) {
        return None;
      }
      minutes as f64 * 60.0 + seconds
    }
    None => text.parse::<f64>().ok()? * 60.0,
  };

  (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}

/// `m:ss` with whole seconds truncated.
pub fn format_pace(seconds_per_mile: f64) -> String {
  if !seconds_per_mile.is_finite() || seconds_per_mile < 0.0 {
    return "N/A".to_string();
  }
  let total = seconds_per_mile as u64;
  format!("{}:{:02}", total / 60, total % 60)
}

/// `h:mm:ss` with whole seconds truncated.
pub fn format_duration(seconds: f64) -> String {
  if !seconds.is_finite() || seconds < 0.0 {
    return "N/A".to_string();
  }
  let total = seconds as u64;
  format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
