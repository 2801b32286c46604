//! Activity totals per type and per calendar month

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::run::METERS_TO_MILES;
use crate::models::Activity;
use crate::splits::format_pace;

const METERS_TO_FEET: f64 = 3.28084;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
  pub count: usize,
  pub distance_miles: f64,
  pub moving_hours: f64,
  pub elevation_feet: f64,
  /// None for zero distance
  pub average_pace_seconds_per_mile: Option<f64>,
  /// Mean over activities that recorded heart rate
  pub average_heartrate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthTotals {
  /// e.g. "January 2025"
  pub month: String,
  pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
  pub activity_type: String,
  pub totals: Totals,
  /// Chronological
  pub months: Vec<MonthTotals>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
  pub types: Vec<TypeSummary>,
}

#[derive(Debug, Default)]
struct Accumulator {
  count: usize,
  meters: f64,
  seconds: f64,
  elevation_meters: f64,
  heartrate_sum: f64,
  heartrate_count: usize,
}

impl Accumulator {
  fn add(&mut self, activity: &Activity) {
    self.count += 1;
    self.meters += activity.distance_meters.unwrap_or(0.0);
    self.seconds += activity.moving_time_seconds.unwrap_or(0) as f64;
    self.elevation_meters += activity.elevation_gain_meters.unwrap_or(0.0);
    if let Some(hr) = activity.average_heartrate {
      self.heartrate_sum += hr;
      self.heartrate_count += 1;
    }
  }

  fn totals(&self) -> Totals {
    let distance_miles = self.meters * METERS_TO_MILES;
    Totals {
      count: self.count,
      distance_miles,
      moving_hours: self.seconds / 3600.0,
      elevation_feet: self.elevation_meters * METERS_TO_FEET,
      average_pace_seconds_per_mile: (distance_miles > 0.0).then(|| self.seconds / distance_miles),
      average_heartrate: (self.heartrate_count > 0)
        .then(|| self.heartrate_sum / self.heartrate_count as f64),
    }
  }
}

pub fn summarize(activities: &[Activity]) -> ActivitySummary {
  let mut by_type: BTreeMap<&str, (Accumulator, BTreeMap<(i32, u32), Accumulator>)> = BTreeMap::new();

  for activity in activities {
    let (overall, months) = by_type.entry(activity.activity_type.as_str()).or_default();
    overall.add(activity);

    let started = activity.started_at;
    months
      .entry((started.year(), started.month()))
      .or_default()
      .add(activity);
  }

  let types = by_type
    .into_iter()
    .map(|(activity_type, (overall, months))| TypeSummary {
      activity_type: activity_type.to_string(),
      totals: overall.totals(),
      months: months
        .into_iter()
        .map(|((year, month), acc)| MonthTotals {
          month: month_label(year, month),
          totals: acc.totals(),
        })
        .collect(),
    })
    .collect();

  ActivitySummary { types }
}

fn month_label(year: i32, month: u32) -> String {
  chrono::NaiveDate::from_ymd_opt(year, month, 1)
    .map(|d| d.format("%B %Y").to_string())
    .unwrap_or_else(|| format!("{}-{:02}", year, month))
}

/// `h:mm h`, rounded to the minute
fn format_hours(hours: f64) -> String {
  let minutes = (hours * 60.0).round() as u64;
  format!("{}:{:02} h", minutes / 60, minutes % 60)
}

fn totals_line(t: &Totals) -> String {
  format!(
    "{} activities, {:.2} mi, {}, pace {}, {:.1} ft, HR {}",
    t.count,
    t.distance_miles,
    format_hours(t.moving_hours),
    t.average_pace_seconds_per_mile
      .map(|p| format!("{} min/mile", format_pace(p)))
      .unwrap_or_else(|| "N/A".to_string()),
    t.elevation_feet,
    t.average_heartrate
      .map(|hr| format!("{:.1} bpm", hr))
      .unwrap_or_else(|| "N/A".to_string()),
  )
}

pub fn render_text(summary: &ActivitySummary) -> String {
  let mut out = String::new();
  if summary.types.is_empty() {
    out.push_str("No activities stored. Run `race-forecast sync` first.\n");
    return out;
  }

  for t in &summary.types {
    out.push_str(&format!("{}: {}\n", t.activity_type, totals_line(&t.totals)));
    for m in &t.months {
      out.push_str(&format!("  {:<16} {}\n", m.month, totals_line(&m.totals)));
    }
    out.push('\n');
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;
  use chrono::{TimeZone, Utc};

  #[test]
  fn test_summarize_by_type_and_month() {
    // Arrange
    let jan = Utc.with_ymd_and_hms(2025, 1, 15, 7, 0, 0).unwrap();
    let feb = Utc.with_ymd_and_hms(2025, 2, 3, 7, 0, 0).unwrap();
    let dec = Utc.with_ymd_and_hms(2024, 12, 30, 7, 0, 0).unwrap();
    let activities = vec![
      mock_activity("Run", jan, 5000.0, 1500, Some(150.0)),
      mock_activity("Run", feb, 10000.0, 3000, None),
      mock_activity("Run", dec, 5000.0, 1500, Some(140.0)),
      mock_activity("Ride", feb, 20000.0, 3600, Some(130.0)),
    ];

    // Act
    let summary = summarize(&activities);

    // Assert: types sorted by name, months chronological across the year boundary
    let names: Vec<&str> = summary.types.iter().map(|t| t.activity_type.as_str()).collect();
    assert_eq!(names, vec!["Ride", "Run"]);

    let run = &summary.types[1];
    assert_eq!(run.totals.count, 3);
    assert_approx_eq!(run.totals.distance_miles, 20000.0 * METERS_TO_MILES, 1e-9);
    assert_approx_eq!(run.totals.moving_hours, 6000.0 / 3600.0, 1e-9);
    assert_eq!(run.totals.average_heartrate, Some(145.0));

    let months: Vec<&str> = run.months.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(months, vec!["December 2024", "January 2025", "February 2025"]);
    assert_eq!(run.months[2].totals.average_heartrate, None);
  }

  #[test]
  fn test_zero_distance_has_no_pace() {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap();
    let activities = vec![mock_activity("WeightTraining", at, 0.0, 2700, None)];

    let summary = summarize(&activities);

    assert!(summary.types[0].totals.average_pace_seconds_per_mile.is_none());
    assert!(render_text(&summary).contains("pace N/A"));
  }

  #[test]
  fn test_render_text() {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap();
    let summary = summarize(&[mock_activity("Run", at, 8046.7, 2400, Some(150.0))]);

    let text = render_text(&summary);

    assert!(text.starts_with("Run: 1 activities, 5.00 mi, 0:40 h, pace 8:00 min/mile"));
    assert!(text.contains("March 2025"));
    assert!(render_text(&summarize(&[])).contains("No activities"));
  }
}
