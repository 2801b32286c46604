//! Rendering of a [`ForecastReport`] as a text table or JSON

use crate::analysis::TrainingSnapshot;
use crate::models::{DatasetStatus, Estimate, ForecastReport};
use crate::splits::{format_duration, format_pace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

pub fn render(report: &ForecastReport, format: OutputFormat) -> Result<String, serde_json::Error> {
  match format {
    OutputFormat::Text => Ok(render_text(report)),
    OutputFormat::Json => render_json(report),
  }
}

pub fn render_json(report: &ForecastReport) -> Result<String, serde_json::Error> {
  serde_json::to_string_pretty(report)
}

const RULE_WIDTH: usize = 78;

fn push_line(out: &mut String, text: &str) {
  out.push_str(text);
  out.push('\n');
}

pub fn render_text(report: &ForecastReport) -> String {
  let mut out = String::new();
  let rule = "=".repeat(RULE_WIDTH);

  push_line(&mut out, &rule);
  push_line(&mut out, "RACE TIME PREDICTIONS");
  push_line(&mut out, &rule);
  push_line(
    &mut out,
    &format!("Generated {}", report.generated_at.format("%Y-%m-%d %H:%M UTC")),
  );

  match (&report.dataset, &report.snapshot) {
    (DatasetStatus::Usable, Some(snapshot)) => {
      write_snapshot(&mut out, snapshot, report.runs_used, report.runs_skipped)
    }
    _ => {
      push_line(&mut out, "");
      push_line(&mut out, "!! NO USABLE RUNS !!");
      push_line(
        &mut out,
        &format!(
          "{} record(s) were skipped as malformed. Every race reports insufficient data.",
          report.runs_skipped
        ),
      );
    }
  }

  push_line(&mut out, "");
  push_line(
    &mut out,
    &format!(
      "{:<15} {:<13} {:>9} {:>10} {:>5} {:>9}",
      "Race", "Formula", "Time", "Pace", "Conf", "Range"
    ),
  );
  push_line(&mut out, &"-".repeat(RULE_WIDTH));

  for race in &report.races {
    for (i, entry) in race.estimates.iter().enumerate() {
      let name = if i == 0 { race.race.name.as_str() } else { "" };
      let row = match &entry.estimate {
        Estimate::Predicted(p) => format!(
          "{:<15} {:<13} {:>9} {:>10} {:>4}% {:>9}",
          name,
          entry.formula.label(),
          format_duration(p.predicted_seconds),
          format!("{}/mi", format_pace(p.pace_seconds_per_mile)),
          p.confidence_pct,
          format!("±{:.0}s", p.uncertainty_seconds),
        ),
        Estimate::MissingData { reason } => {
          format!("{:<15} {:<13} N/A ({})", name, entry.formula.label(), reason)
        }
      };
      push_line(&mut out, &row);
    }
  }

  push_line(&mut out, &rule);
  out
}

fn write_snapshot(out: &mut String, s: &TrainingSnapshot, used: usize, skipped: usize) {
  let date = |d: Option<chrono::DateTime<chrono::Utc>>| {
    d.map(|d| d.format("%Y-%m-%d").to_string())
      .unwrap_or_else(|| "?".to_string())
  };

  push_line(
    out,
    &format!(
      "Based on {} runs from {} to {} ({} skipped)",
      used,
      date(s.first_run_at),
      date(s.last_run_at),
      skipped
    ),
  );
  push_line(out, &format!("Total miles: {:.1}", s.total_miles));
  push_line(out, &format!("Longest run: {:.1} mi", s.longest_run_miles));
  push_line(out, "");
  push_line(out, "Recent training:");
  push_line(out, &format!("  Runs (last 90 days): {}", s.recent_runs));
  push_line(
    out,
    &format!("  Weekly mileage (last 90 days): {:.1} mi", s.weekly_miles_recent),
  );
  push_line(
    out,
    &format!("  Weekly mileage (last 30 days): {:.1} mi", s.weekly_miles_30),
  );
  if let Some(longest) = s.longest_recent_run_miles {
    push_line(out, &format!("  Longest recent run: {:.1} mi", longest));
  }
  if let Some(std) = s.recent_pace_std_seconds {
    push_line(out, &format!("  Pace spread: ±{:.0}s/mi", std));
  }
  let trend = (s.fitness_trend - 1.0) * 100.0;
  let sign = if trend > 0.0 { "+" } else { "" };
  push_line(out, &format!("  Fitness trend: {}{:.1}%", sign, trend));
}
