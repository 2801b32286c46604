use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use race_forecast_lib::commands::{self, PredictOptions};
use race_forecast_lib::config::AppConfig;
use race_forecast_lib::db::Store;
use race_forecast_lib::error::AppError;
use race_forecast_lib::models::FormulaKind;
use race_forecast_lib::report::OutputFormat;
use race_forecast_lib::strava::StravaClient;

#[derive(Parser)]
#[command(name = "race-forecast", version)]
#[command(about = "Race-time predictions from your Strava running history", long_about = None)]
struct Cli {
  /// SQLite database path (overrides RACE_FORECAST_DB)
  #[arg(long, global = true)]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Connect to Strava through the browser OAuth flow
  Auth {
    /// Forget the stored tokens instead
    #[arg(long)]
    disconnect: bool,
  },
  /// Fetch new activities and their mile splits
  Sync {
    /// Activities requested per page
    #[arg(long, default_value_t = 50)]
    per_page: u32,
  },
  /// Predict race times from stored runs or a JSON run file
  Predict {
    /// JSON run file to analyze instead of the database
    #[arg(long)]
    runs: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// JSON file overriding prediction constants
    #[arg(long)]
    config: Option<PathBuf>,
    /// Formula to run (repeatable, defaults to all)
    #[arg(long = "formula")]
    formulas: Vec<FormulaKind>,
    /// Reference time as RFC 3339 (defaults to the current time)
    #[arg(long)]
    now: Option<String>,
  },
  /// Totals per activity type and month
  Summary {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
  dotenvy::dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let mut app_config = AppConfig::from_env();
  if let Some(db) = cli.db {
    app_config.db_path = db;
  }

  match cli.command {
    Commands::Auth { disconnect } => {
      let store = Store::open(&app_config.db_path).await?;
      if disconnect {
        commands::disconnect(&store).await?;
      } else {
        commands::authenticate(&store).await?;
      }
      store.close().await;
    }

    Commands::Sync { per_page } => {
      let store = Store::open(&app_config.db_path).await?;
      let token = commands::get_valid_access_token(&store, &app_config).await?;
      let client = StravaClient::new(token);

      let result = commands::sync_activities(&store, &client, per_page).await?;
      store.close().await;

      println!(
        "Synced {} new activities ({} fetched, {} runs with splits, {} split failures)",
        result.new_activities, result.total_fetched, result.runs_with_splits, result.split_failures
      );
    }

    Commands::Predict {
      runs,
      format,
      output,
      config,
      formulas,
      now,
    } => {
      let options = PredictOptions {
        runs_file: runs,
        config_file: config,
        formulas,
        now: now.as_deref().map(commands::parse_now).transpose()?,
        format,
        output,
      };
      commands::predict(&app_config.db_path, &options).await?;
    }

    Commands::Summary { format } => {
      commands::summary(&app_config.db_path, format).await?;
    }
  }

  Ok(())
}
