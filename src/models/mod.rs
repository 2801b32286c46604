pub mod activity;
pub mod prediction;
pub mod race;
pub mod run;

pub use activity::{Activity, SyncState};
pub use prediction::{
  DatasetStatus, Estimate, FormulaEstimate, FormulaKind, ForecastReport, Prediction, RaceForecast,
};
pub use race::TargetRace;
pub use run::{MileSplit, Run};
