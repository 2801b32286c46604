//! Race-time predictions from a Strava running history.
//!
//! Activities are synced from Strava into SQLite, normalized into [`models::Run`]
//! records and fed to the prediction engine in [`prediction`], which estimates
//! finish times for a catalog of target races with several formulas.

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod analysis;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod models;
pub mod prediction;
pub mod report;
pub mod splits;
pub mod strava;
pub mod summary;
