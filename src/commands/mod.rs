//! Entry points behind each CLI subcommand

pub mod predict;
pub mod strava;
pub mod summary;

pub use predict::{parse_now, predict, PredictOptions};
pub use strava::{authenticate, disconnect, get_valid_access_token, sync_activities, SyncResult};
pub use summary::summary;
