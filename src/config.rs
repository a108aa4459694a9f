//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

/// Bot configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// How long the join window stays open after a game is started.
    pub join_window: Duration,
    /// Directory holding the prompt pool files (truth.txt, dare.txt, ...).
    pub content_dir: PathBuf,
    /// Port for the stats dashboard server.
    pub dashboard_port: u16,
    /// Access key for `/api/stats`. `None` leaves the endpoint open.
    pub dashboard_key: Option<String>,
}

impl BotConfig {
    /// Build config from `PARTYBOT_*` environment variables, with defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        let join_window_secs: u64 = std::env::var("PARTYBOT_JOIN_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let content_dir = std::env::var("PARTYBOT_CONTENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./content"));

        let dashboard_port: u16 = std::env::var("PARTYBOT_DASHBOARD_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let dashboard_key = std::env::var("PARTYBOT_DASHBOARD_KEY")
            .ok()
            .filter(|s| !s.is_empty());

        Self {
            join_window: Duration::from_secs(join_window_secs),
            content_dir,
            dashboard_port,
            dashboard_key,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            join_window: Duration::from_secs(60),
            content_dir: PathBuf::from("./content"),
            dashboard_port: 8080,
            dashboard_key: None,
        }
    }
}
