//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default TCP port the host listens on
pub const DEFAULT_PORT: u16 = 2000;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Port the host binds on all interfaces (the peer connects to it)
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Location of the leaderboard file (host only)
    pub db_path: PathBuf,
    /// Fixed RNG seed for reproducible spawns, entropy when unset
    pub seed: Option<u64>,
    /// Bound on each per-tick receive; unbounded when unset
    pub sync_timeout: Option<Duration>,
    /// Consecutive dropped ticks tolerated before the session is abandoned
    pub max_missed_ticks: u32,
    /// Length of the pre-gameplay countdown
    pub countdown_secs: u32,
    /// Answer for the team name prompt (headless frontend)
    pub team_name: Option<String>,
    /// Answer for the host address prompt (headless frontend)
    pub host_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            db_path: PathBuf::from("database/highscores.json"),
            seed: None,
            sync_timeout: None,
            max_missed_ticks: 300,
            countdown_secs: 3,
            team_name: None,
            host_addr: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            port: parse_var("JAZZ_PORT")?.unwrap_or(defaults.port),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            db_path: env::var("JAZZ_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            seed: parse_var("JAZZ_SEED")?,
            sync_timeout: parse_var::<u64>("SYNC_TIMEOUT_MS")?.map(Duration::from_millis),
            max_missed_ticks: parse_var("MAX_MISSED_TICKS")?.unwrap_or(defaults.max_missed_ticks),
            countdown_secs: parse_var("COUNTDOWN_SECS")?.unwrap_or(defaults.countdown_secs),
            team_name: env::var("TEAM_NAME").ok(),
            host_addr: env::var("HOST_ADDR").ok(),
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = Config::default();
        assert_eq!(config.port, 2000);
        assert_eq!(config.countdown_secs, 3);
        assert!(config.sync_timeout.is_none());
    }

    #[test]
    fn rejects_garbage_numbers() {
        env::set_var("JAZZ_TEST_GARBAGE_PORT", "not-a-port");
        let parsed: Result<Option<u16>, _> = parse_var("JAZZ_TEST_GARBAGE_PORT");
        assert!(matches!(parsed, Err(ConfigError::Invalid("JAZZ_TEST_GARBAGE_PORT"))));
        env::remove_var("JAZZ_TEST_GARBAGE_PORT");
    }
}
