//! Server configuration parsed from environment variables.

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

/// Configuration errors surfaced at startup. Absent variables never error;
/// only present-but-unparseable values do.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Server configuration, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// TCP port the server binds.
    pub port: u16,
    /// Operation count cap for history reads and join pushes. Bounds the
    /// view, not the log.
    pub history_limit: usize,
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `HISTORY_LIMIT`: default 500
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port(std::env::var("PORT").ok().as_deref())?;
        let history_limit = parse_history_limit(std::env::var("HISTORY_LIMIT").ok().as_deref())?;
        Ok(Self { port, history_limit })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, history_limit: DEFAULT_HISTORY_LIMIT }
    }
}

fn parse_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_PORT);
    };
    raw.parse()
        .map_err(|_| ConfigError::Invalid(format!("PORT '{raw}' is not a valid port number")))
}

fn parse_history_limit(raw: Option<&str>) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_HISTORY_LIMIT);
    };
    raw.parse()
        .map_err(|_| ConfigError::Invalid(format!("HISTORY_LIMIT '{raw}' is not a valid count")))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
