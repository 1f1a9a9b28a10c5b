//! Runtime configuration read from the environment.
//!
//! | Variable                     | Default                 |
//! |------------------------------|-------------------------|
//! | `LISBON_SCOUT_API_URL`       | `http://localhost:8000` |
//! | `LISBON_SCOUT_EMAIL`         | unset                   |
//! | `LISBON_SCOUT_PASSWORD`      | unset                   |
//! | `LISBON_SCOUT_TIMEOUT_SECS`  | `30`                    |
//! | `LISBON_SCOUT_POLL_SECS`     | `10`                    |
//! | `LISBON_SCOUT_ACTIVE_POLL_SECS` | `2`                  |
//! | `LISBON_SCOUT_PAGE_SIZE`     | `20`                    |

use std::time::Duration;

use crate::api::Credentials;
use crate::engine::window::DEFAULT_PAGE_SIZE;
use crate::poller::{PollConfig, DEFAULT_ACTIVE_INTERVAL, DEFAULT_INTERVAL};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} is set but {1} is not")]
    Incomplete(&'static str, &'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
    pub poll: PollConfig,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            credentials: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll: PollConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("LISBON_SCOUT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let credentials = match (lookup("LISBON_SCOUT_EMAIL"), lookup("LISBON_SCOUT_PASSWORD")) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete(
                    "LISBON_SCOUT_EMAIL",
                    "LISBON_SCOUT_PASSWORD",
                ))
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete(
                    "LISBON_SCOUT_PASSWORD",
                    "LISBON_SCOUT_EMAIL",
                ))
            }
            (None, None) => None,
        };

        let timeout = secs(
            &lookup,
            "LISBON_SCOUT_TIMEOUT_SECS",
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )?;
        let poll = PollConfig {
            interval: secs(&lookup, "LISBON_SCOUT_POLL_SECS", DEFAULT_INTERVAL)?,
            active_interval: secs(
                &lookup,
                "LISBON_SCOUT_ACTIVE_POLL_SECS",
                DEFAULT_ACTIVE_INTERVAL,
            )?,
        };

        let page_size = match lookup("LISBON_SCOUT_PAGE_SIZE") {
            Some(raw) => parse_positive(&raw).ok_or(ConfigError::Invalid {
                var: "LISBON_SCOUT_PAGE_SIZE",
                expected: "a positive integer",
                value: raw,
            })? as usize,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            api_url,
            credentials,
            timeout,
            poll,
            page_size,
        })
    }
}

fn secs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match lookup(var) {
        Some(raw) => parse_positive(&raw)
            .map(Duration::from_secs)
            .ok_or(ConfigError::Invalid {
                var,
                expected: "a positive number of seconds",
                value: raw,
            }),
        None => Ok(default),
    }
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}
