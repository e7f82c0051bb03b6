//! Deployment-time configuration.
//!
//! Read from the environment once at startup. `BOT_TOKEN` and `CHANNEL_ID`
//! double as a kill switch: absence or the literal value `DISABLED` keeps
//! the whole system from initializing. `DEFAULT_TIMEZONE` is the reference
//! zone for canonical slot times and the zone assigned to users who have
//! not chosen their own.

use chrono_tz::Tz;

use crate::error::ConfigError;

/// Sentinel value that disables a credential at deployment time.
const DISABLED: &str = "DISABLED";

/// Fallback reference timezone when DEFAULT_TIMEZONE is unset.
pub const FALLBACK_TIMEZONE: Tz = chrono_tz::Asia::Bangkok;

#[derive(Debug, Clone)]
pub struct Config {
    /// Delivery credential; `None` when disabled.
    pub token: Option<String>,
    /// Fixed broadcast destination; `None` when disabled.
    pub channel_id: Option<String>,
    /// Reference timezone (IANA).
    pub default_timezone: Tz,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            channel_id: None,
            default_timezone: FALLBACK_TIMEZONE,
        }
    }
}

impl Config {
    /// Read configuration from BOT_TOKEN, CHANNEL_ID and DEFAULT_TIMEZONE.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_timezone = match std::env::var("DEFAULT_TIMEZONE") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidTimezone {
                key: "DEFAULT_TIMEZONE".to_string(),
                value,
            })?,
            Err(_) => FALLBACK_TIMEZONE,
        };
        Ok(Self {
            token: read_credential("BOT_TOKEN"),
            channel_id: read_credential("CHANNEL_ID"),
            default_timezone,
        })
    }

    /// Whether the system should initialize at all.
    pub fn enabled(&self) -> bool {
        self.token.is_some() && self.channel_id.is_some()
    }

    /// The reference timezone for canonical slot times.
    pub fn reference_tz(&self) -> Tz {
        self.default_timezone
    }
}

fn read_credential(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if value.is_empty() || value == DISABLED => None,
        Ok(value) => Some(value),
        Err(_) => None,
    }
}
