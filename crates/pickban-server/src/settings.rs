//! Process settings read from `PICKBAN_*` environment variables.

use std::time::Duration;

use pickban::{AllowedOrigins, HubConfig};
use pickban_session::SessionConfig;

/// A variable was set but could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Everything `main` needs to start the server.
#[derive(Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: AllowedOrigins,
    pub hub: HubConfig,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset
    /// variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let defaults = HubConfig::default();

        let host = lookup("PICKBAN_HOST")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PICKBAN_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| SettingsError::Invalid {
                var: "PICKBAN_PORT",
                expected: "a port number",
                value: raw,
            })?,
            None => 8080,
        };
        let allowed_origins = lookup("PICKBAN_ALLOWED_ORIGINS")
            .map(|raw| AllowedOrigins::parse(&raw))
            .unwrap_or_default();

        let hub = HubConfig {
            session: SessionConfig {
                reconnect_grace: seconds(
                    &lookup,
                    "PICKBAN_GRACE_SECS",
                    defaults.session.reconnect_grace,
                )?,
            },
            game_duration: seconds(&lookup, "PICKBAN_GAME_SECS", defaults.game_duration)?,
            voting_window: seconds(&lookup, "PICKBAN_VOTE_SECS", defaults.voting_window)?,
            chat_max_chars: defaults.chat_max_chars,
        };

        Ok(Self {
            host,
            port,
            allowed_origins,
            hub,
        })
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Duration,
) -> Result<Duration, SettingsError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(SettingsError::Invalid {
            var,
            expected: "a positive number of seconds",
            value: raw,
        }),
    }
}
