//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables, falling back to the
//! engine defaults when a variable is missing or unparsable.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::campaign::{DispatchSettings, InitiatorId};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of sends in flight at once
    pub concurrency_limit: usize,

    /// Recipients per batch
    pub batch_size: usize,

    /// Pause after each dispatched batch, in milliseconds
    pub batch_pause_ms: u64,

    /// Attempts per recipient before a retryable failure becomes terminal
    pub max_attempts: u32,

    // =========================================================================
    // Telegram
    // =========================================================================

    /// Bot token used by the Telegram transport
    pub telegram_bot_token: Option<String>,

    /// Base URL of the Bot API
    pub telegram_api_url: String,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    // =========================================================================
    // Storage
    // =========================================================================

    /// Directory holding one campaign state record per initiator
    pub state_dir: PathBuf,

    /// JSON file listing recipients and blocked accounts
    pub recipients_file: PathBuf,

    // =========================================================================
    // Control API
    // =========================================================================

    /// Port for the control API to listen on
    pub port: u16,

    /// Shared secret expected as a bearer token on control requests
    pub operator_token: Option<String>,

    /// Initiators allowed to run campaigns; everyone when unset
    pub operator_ids: Option<Vec<InitiatorId>>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = DispatchSettings::default();

        Config {
            concurrency_limit: parse_or("CONCURRENCY_LIMIT", defaults.concurrency_limit),

            batch_size: parse_or("BATCH_SIZE", defaults.batch_size),

            batch_pause_ms: parse_or("BATCH_PAUSE_MS", defaults.batch_pause.as_millis() as u64),

            max_attempts: parse_or("MAX_ATTEMPTS", defaults.max_attempts),

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),

            telegram_api_url: env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 15_000),

            state_dir: env::var("STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./state")),

            recipients_file: env::var("RECIPIENTS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./recipients.json")),

            port: parse_or("PORT", 8080),

            operator_token: env::var("OPERATOR_TOKEN").ok(),

            operator_ids: parse_id_list("OPERATOR_IDS"),
        }
    }

    /// Engine tuning derived from this configuration.
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            concurrency_limit: self.concurrency_limit,
            batch_size: self.batch_size,
            batch_pause: Duration::from_millis(self.batch_pause_ms),
            max_attempts: self.max_attempts,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Whether `initiator` may run campaigns.
    pub fn is_operator(&self, initiator: InitiatorId) -> bool {
        self.operator_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&initiator))
    }
}

/// Parse a variable, warning and falling back to `default` on bad input.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a comma-separated list of ids, skipping entries that do not parse.
fn parse_id_list(name: &str) -> Option<Vec<InitiatorId>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(env_var = name, value = %s, "Invalid id, skipping");
                    None
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_valid() {
        env::set_var("TEST_BROADCAST_BATCH", " 50 ");
        assert_eq!(parse_or("TEST_BROADCAST_BATCH", 200usize), 50);
        env::remove_var("TEST_BROADCAST_BATCH");
    }

    #[test]
    fn test_parse_or_invalid_falls_back() {
        env::set_var("TEST_BROADCAST_LIMIT", "lots");
        assert_eq!(parse_or("TEST_BROADCAST_LIMIT", 25usize), 25);
        env::remove_var("TEST_BROADCAST_LIMIT");
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or("NONEXISTENT_VAR", 3u32), 3);
    }

    #[test]
    fn test_parse_id_list() {
        env::set_var("TEST_OPERATOR_IDS", "5663190258, 12,abc,,7");
        assert_eq!(
            parse_id_list("TEST_OPERATOR_IDS"),
            Some(vec![5663190258, 12, 7])
        );
        env::remove_var("TEST_OPERATOR_IDS");
    }

    #[test]
    fn test_dispatch_settings_and_operators() {
        let config = Config {
            concurrency_limit: 10,
            batch_size: 100,
            batch_pause_ms: 500,
            max_attempts: 2,
            telegram_bot_token: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
            request_timeout_ms: 1000,
            state_dir: PathBuf::from("state"),
            recipients_file: PathBuf::from("recipients.json"),
            port: 8080,
            operator_token: None,
            operator_ids: Some(vec![1, 2]),
        };

        let settings = config.dispatch_settings();
        assert_eq!(settings.concurrency_limit, 10);
        assert_eq!(settings.batch_pause, Duration::from_millis(500));
        assert!(config.is_operator(2));
        assert!(!config.is_operator(3));
    }
}
