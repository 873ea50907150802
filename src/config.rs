//! Game configuration.
//!
//! Values can be embedded in a host's config file (serde) or read from the
//! environment with [`GameConfig::from_env`].

use serde::Deserialize;

/// Default number of wrong letters before the word-setter wins the round.
pub const DEFAULT_MAX_INCORRECT_GUESSES: usize = 10;

/// Default game code length.
pub const DEFAULT_CODE_LENGTH: usize = 5;

/// Default idle time before a session with nobody connected is evicted (1 hour).
pub const DEFAULT_ABANDONED_AFTER_SECS: u64 = 3600;

/// Default time between abandoned-session sweeps of the event loop.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

const ENV_MAX_INCORRECT_GUESSES: &str = "HANGMAN_MAX_INCORRECT_GUESSES";
const ENV_CODE_LENGTH: &str = "HANGMAN_CODE_LENGTH";
const ENV_ABANDONED_AFTER_SECS: &str = "HANGMAN_ABANDONED_AFTER_SECS";
const ENV_CLEANUP_INTERVAL_SECS: &str = "HANGMAN_CLEANUP_INTERVAL_SECS";

/// Tunables shared by every game session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Mistake budget per round
    pub max_incorrect_guesses: usize,

    /// Length of generated game codes
    pub code_length: usize,

    /// Evict sessions nobody is connected to after this many idle seconds.
    /// `None` keeps them forever.
    pub abandoned_after_secs: Option<u64>,

    /// Seconds between sweeps run by the event loop
    pub cleanup_interval_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_incorrect_guesses: DEFAULT_MAX_INCORRECT_GUESSES,
            code_length: DEFAULT_CODE_LENGTH,
            abandoned_after_secs: Some(DEFAULT_ABANDONED_AFTER_SECS),
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
        }
    }
}

impl GameConfig {
    /// Build a config from `HANGMAN_*` environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// `HANGMAN_ABANDONED_AFTER_SECS=0` disables eviction.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_INCORRECT_GUESSES) {
            config.max_incorrect_guesses = parse_var(ENV_MAX_INCORRECT_GUESSES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CODE_LENGTH) {
            config.code_length = parse_var(ENV_CODE_LENGTH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ABANDONED_AFTER_SECS) {
            let secs: u64 = parse_var(ENV_ABANDONED_AFTER_SECS, &raw)?;
            config.abandoned_after_secs = (secs > 0).then_some(secs);
        }
        if let Some(raw) = lookup(ENV_CLEANUP_INTERVAL_SECS) {
            config.cleanup_interval_secs = parse_var(ENV_CLEANUP_INTERVAL_SECS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the game cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_incorrect_guesses == 0 {
            return Err(ConfigError::Invalid {
                field: "max_incorrect_guesses",
                reason: "must be at least 1",
            });
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cleanup_interval_secs",
                reason: "must be at least 1",
            });
        }
        if !(3..=12).contains(&self.code_length) {
            return Err(ConfigError::Invalid {
                field: "code_length",
                reason: "must be between 3 and 12",
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Parse {
        key,
        value: raw.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has an unparseable value {value:?}")]
    Parse { key: &'static str, value: String },

    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
