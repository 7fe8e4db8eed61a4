//! Runtime configuration for the tabula agent.
//!
//! Built once at startup from the environment and passed by reference to
//! the components that need it. Nothing else in the crate reads ambient
//! process state.

use std::path::PathBuf;

/// Default dataset path used when no flag or DATA_PATH is provided.
const DEFAULT_DATA_PATH: &str = "data/dummy_dataset.csv";

/// Timeout for insight provider calls, in seconds.
const DEFAULT_INSIGHT_TIMEOUT_SECS: u64 = 30;

/// Main configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI-compatible API key for the insight generator, if set.
    pub openai_api_key: Option<String>,
    /// Anthropic API key for the insight generator, if set.
    pub anthropic_api_key: Option<String>,
    /// Fallback dataset path when no --data-path/--from-url is given.
    pub default_data_path: PathBuf,
    /// Upper bound on a single insight provider round-trip.
    pub insight_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            default_data_path: PathBuf::from(DEFAULT_DATA_PATH),
            insight_timeout_secs: DEFAULT_INSIGHT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// Reads `OPENAI_API_KEY`, `ANTHROPIC_API_KEY` and `DATA_PATH`. Empty
    /// values are treated as unset.
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let default_data_path = non_empty("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            default_data_path,
            insight_timeout_secs: DEFAULT_INSIGHT_TIMEOUT_SECS,
        }
    }

    /// True when at least one insight provider credential is configured.
    pub fn has_insight_credentials(&self) -> bool {
        self.openai_api_key.is_some() || self.anthropic_api_key.is_some()
    }
}
