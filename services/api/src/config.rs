//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    /// Overrides the OpenAI endpoint, e.g. for an OpenAI-compatible gateway.
    pub openai_api_base: Option<String>,
    pub debate_model: String,
    pub judge_model: String,
    /// Maximum number of material characters quoted into the opponent's prompt.
    pub material_context_chars: usize,
    /// Number of most recent transcript entries sent with each continuation.
    pub history_window: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address: SocketAddr = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let openai_api_base = std::env::var("OPENAI_API_BASE").ok();

        // --- Load Adapter-specific Settings ---
        let debate_model =
            std::env::var("DEBATE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let judge_model = std::env::var("JUDGE_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let material_context_chars: usize = parse_var("MATERIAL_CONTEXT_CHARS", "5000")?;
        let history_window: usize = parse_var("DEBATE_HISTORY_WINDOW", "10")?;

        Ok(Self {
            bind_address,
            log_level,
            cors_origin,
            openai_api_key,
            openai_api_base,
            debate_model,
            judge_model,
            material_context_chars,
            history_window,
        })
    }

    /// Returns the OpenAI API key, which is mandatory for serving debates.
    pub fn require_openai_api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
