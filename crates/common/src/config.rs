use std::path::PathBuf;

use crate::{Error, Result};

/// Host-side settings loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// TOML file listing the strategies to run and their pairs.
    pub strategy_config_path: PathBuf,
    /// Directory holding `<BASE>_<QUOTE>-<timeframe>.json` candle files.
    pub candle_dir: PathBuf,
    /// Number of trailing rows per pair to print; 0 prints every row.
    pub output_tail: usize,
}

impl Config {
    /// Load configuration from the environment, reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let output_tail = match optional_env("OUTPUT_TAIL") {
            Some(raw) => raw.parse().map_err(|_| {
                Error::Config(format!("OUTPUT_TAIL must be a non-negative integer, got '{raw}'"))
            })?,
            None => 5,
        };

        Ok(Config {
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategies.toml".to_string())
                .into(),
            candle_dir: required_env("CANDLE_DIR")?.into(),
            output_tail,
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        Error::Config(format!(
            "Required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
