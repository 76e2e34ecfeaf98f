use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use common::Result;

use crate::spec::StrategySpec;

/// Top-level strategy config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[strategy]]
/// type = "double_bollinger"
/// name = "BB daily"
/// pairs = ["BTC/USDT", "ETH/USDT"]
///
/// [strategy.params]
/// exit_sma_ratio = 1.1
/// ```
///
/// A `type = "custom"` entry carries its full definition under
/// `[strategy.spec]` instead of `params`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "strategy")]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy type identifier: "double_bollinger" or "custom".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Human-readable name shown in logs and output.
    pub name: String,
    /// Trading pairs to evaluate, e.g. "BTC/USDT".
    pub pairs: Vec<String>,
    /// Preset-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
    /// Full definition for `custom` strategies.
    #[serde(default)]
    pub spec: Option<StrategySpec>,
}

impl StrategyFileConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
