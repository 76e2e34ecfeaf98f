use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use common::{CandleSeries, Error, PairMetadata, Result, Timeframe};

use crate::config::{StrategyConfig, StrategyFileConfig};
use crate::presets::{double_bollinger, DoubleBollingerParams};
use crate::{AugmentedSeries, SignalEngine, Strategy};

/// Holds all configured strategy instances and the pairs each one watches.
pub struct StrategyRegistry {
    entries: Vec<Registered>,
}

struct Registered {
    strategy: Arc<dyn Strategy>,
    pairs: Vec<String>,
}

/// One unit of work for the host: a strategy and a pair to feed it.
#[derive(Clone)]
pub struct Job {
    pub strategy: Arc<dyn Strategy>,
    pub pair: String,
}

impl StrategyRegistry {
    /// Build the registry from config. Fails on unknown types, bad
    /// parameters or duplicate names.
    pub fn from_config(file_cfg: &StrategyFileConfig) -> Result<Self> {
        let mut entries: Vec<Registered> = Vec::new();

        for cfg in &file_cfg.strategies {
            if entries.iter().any(|e| e.strategy.name() == cfg.name) {
                return Err(Error::invalid_config(format!(
                    "strategy name '{}' is used twice",
                    cfg.name
                )));
            }
            let strategy = build_strategy(cfg)?;
            info!(
                name = %strategy.name(),
                pairs = ?cfg.pairs,
                timeframe = %strategy.timeframe(),
                "Registered strategy"
            );
            entries.push(Registered { strategy, pairs: cfg.pairs.clone() });
        }

        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Strategy>> {
        self.entries
            .iter()
            .find(|e| e.strategy.name() == name)
            .map(|e| &e.strategy)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every (strategy, pair) combination to evaluate.
    pub fn jobs(&self) -> Vec<Job> {
        self.entries
            .iter()
            .flat_map(|e| {
                e.pairs.iter().map(|pair| Job {
                    strategy: Arc::clone(&e.strategy),
                    pair: pair.clone(),
                })
            })
            .collect()
    }

    /// Candle feeds the host must fetch: traded pairs plus informative pairs,
    /// without duplicates, in first-seen order.
    pub fn required_feeds(&self) -> Vec<(String, Timeframe)> {
        let mut feeds: Vec<(String, Timeframe)> = Vec::new();
        for e in &self.entries {
            let traded = e.pairs.iter().map(|p| (p.clone(), e.strategy.timeframe()));
            for feed in traded.chain(e.strategy.informative_pairs()) {
                if !feeds.contains(&feed) {
                    feeds.push(feed);
                }
            }
        }
        feeds
    }

    /// Evaluate the named strategy on one pair's candles.
    pub fn evaluate<'a>(
        &self,
        name: &str,
        candles: &'a CandleSeries,
        metadata: &PairMetadata,
    ) -> Result<AugmentedSeries<'a>> {
        let strategy = self
            .get(name)
            .ok_or_else(|| Error::invalid_config(format!("unknown strategy '{name}'")))?;
        strategy.evaluate(candles, metadata)
    }
}

// ─── Strategy builders ────────────────────────────────────────────────────────

fn build_strategy(cfg: &StrategyConfig) -> Result<Arc<dyn Strategy>> {
    let mut spec = match cfg.strategy_type.as_str() {
        "double_bollinger" => {
            check_known_params(&cfg.params, DOUBLE_BOLLINGER_PARAMS)?;
            let defaults = DoubleBollingerParams::default();
            let timeframe = match param_str(&cfg.params, "timeframe")? {
                Some(raw) => raw.parse()?,
                None => defaults.timeframe,
            };
            let params = DoubleBollingerParams {
                macd_fast: param_usize(&cfg.params, "macd_fast", defaults.macd_fast)?,
                macd_slow: param_usize(&cfg.params, "macd_slow", defaults.macd_slow)?,
                macd_signal: param_usize(&cfg.params, "macd_signal", defaults.macd_signal)?,
                slow_band_window: param_usize(&cfg.params, "slow_band_window", defaults.slow_band_window)?,
                fast_band_window: param_usize(&cfg.params, "fast_band_window", defaults.fast_band_window)?,
                band_stds: param_f64(&cfg.params, "band_stds", defaults.band_stds)?,
                exit_sma_window: param_usize(&cfg.params, "exit_sma_window", defaults.exit_sma_window)?,
                exit_sma_ratio: param_f64(&cfg.params, "exit_sma_ratio", defaults.exit_sma_ratio)?,
                timeframe,
            };
            double_bollinger(&params)?
        }
        "custom" => {
            check_known_params(&cfg.params, &[])?;
            cfg.spec.clone().ok_or_else(|| {
                Error::invalid_config(format!("custom strategy '{}' has no [strategy.spec]", cfg.name))
            })?
        }
        other => {
            return Err(Error::invalid_config(format!("unknown strategy type '{other}'")));
        }
    };
    spec.name = cfg.name.clone();
    Ok(Arc::new(SignalEngine::new(spec)?))
}

const DOUBLE_BOLLINGER_PARAMS: &[&str] = &[
    "timeframe",
    "macd_fast",
    "macd_slow",
    "macd_signal",
    "slow_band_window",
    "fast_band_window",
    "band_stds",
    "exit_sma_window",
    "exit_sma_ratio",
];

fn check_known_params(params: &HashMap<String, toml::Value>, known: &[&str]) -> Result<()> {
    let mut unknown: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|k| !known.contains(k))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(Error::invalid_config(format!("unknown parameter(s): {}", unknown.join(", "))))
}

fn wrong_type(key: &str, expected: &str, value: &toml::Value) -> Error {
    Error::invalid_config(format!(
        "parameter '{key}' must be {expected}, got {} {value}",
        value.type_str()
    ))
}

fn param_str<'a>(params: &'a HashMap<String, toml::Value>, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| wrong_type(key, "a string", v)),
    }
}

/// Integers are accepted where a float is expected.
fn param_f64(params: &HashMap<String, toml::Value>, key: &str, default: f64) -> Result<f64> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_float()
            .or_else(|| v.as_integer().map(|i| i as f64))
            .ok_or_else(|| wrong_type(key, "a number", v)),
    }
}

fn param_usize(params: &HashMap<String, toml::Value>, key: &str, default: usize) -> Result<usize> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => {
            let raw = v.as_integer().ok_or_else(|| wrong_type(key, "an integer", v))?;
            usize::try_from(raw)
                .map_err(|_| Error::invalid_config(format!("parameter '{key}' must be >= 0, got {raw}")))
        }
    }
}
