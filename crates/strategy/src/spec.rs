use serde::{Deserialize, Serialize};

use common::{CandleSeries, Error, Result, Timeframe};
use risk::RiskConfig;

use crate::condition::{is_column_name, ConditionSet};
use crate::indicators::{
    BollingerIndicator, EmaIndicator, MacdIndicator, PriceSource, SmaIndicator, Values,
};

/// Everything a strategy declares up front: indicators, rules, risk overlay
/// and the pass-through settings the host reads once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySpec {
    #[serde(default)]
    pub name: String,
    pub timeframe: Timeframe,
    /// Declared minimum history. Raised to what the indicators need.
    #[serde(default)]
    pub startup_candle_count: usize,
    #[serde(default, rename = "indicator")]
    pub indicators: Vec<IndicatorDecl>,
    #[serde(default)]
    pub entry: ConditionSet,
    #[serde(default)]
    pub exit: ConditionSet,
    pub risk: RiskConfig,
    #[serde(default)]
    pub order_types: OrderTypes,
    #[serde(default)]
    pub order_time_in_force: OrderTimeInForce,
    #[serde(default)]
    pub exit_policy: ExitPolicy,
    #[serde(default)]
    pub informative_pairs: Vec<InformativePair>,
}

/// An indicator to compute and the column names its outputs land in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorDecl {
    Sma {
        name: String,
        window: usize,
        #[serde(default)]
        source: PriceSource,
    },
    Ema {
        name: String,
        window: usize,
        #[serde(default)]
        source: PriceSource,
    },
    Bollinger {
        window: usize,
        #[serde(default = "default_stds")]
        stds: f64,
        #[serde(default = "typical_source")]
        source: PriceSource,
        outputs: BandOutputs,
    },
    Macd {
        #[serde(default = "default_fast")]
        fast: usize,
        #[serde(default = "default_slow")]
        slow: usize,
        #[serde(default = "default_signal")]
        signal: usize,
        outputs: MacdOutputs,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandOutputs {
    pub lower: Option<String>,
    pub middle: Option<String>,
    pub upper: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdOutputs {
    pub macd: Option<String>,
    pub signal: Option<String>,
    pub hist: Option<String>,
}

fn default_stds() -> f64 {
    BollingerIndicator::DEFAULT_STDS
}

fn typical_source() -> PriceSource {
    PriceSource::Typical
}

fn default_fast() -> usize {
    MacdIndicator::default().fast
}

fn default_slow() -> usize {
    MacdIndicator::default().slow
}

fn default_signal() -> usize {
    MacdIndicator::default().signal
}

impl IndicatorDecl {
    /// Column names this declaration produces, in output order.
    pub fn output_names(&self) -> Vec<&str> {
        match self {
            IndicatorDecl::Sma { name, .. } | IndicatorDecl::Ema { name, .. } => vec![name.as_str()],
            IndicatorDecl::Bollinger { outputs, .. } => [&outputs.lower, &outputs.middle, &outputs.upper]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect(),
            IndicatorDecl::Macd { outputs, .. } => [&outputs.macd, &outputs.signal, &outputs.hist]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect(),
        }
    }

    /// Candles needed before every output of this indicator is defined.
    pub fn required_history(&self) -> Result<usize> {
        Ok(match self {
            IndicatorDecl::Sma { window, source, .. } => SmaIndicator::new(*window, *source)?.required_history(),
            IndicatorDecl::Ema { window, source, .. } => EmaIndicator::new(*window, *source)?.required_history(),
            IndicatorDecl::Bollinger { window, stds, source, .. } => {
                BollingerIndicator::new(*window, *stds, *source)?.required_history()
            }
            IndicatorDecl::Macd { fast, slow, signal, .. } => {
                MacdIndicator::new(*fast, *slow, *signal)?.required_history()
            }
        })
    }

    /// Check parameters and that at least one output is named, with names
    /// rules can reference.
    pub fn validate(&self) -> Result<()> {
        self.required_history()?;
        let names = self.output_names();
        if names.is_empty() {
            return Err(Error::invalid_config(format!(
                "{} indicator declares no output columns",
                self.kind()
            )));
        }
        if let Some(bad) = names.iter().find(|n| !is_column_name(n)) {
            return Err(Error::invalid_config(format!(
                "{} output '{bad}' is not a valid column name",
                self.kind()
            )));
        }
        Ok(())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IndicatorDecl::Sma { .. } => "sma",
            IndicatorDecl::Ema { .. } => "ema",
            IndicatorDecl::Bollinger { .. } => "bollinger",
            IndicatorDecl::Macd { .. } => "macd",
        }
    }

    /// Compute the declared outputs as `(column name, values)` pairs.
    pub fn compute(&self, candles: &CandleSeries) -> Result<Vec<(String, Values)>> {
        match self {
            IndicatorDecl::Sma { name, window, source } => {
                let values = SmaIndicator::new(*window, *source)?.compute(candles)?;
                Ok(vec![(name.clone(), values)])
            }
            IndicatorDecl::Ema { name, window, source } => {
                let values = EmaIndicator::new(*window, *source)?.compute(candles)?;
                Ok(vec![(name.clone(), values)])
            }
            IndicatorDecl::Bollinger { window, stds, source, outputs } => {
                let bands = BollingerIndicator::new(*window, *stds, *source)?.compute(candles)?;
                Ok(named([
                    (&outputs.lower, bands.lower),
                    (&outputs.middle, bands.middle),
                    (&outputs.upper, bands.upper),
                ]))
            }
            IndicatorDecl::Macd { fast, slow, signal, outputs } => {
                let macd = MacdIndicator::new(*fast, *slow, *signal)?.compute(candles)?;
                Ok(named([
                    (&outputs.macd, macd.macd),
                    (&outputs.signal, macd.signal),
                    (&outputs.hist, macd.histogram),
                ]))
            }
        }
    }
}

fn named<const N: usize>(outputs: [(&Option<String>, Values); N]) -> Vec<(String, Values)> {
    outputs
        .into_iter()
        .filter_map(|(name, values)| name.as_ref().map(|n| (n.clone(), values)))
        .collect()
}

/// Order types, passed verbatim to the host's order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderTypes {
    pub entry: String,
    pub exit: String,
    pub stoploss: String,
    pub stoploss_on_exchange: bool,
}

impl Default for OrderTypes {
    fn default() -> Self {
        Self {
            entry: "limit".to_string(),
            exit: "limit".to_string(),
            stoploss: "market".to_string(),
            stoploss_on_exchange: false,
        }
    }
}

/// Order time in force, passed verbatim to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderTimeInForce {
    pub entry: String,
    pub exit: String,
}

impl Default for OrderTimeInForce {
    fn default() -> Self {
        Self { entry: "gtc".to_string(), exit: "gtc".to_string() }
    }
}

/// How the host should treat exit signals and ROI. Not interpreted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitPolicy {
    pub use_exit_signal: bool,
    pub exit_profit_only: bool,
    pub ignore_roi_if_entry_signal: bool,
    pub process_only_new_candles: bool,
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            use_exit_signal: true,
            exit_profit_only: false,
            ignore_roi_if_entry_signal: false,
            process_only_new_candles: false,
        }
    }
}

/// Auxiliary series the host should fetch alongside the traded pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InformativePair {
    pub pair: String,
    pub timeframe: Timeframe,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn macd_decl() -> IndicatorDecl {
        IndicatorDecl::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
            outputs: MacdOutputs { macd: Some("macd".into()), signal: None, hist: Some("macdhist".into()) },
        }
    }

    #[test]
    fn macd_history_and_outputs() {
        let decl = macd_decl();
        assert_eq!(decl.required_history().unwrap(), 34);
        assert_eq!(decl.output_names(), vec!["macd", "macdhist"]);
    }

    #[test]
    fn bollinger_without_outputs_is_invalid() {
        let decl = IndicatorDecl::Bollinger {
            window: 20,
            stds: 2.0,
            source: PriceSource::Typical,
            outputs: BandOutputs::default(),
        };
        assert!(matches!(decl.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn invalid_parameters_surface_on_validate() {
        let decl = IndicatorDecl::Sma { name: "sma0".into(), window: 0, source: PriceSource::Close };
        assert!(decl.validate().is_err());
    }

    #[test]
    fn unreferenceable_output_names_are_rejected() {
        let dashed = IndicatorDecl::Bollinger {
            window: 20,
            stds: 2.0,
            source: PriceSource::Typical,
            outputs: BandOutputs { lower: Some("bb-lower".into()), ..Default::default() },
        };
        assert!(matches!(dashed.validate(), Err(Error::InvalidConfiguration(_))));

        let empty = IndicatorDecl::Ema { name: String::new(), window: 5, source: PriceSource::Close };
        assert!(empty.validate().is_err());

        let keyword = IndicatorDecl::Sma { name: "nan".into(), window: 5, source: PriceSource::Close };
        assert!(keyword.validate().is_ok());
    }

    #[test]
    fn decl_deserializes_with_defaults() {
        let decl: IndicatorDecl = toml::from_str(
            r#"
            kind = "bollinger"
            window = 20
            outputs = { lower = "bb_lowerband20" }
            "#,
        )
        .unwrap();
        match decl {
            IndicatorDecl::Bollinger { stds, source, .. } => {
                assert_eq!(stds, 2.0);
                assert_eq!(source, PriceSource::Typical);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pass_through_defaults() {
        assert_eq!(OrderTypes::default().stoploss, "market");
        assert_eq!(OrderTimeInForce::default().entry, "gtc");
        assert!(ExitPolicy::default().use_exit_signal);
    }
}
