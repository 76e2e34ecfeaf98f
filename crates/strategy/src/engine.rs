use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use common::{CandleSeries, Error, PairMetadata, Result, Timeframe};
use risk::RiskConfig;

use crate::condition::{Columns, SignalColumn, RAW_COLUMNS};
use crate::indicators::IndicatorSeries;
use crate::spec::StrategySpec;
use crate::Strategy;

/// Turns a candle series into indicator columns and entry/exit signals.
///
/// Holds only the validated [`StrategySpec`]; every call to
/// [`evaluate`](SignalEngine::evaluate) starts from scratch.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    spec: StrategySpec,
    startup_candle_count: usize,
}

/// A candle series annotated with its indicators and signals.
///
/// Borrows the series it was computed from and is dropped with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AugmentedSeries<'a> {
    pub candles: &'a CandleSeries,
    pub indicators: Vec<IndicatorSeries>,
    pub entry: SignalColumn,
    pub exit: SignalColumn,
}

impl AugmentedSeries<'_> {
    pub fn indicator(&self, name: &str) -> Option<&IndicatorSeries> {
        self.indicators.iter().find(|s| s.name() == name)
    }
}

impl SignalEngine {
    pub fn new(spec: StrategySpec) -> Result<Self> {
        let mut known: HashSet<&str> = RAW_COLUMNS.into_iter().collect();
        let mut required = 0;

        for decl in &spec.indicators {
            decl.validate()?;
            required = required.max(decl.required_history()?);
            for name in decl.output_names() {
                if !known.insert(name) {
                    return Err(Error::invalid_config(format!(
                        "column '{name}' is declared twice or shadows a candle field"
                    )));
                }
            }
        }

        for (label, set) in [("entry", &spec.entry), ("exit", &spec.exit)] {
            if let Some(missing) = set.referenced_columns().into_iter().find(|n| !known.contains(n)) {
                return Err(Error::invalid_config(format!(
                    "{label} rule references unknown column '{missing}'"
                )));
            }
        }

        let startup_candle_count = required.max(spec.startup_candle_count);
        info!(
            strategy = %spec.name,
            timeframe = %spec.timeframe,
            indicators = spec.indicators.len(),
            startup_candle_count,
            "Signal engine ready"
        );

        Ok(Self { spec, startup_candle_count })
    }

    pub fn spec(&self) -> &StrategySpec {
        &self.spec
    }

    /// Candles the host must supply before results are defined.
    pub fn startup_candle_count(&self) -> usize {
        self.startup_candle_count
    }

    /// Run indicators, then the entry rules, then the exit rules.
    ///
    /// Fails without output when the series is shorter than
    /// `startup_candle_count` or was sampled at another timeframe.
    pub fn evaluate<'a>(
        &self,
        candles: &'a CandleSeries,
        metadata: &PairMetadata,
    ) -> Result<AugmentedSeries<'a>> {
        if candles.timeframe() != self.spec.timeframe {
            return Err(Error::InvalidCandles(format!(
                "{} candles given to a {} strategy",
                candles.timeframe(),
                self.spec.timeframe
            )));
        }
        if candles.len() < self.startup_candle_count {
            return Err(Error::InsufficientData {
                required: self.startup_candle_count,
                available: candles.len(),
            });
        }

        let mut columns = Columns::from_candles(candles);
        let mut indicators = Vec::new();
        for decl in &self.spec.indicators {
            for (name, values) in decl.compute(candles)? {
                columns.insert(name.clone(), values.clone())?;
                indicators.push(IndicatorSeries::new(name, values));
            }
        }

        let entry = self.spec.entry.evaluate(&columns);
        let exit = self.spec.exit.evaluate(&columns);

        debug!(
            pair = %metadata.pair,
            rows = candles.len(),
            entries = entry.count(),
            exits = exit.count(),
            "Evaluated signals"
        );

        Ok(AugmentedSeries { candles, indicators, entry, exit })
    }
}

impl Strategy for SignalEngine {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn timeframe(&self) -> Timeframe {
        self.spec.timeframe
    }

    fn startup_candle_count(&self) -> usize {
        SignalEngine::startup_candle_count(self)
    }

    fn informative_pairs(&self) -> Vec<(String, Timeframe)> {
        self.spec
            .informative_pairs
            .iter()
            .map(|p| (p.pair.clone(), p.timeframe))
            .collect()
    }

    fn risk(&self) -> &RiskConfig {
        &self.spec.risk
    }

    fn evaluate<'a>(
        &self,
        candles: &'a CandleSeries,
        metadata: &PairMetadata,
    ) -> Result<AugmentedSeries<'a>> {
        SignalEngine::evaluate(self, candles, metadata)
    }
}
