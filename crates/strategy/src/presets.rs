//! Built-in strategies.

use common::{Error, Result, Timeframe};
use risk::{RiskConfig, RoiLadder, TrailingStop};

use crate::condition::{Condition, ConditionSet, Operand};
use crate::indicators::PriceSource;
use crate::spec::{
    BandOutputs, ExitPolicy, IndicatorDecl, MacdOutputs, OrderTimeInForce, OrderTypes,
    StrategySpec,
};

/// Tunables of the double Bollinger strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleBollingerParams {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub slow_band_window: usize,
    pub fast_band_window: usize,
    pub band_stds: f64,
    pub exit_sma_window: usize,
    /// Multiplier on the SMA in the exit rule; 1.0 compares against the SMA itself.
    pub exit_sma_ratio: f64,
    pub timeframe: Timeframe,
}

impl Default for DoubleBollingerParams {
    fn default() -> Self {
        Self {
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            slow_band_window: 20,
            fast_band_window: 5,
            band_stds: 2.0,
            exit_sma_window: 5,
            exit_sma_ratio: 1.0,
            timeframe: Timeframe::days(1),
        }
    }
}

/// Risk overlay shipped with the double Bollinger strategy.
pub fn double_bollinger_risk() -> Result<RiskConfig> {
    RiskConfig::new(
        -0.048,
        RoiLadder::new(vec![(0, 0.579), (3653, 0.373), (19881, 0.161), (41906, 0.0)])?,
        TrailingStop {
            enabled: true,
            trail_fraction: 0.294,
            activation_offset: 0.385,
            only_offset_is_reached: true,
        },
    )
}

/// Buy a dip below the slow lower band while price holds above the fast
/// lower band and the MACD histogram turns up from below zero. Exit once
/// price closes above its short SMA.
///
/// Column names: `bb_lowerband20`, `bb_lowerband5`, `macd`, `macdsignal`,
/// `macdhist`, `sma5` (window suffixes follow the parameters).
pub fn double_bollinger(params: &DoubleBollingerParams) -> Result<StrategySpec> {
    if !(params.exit_sma_ratio.is_finite() && params.exit_sma_ratio > 0.0) {
        return Err(Error::invalid_config(format!(
            "exit_sma_ratio must be a positive number, got {}",
            params.exit_sma_ratio
        )));
    }

    let slow_lower = format!("bb_lowerband{}", params.slow_band_window);
    let fast_lower = format!("bb_lowerband{}", params.fast_band_window);
    let sma = format!("sma{}", params.exit_sma_window);

    let indicators = vec![
        IndicatorDecl::Macd {
            fast: params.macd_fast,
            slow: params.macd_slow,
            signal: params.macd_signal,
            outputs: MacdOutputs {
                macd: Some("macd".into()),
                signal: Some("macdsignal".into()),
                hist: Some("macdhist".into()),
            },
        },
        IndicatorDecl::Bollinger {
            window: params.slow_band_window,
            stds: params.band_stds,
            source: PriceSource::Typical,
            outputs: BandOutputs { lower: Some(slow_lower.clone()), ..Default::default() },
        },
        IndicatorDecl::Bollinger {
            window: params.fast_band_window,
            stds: params.band_stds,
            source: PriceSource::Typical,
            outputs: BandOutputs { lower: Some(fast_lower.clone()), ..Default::default() },
        },
        IndicatorDecl::Sma { name: sma.clone(), window: params.exit_sma_window, source: PriceSource::Close },
    ];

    let hist = || Operand::column("macdhist");
    let entry = ConditionSet::new(vec![
        Condition::lt(Operand::column("close"), Operand::column(&slow_lower)),
        Condition::gt(Operand::column("close"), Operand::column(&fast_lower)),
        Condition::gt(Operand::column(&slow_lower), Operand::column(&fast_lower)),
        Condition::lt(hist().shifted(1), Operand::Const(0.0)),
        Condition::gt(hist(), hist().shifted(1)),
        Condition::gt(Operand::column("volume"), Operand::Const(0.0)),
    ]);

    let exit = ConditionSet::new(vec![
        Condition::gt(Operand::column("close"), Operand::column(&sma).times(params.exit_sma_ratio)),
        Condition::gt(Operand::column("volume"), Operand::Const(0.0)),
    ]);

    Ok(StrategySpec {
        name: "DoubleBollinger".into(),
        timeframe: params.timeframe,
        startup_candle_count: 30,
        indicators,
        entry,
        exit,
        risk: double_bollinger_risk()?,
        order_types: OrderTypes::default(),
        order_time_in_force: OrderTimeInForce::default(),
        exit_policy: ExitPolicy::default(),
        informative_pairs: Vec::new(),
    })
}
