use common::Timeframe;
use strategy::{StrategyFileConfig, StrategyRegistry};

const SHIPPED: &str = include_str!("../../../config/strategies.toml");

#[test]
fn shipped_strategies_build() {
    let file = StrategyFileConfig::parse(SHIPPED).unwrap();
    let registry = StrategyRegistry::from_config(&file).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.jobs().len(), 3);

    let dip = registry.get("SmaDip4h").unwrap();
    assert_eq!(dip.timeframe(), Timeframe::hours(4));
    // MACD 12/26/9 needs more than the declared 20 candles.
    assert_eq!(dip.startup_candle_count(), 34);
    assert_eq!(dip.risk().trailing().activation_threshold(), Some(0.03));
}
