pub mod condition;
pub mod config;
pub mod engine;
pub mod indicators;
pub mod presets;
pub mod registry;
pub mod spec;

pub use condition::{Columns, Comparison, Condition, ConditionSet, Operand, SignalColumn};
pub use config::{StrategyConfig, StrategyFileConfig};
pub use engine::{AugmentedSeries, SignalEngine};
pub use indicators::{IndicatorSeries, PriceSource};
pub use registry::{Job, StrategyRegistry};
pub use spec::{IndicatorDecl, StrategySpec};

use common::{CandleSeries, PairMetadata, Result, Timeframe};
use risk::RiskConfig;

/// All strategy implementations must satisfy this trait.
///
/// Implementations hold no per-call state, so one instance can serve many
/// pairs from many threads at once.
pub trait Strategy: Send + Sync {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// Candle interval the strategy is designed for.
    fn timeframe(&self) -> Timeframe;

    /// Leading candles needed before signals are meaningful.
    fn startup_candle_count(&self) -> usize;

    /// Extra (pair, timeframe) series the host should fetch. Empty by default.
    fn informative_pairs(&self) -> Vec<(String, Timeframe)> {
        Vec::new()
    }

    /// Static risk overlay for the host's position handling.
    fn risk(&self) -> &RiskConfig;

    /// Annotate `candles` with indicators and entry/exit signals.
    fn evaluate<'a>(
        &self,
        candles: &'a CandleSeries,
        metadata: &PairMetadata,
    ) -> Result<AugmentedSeries<'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_types_are_send_sync() {
        fn require_send_sync<T: Send + Sync>() {}
        require_send_sync::<SignalEngine>();
        require_send_sync::<StrategyRegistry>();
        require_send_sync::<AugmentedSeries<'static>>();
        require_send_sync::<CandleSeries>();
        require_send_sync::<RiskConfig>();
    }
}
