use common::{CandleSeries, Error, Result};

use super::{ensure_history, PriceSource, Values};

/// Simple moving average over the trailing `window` candles.
#[derive(Debug, Clone, PartialEq)]
pub struct SmaIndicator {
    pub window: usize,
    pub source: PriceSource,
}

impl SmaIndicator {
    pub fn new(window: usize, source: PriceSource) -> Result<Self> {
        if window == 0 {
            return Err(Error::invalid_config("SMA window must be >= 1"));
        }
        Ok(Self { window, source })
    }

    /// Candles needed before the first defined value.
    pub fn required_history(&self) -> usize {
        self.window
    }

    pub fn compute(&self, candles: &CandleSeries) -> Result<Values> {
        rolling_mean(&self.source.extract(candles), self.window)
    }
}

/// Arithmetic mean of `values[i-window+1..=i]`; undefined for `i < window-1`.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Values> {
    if window == 0 {
        return Err(Error::invalid_config("moving average window must be >= 1"));
    }
    ensure_history(window, values.len())?;

    let mut out = vec![None; values.len()];
    for i in (window - 1)..values.len() {
        let sum: f64 = values[i + 1 - window..=i].iter().sum();
        out[i] = Some(sum / window as f64);
    }
    Ok(out)
}
