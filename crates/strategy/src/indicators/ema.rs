use common::{CandleSeries, Error, Result};

use super::{ensure_history, PriceSource, Values};

/// Exponential moving average of a candle field.
#[derive(Debug, Clone, PartialEq)]
pub struct EmaIndicator {
    pub window: usize,
    pub source: PriceSource,
}

impl EmaIndicator {
    pub fn new(window: usize, source: PriceSource) -> Result<Self> {
        if window == 0 {
            return Err(Error::invalid_config("EMA window must be >= 1"));
        }
        Ok(Self { window, source })
    }

    pub fn required_history(&self) -> usize {
        self.window
    }

    pub fn compute(&self, candles: &CandleSeries) -> Result<Values> {
        ensure_history(self.window, candles.len())?;
        let input: Values = self.source.extract(candles).into_iter().map(Some).collect();
        ema(&input, self.window)
    }
}

/// Exponential moving average with smoothing `2 / (window + 1)`.
///
/// Seeded with the mean of the first `window` defined inputs, so the first
/// value lands `window - 1` rows after the first defined input. An undefined
/// input yields an undefined output and restarts the seed.
pub fn ema(values: &[Option<f64>], window: usize) -> Result<Values> {
    if window == 0 {
        return Err(Error::invalid_config("EMA window must be >= 1"));
    }
    let k = 2.0 / (window as f64 + 1.0);

    let mut out = vec![None; values.len()];
    let mut prev: Option<f64> = None;
    let mut seed_sum = 0.0;
    let mut seed_count = 0;

    for (i, value) in values.iter().enumerate() {
        match (*value, prev) {
            (None, _) => {
                prev = None;
                seed_sum = 0.0;
                seed_count = 0;
            }
            (Some(x), Some(p)) => {
                let next = x * k + p * (1.0 - k);
                out[i] = Some(next);
                prev = Some(next);
            }
            (Some(x), None) => {
                seed_sum += x;
                seed_count += 1;
                if seed_count == window {
                    let seed = seed_sum / window as f64;
                    out[i] = Some(seed);
                    prev = Some(seed);
                }
            }
        }
    }
    Ok(out)
}
