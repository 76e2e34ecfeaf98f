//! Bollinger Bands: rolling mean ± k · rolling standard deviation.
//!
//! Uses the sample standard deviation (divide by `window - 1`), so the
//! window must hold at least two values.

use common::{CandleSeries, Error, Result};

use super::{ensure_history, PriceSource, Values};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerIndicator {
    pub window: usize,
    pub stds: f64,
    pub source: PriceSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub lower: Values,
    pub middle: Values,
    pub upper: Values,
}

impl BollingerIndicator {
    pub const DEFAULT_STDS: f64 = 2.0;

    pub fn new(window: usize, stds: f64, source: PriceSource) -> Result<Self> {
        if window < 2 {
            return Err(Error::invalid_config(format!(
                "Bollinger window must be >= 2, got {window}"
            )));
        }
        if !(stds.is_finite() && stds >= 0.0) {
            return Err(Error::invalid_config(format!(
                "Bollinger stds must be a non-negative number, got {stds}"
            )));
        }
        Ok(Self { window, stds, source })
    }

    /// Bands over the typical price, as most charting tools draw them.
    pub fn typical(window: usize, stds: f64) -> Result<Self> {
        Self::new(window, stds, PriceSource::Typical)
    }

    pub fn required_history(&self) -> usize {
        self.window
    }

    pub fn compute(&self, candles: &CandleSeries) -> Result<BollingerBands> {
        let values = self.source.extract(candles);
        ensure_history(self.window, values.len())?;

        let n = values.len();
        let mut bands = BollingerBands {
            lower: vec![None; n],
            middle: vec![None; n],
            upper: vec![None; n],
        };

        for i in (self.window - 1)..n {
            let window = &values[i + 1 - self.window..=i];
            let mean = window.iter().sum::<f64>() / self.window as f64;
            let variance = window
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (self.window - 1) as f64;
            let stddev = variance.sqrt();

            bands.lower[i] = Some(mean - self.stds * stddev);
            bands.middle[i] = Some(mean);
            bands.upper[i] = Some(mean + self.stds * stddev);
        }

        Ok(bands)
    }
}
