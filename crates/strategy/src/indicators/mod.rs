//! Indicator library: pure functions from candles to aligned series.
//!
//! Every output has the same length as its input. Rows without enough
//! history are `None`; nothing is back-filled and inputs are never mutated.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod sma;

pub use bollinger::{BollingerBands, BollingerIndicator};
pub use ema::{ema, EmaIndicator};
pub use macd::{Macd, MacdIndicator};
pub use sma::{rolling_mean, SmaIndicator};

use serde::{Deserialize, Serialize};

use common::{CandleSeries, Error, Result};

/// Values aligned by row with a candle series; `None` marks undefined rows.
pub type Values = Vec<Option<f64>>;

/// A named derived series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    name: String,
    values: Values,
}

impl IndicatorSeries {
    pub fn new(name: impl Into<String>, values: Values) -> Self {
        Self { name: name.into(), values }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn get(&self, row: usize) -> Option<f64> {
        self.values.get(row).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The series shifted back by `rows`; the first `rows` entries are undefined.
    pub fn lagged(&self, rows: usize) -> Self {
        Self {
            name: format!("{}[{rows}]", self.name),
            values: shift(&self.values, rows),
        }
    }
}

/// Shift `values` back by `rows`, padding the front with `None`.
pub fn shift(values: &[Option<f64>], rows: usize) -> Values {
    let n = values.len();
    (0..n)
        .map(|i| if i >= rows { values[i - rows] } else { None })
        .collect()
}

/// Which candle field an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    Volume,
    /// `(high + low + close) / 3`
    Typical,
}

impl PriceSource {
    pub fn extract(&self, candles: &CandleSeries) -> Vec<f64> {
        candles
            .candles()
            .iter()
            .map(|c| match self {
                PriceSource::Open => c.open,
                PriceSource::High => c.high,
                PriceSource::Low => c.low,
                PriceSource::Close => c.close,
                PriceSource::Volume => c.volume,
                PriceSource::Typical => c.typical_price(),
            })
            .collect()
    }
}

pub(crate) fn ensure_history(required: usize, available: usize) -> Result<()> {
    if available < required {
        return Err(Error::InsufficientData { required, available });
    }
    Ok(())
}

/// Synthetic daily candles from close prices: high/low = close ± 1, volume 100.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> CandleSeries {
    use chrono::{Duration, TimeZone, Utc};
    use common::{Candle, Timeframe};

    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: base + Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        })
        .collect();
    CandleSeries::new(Timeframe::days(1), candles).unwrap()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, epsilon={epsilon}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_pads_front() {
        let v = vec![Some(1.0), Some(2.0), None, Some(4.0)];
        assert_eq!(shift(&v, 1), vec![None, Some(1.0), Some(2.0), None]);
        assert_eq!(shift(&v, 0), v);
        assert_eq!(shift(&v, 10), vec![None; 4]);
    }

    #[test]
    fn lagged_series_keeps_length() {
        let s = IndicatorSeries::new("macdhist", vec![Some(1.0), Some(2.0), Some(3.0)]);
        let lagged = s.lagged(2);
        assert_eq!(lagged.len(), 3);
        assert_eq!(lagged.get(2), Some(1.0));
        assert_eq!(lagged.get(1), None);
        assert_eq!(lagged.name(), "macdhist[2]");
    }

    #[test]
    fn typical_source_averages_hlc() {
        let series = make_series(&[10.0, 20.0]);
        assert_eq!(PriceSource::Typical.extract(&series), vec![10.0, 20.0]);
        assert_eq!(PriceSource::High.extract(&series), vec![11.0, 21.0]);
    }
}
