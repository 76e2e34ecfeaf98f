use common::{CandleSeries, Error, Result};

use super::{ema, ensure_history, Values};

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period),
/// Histogram = MACD line − Signal.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// The three MACD series, aligned with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub macd: Values,
    pub signal: Values,
    pub histogram: Values,
}

impl Default for MacdIndicator {
    fn default() -> Self {
        Self { fast: 12, slow: 26, signal: 9 }
    }
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self> {
        if fast == 0 || signal == 0 {
            return Err(Error::invalid_config("MACD periods must be >= 1"));
        }
        if fast >= slow {
            return Err(Error::invalid_config(format!(
                "MACD fast period ({fast}) must be less than slow period ({slow})"
            )));
        }
        Ok(Self { fast, slow, signal })
    }

    /// Closes needed before the histogram is defined: `slow + signal - 1`.
    pub fn required_history(&self) -> usize {
        self.slow + self.signal - 1
    }

    pub fn compute(&self, candles: &CandleSeries) -> Result<Macd> {
        self.compute_closes(&candles.closes())
    }

    /// Compute MACD from a slice of close prices (oldest first).
    pub fn compute_closes(&self, closes: &[f64]) -> Result<Macd> {
        ensure_history(self.required_history(), closes.len())?;

        let input: Values = closes.iter().copied().map(Some).collect();
        let fast = ema(&input, self.fast)?;
        let slow = ema(&input, self.slow)?;

        let macd: Values = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| Some((*f)? - (*s)?))
            .collect();
        let signal = ema(&macd, self.signal)?;
        let histogram: Values = macd
            .iter()
            .zip(&signal)
            .map(|(m, s)| Some((*m)? - (*s)?))
            .collect();

        Ok(Macd { macd, signal, histogram })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_up(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    #[test]
    fn macd_insufficient_data() {
        let macd = MacdIndicator::default();
        let prices = vec![100.0; 33]; // need >= 34
        assert!(matches!(
            macd.compute_closes(&prices),
            Err(Error::InsufficientData { required: 34, available: 33 })
        ));
    }

    #[test]
    fn warmup_rows_are_undefined() {
        let macd = MacdIndicator::default();
        let out = macd.compute_closes(&trending_up(40)).unwrap();
        assert!(out.macd[24].is_none());
        assert!(out.macd[25].is_some());
        assert!(out.signal[32].is_none());
        assert!(out.signal[33].is_some());
        assert!(out.histogram[32].is_none());
        assert!(out.histogram[33].is_some());
    }

    #[test]
    fn histogram_is_macd_minus_signal() {
        let macd = MacdIndicator::new(3, 6, 3).unwrap();
        let mut prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 0.5).collect();
        prices.extend((0..20).map(|i| 90.0 + i as f64 * 2.0));
        let out = macd.compute_closes(&prices).unwrap();
        for i in 0..prices.len() {
            if let (Some(m), Some(s), Some(h)) = (out.macd[i], out.signal[i], out.histogram[i]) {
                assert_eq!(h, m - s);
            }
        }
    }

    #[test]
    fn constant_prices_give_zero_macd() {
        let macd = MacdIndicator::new(3, 6, 3).unwrap();
        let out = macd.compute_closes(&[50.0; 20]).unwrap();
        assert!(out.histogram[19].unwrap().abs() < 1e-9);
    }

    #[test]
    fn steady_uptrend_has_positive_macd() {
        let macd = MacdIndicator::new(3, 6, 3).unwrap();
        let out = macd.compute_closes(&trending_up(40)).unwrap();
        assert!(out.macd[39].unwrap() > 0.0);
    }

    #[test]
    fn rejects_fast_not_below_slow() {
        assert!(MacdIndicator::new(26, 12, 9).is_err());
        assert!(MacdIndicator::new(12, 12, 9).is_err());
        assert!(MacdIndicator::new(12, 26, 0).is_err());
    }
}
