use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use common::{Candle, CandleSeries, PairMetadata, Timeframe};
use strategy::indicators::{BollingerIndicator, MacdIndicator, PriceSource, SmaIndicator};
use strategy::presets::{double_bollinger, DoubleBollingerParams};
use strategy::SignalEngine;

fn series(closes: &[f64], spread: f64) -> CandleSeries {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: base + Duration::hours(i as i64),
            open: close,
            high: close + spread,
            low: close - spread,
            close,
            volume: 10.0,
        })
        .collect();
    CandleSeries::new(Timeframe::hours(1), candles).unwrap()
}

fn prices(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..10_000.0, len)
}

proptest! {
    /// SMA at row i is the mean of the trailing window; earlier rows are undefined.
    #[test]
    fn sma_is_trailing_mean(closes in prices(1..80), window in 1usize..20) {
        prop_assume!(closes.len() >= window);
        let s = series(&closes, 0.5);
        let out = SmaIndicator::new(window, PriceSource::Close).unwrap().compute(&s).unwrap();

        prop_assert_eq!(out.len(), closes.len());
        for (i, value) in out.iter().enumerate() {
            if i + 1 < window {
                prop_assert!(value.is_none());
            } else {
                let mean = closes[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
                prop_assert!((value.unwrap() - mean).abs() <= 1e-9 * mean.abs().max(1.0));
            }
        }
    }

    /// Bands bracket the mean for any non-negative multiplier.
    #[test]
    fn bollinger_bands_are_ordered(
        closes in prices(2..80),
        window in 2usize..25,
        stds in 0.0f64..5.0,
        spread in 0.0f64..50.0,
    ) {
        prop_assume!(closes.len() >= window);
        let s = series(&closes, spread);
        let bands = BollingerIndicator::typical(window, stds).unwrap().compute(&s).unwrap();
        for i in 0..closes.len() {
            match (bands.lower[i], bands.middle[i], bands.upper[i]) {
                (Some(l), Some(m), Some(u)) => prop_assert!(l <= m && m <= u),
                (None, None, None) => prop_assert!(i + 1 < window),
                other => prop_assert!(false, "partially defined row {}: {:?}", i, other),
            }
        }
    }

    /// Histogram equals MACD minus signal exactly wherever defined.
    #[test]
    fn macd_histogram_identity(closes in prices(40..120), fast in 2usize..10, gap in 1usize..15, signal in 2usize..10) {
        let macd = MacdIndicator::new(fast, fast + gap, signal).unwrap();
        prop_assume!(closes.len() >= macd.required_history());
        let out = macd.compute_closes(&closes).unwrap();
        let first = macd.required_history() - 1;
        for i in 0..closes.len() {
            if i < first {
                prop_assert!(out.histogram[i].is_none());
            } else {
                let (m, s, h) = (out.macd[i].unwrap(), out.signal[i].unwrap(), out.histogram[i].unwrap());
                prop_assert_eq!(h, m - s);
            }
        }
    }

    /// Same input, same output.
    #[test]
    fn evaluate_is_idempotent(closes in prices(34..90)) {
        let params = DoubleBollingerParams { timeframe: Timeframe::hours(1), ..Default::default() };
        let engine = SignalEngine::new(double_bollinger(&params).unwrap()).unwrap();
        let s = series(&closes, 1.0);
        let meta = PairMetadata::new("BTC/USDT");
        let a = engine.evaluate(&s, &meta).unwrap();
        let b = engine.evaluate(&s, &meta).unwrap();
        prop_assert_eq!(a.entry.len(), closes.len());
        prop_assert_eq!(a, b);
    }
}
