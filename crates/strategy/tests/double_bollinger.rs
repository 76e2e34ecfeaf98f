use chrono::{Duration, TimeZone, Utc};

use common::{Candle, CandleSeries, Error, PairMetadata, Timeframe};
use strategy::indicators::MacdIndicator;
use strategy::presets::{double_bollinger, DoubleBollingerParams};
use strategy::SignalEngine;

/// 40 daily candles: a slow linear decline, a four-day crash, then a rebound.
fn closes() -> Vec<f64> {
    let mut closes = Vec::with_capacity(40);
    for i in 0..40 {
        let close = if i < 30 {
            100.0 - 0.5 * i as f64
        } else if i < 34 {
            closes[i - 1] - 6.0
        } else {
            closes[i - 1] + 3.0
        };
        closes.push(close);
    }
    closes
}

fn series_with_volume(closes: &[f64], volume: impl Fn(usize) -> f64) -> CandleSeries {
    let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: base + Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: volume(i),
        })
        .collect();
    CandleSeries::new(Timeframe::days(1), candles).unwrap()
}

fn fixture() -> CandleSeries {
    series_with_volume(&closes(), |_| 100.0)
}

fn engine() -> SignalEngine {
    SignalEngine::new(double_bollinger(&DoubleBollingerParams::default()).unwrap()).unwrap()
}

/// Lower Bollinger band of the typical price, computed naively.
fn naive_lower_band(series: &CandleSeries, window: usize, row: usize) -> Option<f64> {
    if row + 1 < window {
        return None;
    }
    let typical: Vec<f64> = series.candles()[row + 1 - window..=row]
        .iter()
        .map(|c| (c.high + c.low + c.close) / 3.0)
        .collect();
    let mean = typical.iter().sum::<f64>() / window as f64;
    let var = typical.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
    Some(mean - 2.0 * var.sqrt())
}

/// The six entry conditions at `row`, or `None` if any operand is undefined.
fn entry_conditions(series: &CandleSeries, row: usize) -> Option<[bool; 6]> {
    let hist = MacdIndicator::default().compute(series).unwrap().histogram;
    let close = series.candles()[row].close;
    let volume = series.candles()[row].volume;
    let l20 = naive_lower_band(series, 20, row)?;
    let l5 = naive_lower_band(series, 5, row)?;
    let prev_hist = hist[row.checked_sub(1)?]?;
    let cur_hist = hist[row]?;
    Some([
        close < l20,
        close > l5,
        l20 > l5,
        prev_hist < 0.0,
        cur_hist > prev_hist,
        volume > 0.0,
    ])
}

#[test]
fn entry_matches_direct_computation_on_every_row() {
    let series = fixture();
    let out = engine().evaluate(&series, &PairMetadata::new("BTC/USDT")).unwrap();

    for row in 0..series.len() {
        let expected = entry_conditions(&series, row).is_some_and(|c| c.iter().all(|b| *b));
        assert_eq!(out.entry.get(row), expected, "row {row}");
    }
}

#[test]
fn entry_fires_on_rebound_row_only() {
    let series = fixture();
    let out = engine().evaluate(&series, &PairMetadata::new("BTC/USDT")).unwrap();
    assert_eq!(out.entry.rows(), vec![34]);

    let fired = entry_conditions(&series, 34).unwrap();
    assert_eq!(fired, [true; 6]);

    // One day later the close is back above the slow band: only that rule fails.
    let next = entry_conditions(&series, 35).unwrap();
    assert_eq!(next, [false, true, true, true, true, true]);
}

#[test]
fn indicator_values_on_firing_row() {
    let series = fixture();
    let out = engine().evaluate(&series, &PairMetadata::default()).unwrap();

    let l20 = out.indicator("bb_lowerband20").unwrap();
    let l5 = out.indicator("bb_lowerband5").unwrap();
    let hist = out.indicator("macdhist").unwrap();

    assert!((l20.get(34).unwrap() - 64.96789192610854).abs() < 1e-9);
    assert!((l5.get(34).unwrap() - 54.85008650544924).abs() < 1e-9);
    assert!((hist.get(33).unwrap() - -2.6536522831574985).abs() < 1e-9);
    assert!((hist.get(34).unwrap() - -2.6345973820275725).abs() < 1e-9);
    assert_eq!(hist.get(32), None);
    assert_eq!(l20.get(18), None);
}

#[test]
fn zero_volume_suppresses_entry() {
    let series = series_with_volume(&closes(), |i| if i == 34 { 0.0 } else { 100.0 });
    let out = engine().evaluate(&series, &PairMetadata::default()).unwrap();
    assert!(!out.entry.get(34));
    assert_eq!(out.entry.count(), 0);
}

#[test]
fn exit_fires_when_close_clears_sma5() {
    let series = fixture();
    let out = engine().evaluate(&series, &PairMetadata::default()).unwrap();
    assert_eq!(out.exit.rows(), vec![35, 36, 37, 38, 39]);
    // Exit writes its own column; entry is untouched by the exit rule.
    assert!(!out.entry.get(36));
}

#[test]
fn evaluate_is_idempotent() {
    let series = fixture();
    let engine = engine();
    let first = engine.evaluate(&series, &PairMetadata::new("ETH/USDT")).unwrap();
    let second = engine.evaluate(&series, &PairMetadata::new("ETH/USDT")).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn one_candle_short_is_insufficient() {
    let engine = engine();
    let required = engine.startup_candle_count();
    let series = series_with_volume(&closes()[..required - 1], |_| 100.0);
    assert!(matches!(
        engine.evaluate(&series, &PairMetadata::default()),
        Err(Error::InsufficientData { required: 34, available: 33 })
    ));
}

#[test]
fn warmup_rows_never_signal() {
    let series = fixture();
    let out = engine().evaluate(&series, &PairMetadata::default()).unwrap();
    assert!(out.entry.as_slice()[..34].iter().all(|b| !b));
}
