use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use common::{Candle, CandleSeries, Error, Result, Timeframe};

/// Path of the candle file for `pair` at `timeframe`, e.g. `BTC_USDT-1d.json`.
pub fn candle_path(dir: &Path, pair: &str, timeframe: Timeframe) -> PathBuf {
    let stem = pair.replace(['/', ':'], "_");
    dir.join(format!("{stem}-{timeframe}.json"))
}

/// Read `[[ts_ms, open, high, low, close, volume], ...]` rows.
pub fn load_candles(path: &Path, timeframe: Timeframe) -> Result<CandleSeries> {
    let raw = std::fs::read_to_string(path)?;
    parse_candles(&raw, timeframe)
}

pub fn parse_candles(raw: &str, timeframe: Timeframe) -> Result<CandleSeries> {
    let rows: Vec<(i64, f64, f64, f64, f64, f64)> = serde_json::from_str(raw)?;
    let candles = rows
        .into_iter()
        .map(|(ts, open, high, low, close, volume)| {
            let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(ts)
                .ok_or_else(|| Error::InvalidCandles(format!("timestamp {ts} out of range")))?;
            Ok(Candle { timestamp, open, high, low, close, volume })
        })
        .collect::<Result<Vec<_>>>()?;
    CandleSeries::new(timeframe, candles)
}
