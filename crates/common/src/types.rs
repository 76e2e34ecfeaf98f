use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// One OHLCV bar for a fixed time interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time of the candle.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// `(high + low + close) / 3`.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Candle interval, e.g. `5m`, `1h`, `1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeframe {
    amount: u32,
    unit: TimeframeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimeframeUnit {
    Minute,
    Hour,
    Day,
    Week,
}

impl Timeframe {
    pub const fn minutes(amount: u32) -> Self {
        Self { amount, unit: TimeframeUnit::Minute }
    }

    pub const fn hours(amount: u32) -> Self {
        Self { amount, unit: TimeframeUnit::Hour }
    }

    pub const fn days(amount: u32) -> Self {
        Self { amount, unit: TimeframeUnit::Day }
    }

    pub const fn weeks(amount: u32) -> Self {
        Self { amount, unit: TimeframeUnit::Week }
    }

    pub fn duration(&self) -> Duration {
        let amount = i64::from(self.amount);
        match self.unit {
            TimeframeUnit::Minute => Duration::minutes(amount),
            TimeframeUnit::Hour => Duration::hours(amount),
            TimeframeUnit::Day => Duration::days(amount),
            TimeframeUnit::Week => Duration::weeks(amount),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = match self.unit {
            TimeframeUnit::Minute => 'm',
            TimeframeUnit::Hour => 'h',
            TimeframeUnit::Day => 'd',
            TimeframeUnit::Week => 'w',
        };
        write!(f, "{}{unit}", self.amount)
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::invalid_config(format!("invalid timeframe '{s}'"));
        let unit_char = s.chars().last().ok_or_else(invalid)?;
        let amount: u32 = s[..s.len() - unit_char.len_utf8()]
            .parse()
            .map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }
        let unit = match unit_char {
            'm' => TimeframeUnit::Minute,
            'h' => TimeframeUnit::Hour,
            'd' => TimeframeUnit::Day,
            'w' => TimeframeUnit::Week,
            _ => return Err(invalid()),
        };
        Ok(Self { amount, unit })
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered, time-indexed candles at a fixed timeframe.
///
/// Timestamps are strictly increasing and spaced by a positive multiple of
/// the timeframe; every price and volume is finite. Missing intervals are
/// kept as gaps, never filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleSeries {
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(timeframe: Timeframe, candles: Vec<Candle>) -> Result<Self> {
        if let Some(row) = candles.iter().position(|c| {
            ![c.open, c.high, c.low, c.close, c.volume].iter().all(|v| v.is_finite())
        }) {
            return Err(Error::InvalidCandles(format!("row {row} has a non-finite value")));
        }

        let step = timeframe.duration();
        for (i, pair) in candles.windows(2).enumerate() {
            let delta = pair[1].timestamp - pair[0].timestamp;
            if delta <= Duration::zero() {
                return Err(Error::InvalidCandles(format!(
                    "timestamp at row {} ({}) does not follow row {} ({})",
                    i + 1,
                    pair[1].timestamp,
                    i,
                    pair[0].timestamp
                )));
            }
            let step_ms = step.num_milliseconds();
            if step_ms > 0 && delta.num_milliseconds() % step_ms != 0 {
                return Err(Error::InvalidCandles(format!(
                    "row {} is not aligned to the {timeframe} timeframe",
                    i + 1
                )));
            }
        }
        Ok(Self { timeframe, candles })
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Row indices that start after one or more missing intervals.
    pub fn gaps(&self) -> Vec<usize> {
        let step = self.timeframe.duration();
        self.candles
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1].timestamp - pair[0].timestamp > step)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

/// What the host tells the strategy about the series being evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMetadata {
    /// Trading pair, e.g. "BTC/USDT".
    pub pair: String,
}

impl PairMetadata {
    pub fn new(pair: impl Into<String>) -> Self {
        Self { pair: pair.into() }
    }
}
