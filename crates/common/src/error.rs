use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Fewer candles than the indicator set needs. The host must retry
    /// with a longer history; nothing is partially computed.
    #[error("Insufficient data: need {required} candles, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// Strategy or risk parameters violate an invariant. Raised at
    /// construction, never clamped.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid candle series: {0}")]
    InvalidCandles(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
