//! Risk overlay data model: stoploss, ROI ladder and trailing stop.
//!
//! These settings are validated here and consumed by the execution host.

pub mod overlay;
pub mod roi;

pub use overlay::{RiskConfig, TrailingStop};
pub use roi::{RoiLadder, RoiStep};
