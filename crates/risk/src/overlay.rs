use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Error, Result};

use crate::RoiLadder;

/// Static risk settings handed to the execution host.
///
/// Nothing here is evaluated by the signal engine. The host applies the
/// stoploss, ROI ladder and trailing stop to each open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRiskConfig", into = "RawRiskConfig")]
pub struct RiskConfig {
    stoploss: f64,
    minimal_roi: RoiLadder,
    trailing: TrailingStop,
}

/// Trailing stop settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingStop {
    pub enabled: bool,
    /// Distance the stop trails below the best price, as a fraction.
    pub trail_fraction: f64,
    /// Profit at which trailing kicks in when `only_offset_is_reached` is set.
    pub activation_offset: f64,
    pub only_offset_is_reached: bool,
}

impl TrailingStop {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Profit fraction from which the host should start trailing, if gated.
    pub fn activation_threshold(&self) -> Option<f64> {
        (self.enabled && self.only_offset_is_reached).then_some(self.activation_offset)
    }

    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if !(self.trail_fraction.is_finite() && self.trail_fraction > 0.0) {
            return Err(Error::invalid_config(format!(
                "trailing trail_fraction must be > 0, got {}",
                self.trail_fraction
            )));
        }
        if self.only_offset_is_reached
            && !(self.activation_offset.is_finite() && self.activation_offset > self.trail_fraction)
        {
            return Err(Error::invalid_config(format!(
                "trailing activation_offset ({}) must exceed trail_fraction ({})",
                self.activation_offset, self.trail_fraction
            )));
        }
        Ok(())
    }
}

impl RiskConfig {
    pub fn new(stoploss: f64, minimal_roi: RoiLadder, trailing: TrailingStop) -> Result<Self> {
        if !(-1.0..0.0).contains(&stoploss) {
            return Err(Error::invalid_config(format!(
                "stoploss must be in [-1, 0), got {stoploss}"
            )));
        }
        trailing.validate()?;
        debug!(
            stoploss,
            roi_steps = minimal_roi.steps().len(),
            trailing = trailing.enabled,
            "Risk overlay validated"
        );
        Ok(Self { stoploss, minimal_roi, trailing })
    }

    pub fn stoploss(&self) -> f64 {
        self.stoploss
    }

    pub fn minimal_roi(&self) -> &RoiLadder {
        &self.minimal_roi
    }

    pub fn trailing(&self) -> &TrailingStop {
        &self.trailing
    }
}

#[derive(Serialize, Deserialize)]
struct RawRiskConfig {
    stoploss: f64,
    #[serde(default)]
    minimal_roi: RoiLadder,
    #[serde(default)]
    trailing: TrailingStop,
}

impl TryFrom<RawRiskConfig> for RiskConfig {
    type Error = Error;

    fn try_from(raw: RawRiskConfig) -> Result<Self> {
        RiskConfig::new(raw.stoploss, raw.minimal_roi, raw.trailing)
    }
}

impl From<RiskConfig> for RawRiskConfig {
    fn from(cfg: RiskConfig) -> Self {
        Self {
            stoploss: cfg.stoploss,
            minimal_roi: cfg.minimal_roi,
            trailing: cfg.trailing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trailing() -> TrailingStop {
        TrailingStop {
            enabled: true,
            trail_fraction: 0.294,
            activation_offset: 0.385,
            only_offset_is_reached: true,
        }
    }

    fn ladder() -> RoiLadder {
        RoiLadder::new(vec![(0, 0.579), (3653, 0.373)]).unwrap()
    }

    #[test]
    fn accepts_negative_stoploss() {
        let cfg = RiskConfig::new(-0.048, ladder(), trailing()).unwrap();
        assert_eq!(cfg.stoploss(), -0.048);
        assert_eq!(cfg.trailing().activation_threshold(), Some(0.385));
    }

    #[test]
    fn rejects_positive_stoploss() {
        let err = RiskConfig::new(0.1, ladder(), trailing()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn stoploss_bounds() {
        assert!(RiskConfig::new(-1.0, ladder(), trailing()).is_ok());
        assert!(RiskConfig::new(0.0, ladder(), trailing()).is_err());
        assert!(RiskConfig::new(-1.01, ladder(), trailing()).is_err());
        assert!(RiskConfig::new(f64::NAN, ladder(), trailing()).is_err());
    }

    #[test]
    fn rejects_zero_trail_when_enabled() {
        let t = TrailingStop { trail_fraction: 0.0, ..trailing() };
        assert!(RiskConfig::new(-0.1, ladder(), t).is_err());
    }

    #[test]
    fn rejects_offset_below_trail() {
        let t = TrailingStop { activation_offset: 0.1, ..trailing() };
        assert!(RiskConfig::new(-0.1, ladder(), t).is_err());
    }

    #[test]
    fn disabled_trailing_skips_checks() {
        let t = TrailingStop { enabled: false, trail_fraction: 0.0, ..trailing() };
        let cfg = RiskConfig::new(-0.1, ladder(), t).unwrap();
        assert_eq!(cfg.trailing().activation_threshold(), None);
    }

    #[test]
    fn ungated_trailing_has_no_threshold() {
        let t = TrailingStop { only_offset_is_reached: false, activation_offset: 0.0, ..trailing() };
        let cfg = RiskConfig::new(-0.1, ladder(), t).unwrap();
        assert_eq!(cfg.trailing().activation_threshold(), None);
    }

    #[test]
    fn deserialize_validates() {
        let bad: std::result::Result<RiskConfig, _> =
            serde_json::from_str(r#"{"stoploss": 0.1, "minimal_roi": {"0": 0.1}}"#);
        assert!(bad.is_err());

        let good: RiskConfig = serde_json::from_str(
            r#"{"stoploss": -0.05, "minimal_roi": {"0": 0.1, "60": 0.05}}"#,
        )
        .unwrap();
        assert!(!good.trailing().enabled);
        assert_eq!(good.minimal_roi().steps().len(), 2);
    }
}
