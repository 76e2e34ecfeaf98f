use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use common::{Error, Result};

/// Time-indexed minimum-profit-to-exit schedule.
///
/// Each step reads "after `minutes` in the trade, exit once profit reaches
/// `threshold`". Steps keep the order they were declared in; minutes must be
/// strictly increasing in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoiLadder {
    steps: Vec<RoiStep>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiStep {
    pub minutes: u64,
    pub threshold: f64,
}

impl RoiLadder {
    pub fn new(steps: Vec<(u64, f64)>) -> Result<Self> {
        let steps: Vec<RoiStep> = steps
            .into_iter()
            .map(|(minutes, threshold)| RoiStep { minutes, threshold })
            .collect();

        for step in &steps {
            if !step.threshold.is_finite() {
                return Err(Error::invalid_config(format!(
                    "minimal_roi threshold at {} minutes is not finite",
                    step.minutes
                )));
            }
        }
        for pair in steps.windows(2) {
            if pair[1].minutes <= pair[0].minutes {
                return Err(Error::invalid_config(format!(
                    "minimal_roi keys must be strictly increasing: {} follows {}",
                    pair[1].minutes, pair[0].minutes
                )));
            }
            if pair[1].threshold > pair[0].threshold {
                warn!(
                    minutes = pair[1].minutes,
                    threshold = pair[1].threshold,
                    previous = pair[0].threshold,
                    "minimal_roi threshold increases over time"
                );
            }
        }

        Ok(Self { steps })
    }

    /// Parse `"minutes" -> threshold` entries as written in strategy files.
    pub fn from_keyed<K: AsRef<str>>(entries: impl IntoIterator<Item = (K, f64)>) -> Result<Self> {
        let steps = entries
            .into_iter()
            .map(|(key, threshold)| {
                let key = key.as_ref();
                key.trim()
                    .parse::<u64>()
                    .map(|minutes| (minutes, threshold))
                    .map_err(|_| {
                        Error::invalid_config(format!(
                            "minimal_roi key '{key}' is not a whole number of minutes"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(steps)
    }

    pub fn steps(&self) -> &[RoiStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Serialize for RoiLadder {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.steps.len()))?;
        for step in &self.steps {
            map.serialize_entry(&step.minutes.to_string(), &step.threshold)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RoiLadder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LadderVisitor;

        impl<'de> Visitor<'de> for LadderVisitor {
            type Value = RoiLadder;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of minutes to minimum profit")
            }

            // Entries are collected in document order so that out-of-order
            // keys are rejected instead of being silently sorted.
            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<RoiLadder, A::Error> {
                let mut entries: Vec<(String, f64)> = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, f64>()? {
                    entries.push((key, value));
                }
                RoiLadder::from_keyed(entries).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_map(LadderVisitor)
    }
}
