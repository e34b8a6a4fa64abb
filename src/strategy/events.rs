//! Event detection.
//!
//! Compares a fresh observation against the token's historical mean price
//! and classifies rug pulls and pumps. Memoryless: the same condition
//! fires again on every cycle it holds.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Event, EventType, TokenObservation};

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Rug: liquidity must be below this.
    pub rug_max_liquidity: f64,
    /// Rug: price must be below this fraction of the baseline.
    pub rug_price_ratio: f64,
    /// Pump: volume must exceed this.
    pub pump_min_volume: f64,
    /// Pump: price must exceed this multiple of the baseline.
    pub pump_price_ratio: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            rug_max_liquidity: 1_000.0,
            rug_price_ratio: 0.1,
            pump_min_volume: 1_000_000.0,
            pump_price_ratio: 1.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

pub struct EventDetector {
    config: DetectionConfig,
}

impl EventDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Events implied by `obs` given the historical mean `baseline`.
    /// A zero baseline can never fire a rug (price is positive).
    pub fn detect(&self, obs: &TokenObservation, baseline: f64) -> Vec<Event> {
        let mut events = Vec::new();
        let now = Utc::now();

        if obs.liquidity < self.config.rug_max_liquidity
            && obs.price < self.config.rug_price_ratio * baseline
        {
            events.push(Event {
                token_id: obs.token_id.clone(),
                event_type: EventType::Rug,
                details: format!(
                    "Liquidity and price dropped significantly (liquidity={:.2}, price={:.8}, baseline={:.8})",
                    obs.liquidity, obs.price, baseline
                ),
                detected_at: now,
            });
        }

        if obs.volume > self.config.pump_min_volume
            && obs.price > self.config.pump_price_ratio * baseline
        {
            events.push(Event {
                token_id: obs.token_id.clone(),
                event_type: EventType::Pump,
                details: format!(
                    "Price and volume increased significantly (volume={:.2}, price={:.8}, baseline={:.8})",
                    obs.volume, obs.price, baseline
                ),
                detected_at: now,
            });
        }

        debug!(
            token_id = %obs.token_id,
            baseline,
            fired = events.len(),
            "Event detection complete"
        );

        events
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
