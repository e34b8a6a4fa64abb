//! Eligibility filter.
//!
//! Blacklist membership plus quality thresholds over a single observation.
//! Everything here is pure: no I/O, no errors. Rejecting malformed
//! observations is the source adapter's job.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::types::TokenObservation;

// ---------------------------------------------------------------------------
// Blacklist
// ---------------------------------------------------------------------------

/// Banned symbols and developer addresses. Exact, case-sensitive matching.
///
/// Empty strings are never stored: an unknown developer must not match
/// every other token with an unknown developer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Blacklist {
    coins: BTreeSet<String>,
    devs: BTreeSet<String>,
}

/// Blacklist shared between the pipeline's token passes. All mutation goes
/// through this lock.
pub type SharedBlacklist = Arc<Mutex<Blacklist>>;

impl Blacklist {
    /// Build from configured lists, dropping empty entries.
    pub fn new<C, D>(coins: C, devs: D) -> Self
    where
        C: IntoIterator<Item = String>,
        D: IntoIterator<Item = String>,
    {
        let mut blacklist = Blacklist::default();
        for coin in coins {
            if !blacklist.add_coin(&coin) {
                warn!("Ignoring empty symbol in configured coin blacklist");
            }
        }
        for dev in devs {
            if !blacklist.add_dev(&dev) {
                warn!("Ignoring empty address in configured dev blacklist");
            }
        }
        blacklist
    }

    pub fn into_shared(self) -> SharedBlacklist {
        Arc::new(Mutex::new(self))
    }

    /// Returns false when the symbol is empty and nothing was added.
    pub fn add_coin(&mut self, symbol: &str) -> bool {
        if symbol.is_empty() {
            return false;
        }
        self.coins.insert(symbol.to_string());
        true
    }

    /// Returns false when the address is empty and nothing was added.
    pub fn add_dev(&mut self, address: &str) -> bool {
        if address.is_empty() {
            return false;
        }
        self.devs.insert(address.to_string());
        true
    }

    pub fn contains_coin(&self, symbol: &str) -> bool {
        self.coins.contains(symbol)
    }

    pub fn contains_dev(&self, address: &str) -> bool {
        !address.is_empty() && self.devs.contains(address)
    }

    pub fn coins(&self) -> impl Iterator<Item = &str> {
        self.coins.iter().map(String::as_str)
    }

    pub fn devs(&self) -> impl Iterator<Item = &str> {
        self.devs.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.coins.len() + self.devs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty() && self.devs.is_empty()
    }
}

/// True if the token's symbol or known developer is banned.
pub fn is_blacklisted(obs: &TokenObservation, blacklist: &Blacklist) -> bool {
    if blacklist.contains_coin(&obs.symbol) {
        return true;
    }
    obs.known_dev().is_some_and(|dev| blacklist.contains_dev(dev))
}

// ---------------------------------------------------------------------------
// Quality filter
// ---------------------------------------------------------------------------

/// Quality thresholds an observation must meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub min_liquidity: f64,
    pub max_price: f64,
    pub min_volume: f64,
    /// Volume may not exceed this multiple of liquidity (wash-trading guard).
    pub max_volume_liquidity_ratio: f64,
}

/// The first threshold an observation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRejection {
    LowLiquidity,
    PriceTooHigh,
    LowVolume,
    VolumeLiquidityRatio,
}

impl fmt::Display for FilterRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterRejection::LowLiquidity => "liquidity below minimum",
            FilterRejection::PriceTooHigh => "price above maximum",
            FilterRejection::LowVolume => "volume below minimum",
            FilterRejection::VolumeLiquidityRatio => "volume/liquidity ratio too high",
        };
        f.write_str(s)
    }
}

impl FilterConfig {
    /// Check every threshold, reporting the first one that fails.
    pub fn check(&self, obs: &TokenObservation) -> Result<(), FilterRejection> {
        if obs.liquidity < self.min_liquidity {
            return Err(FilterRejection::LowLiquidity);
        }
        if obs.price > self.max_price {
            return Err(FilterRejection::PriceTooHigh);
        }
        if obs.volume < self.min_volume {
            return Err(FilterRejection::LowVolume);
        }
        if obs.volume > self.max_volume_liquidity_ratio * obs.liquidity {
            return Err(FilterRejection::VolumeLiquidityRatio);
        }
        Ok(())
    }
}

pub fn passes_filters(obs: &TokenObservation, config: &FilterConfig) -> bool {
    config.check(obs).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
