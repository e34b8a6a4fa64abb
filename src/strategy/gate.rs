//! Risk classifier gate.
//!
//! Turns an external risk verdict into an accept/reject decision. A
//! bundled-supply finding also bans the token's symbol and developer for
//! the rest of the process lifetime.

use std::fmt;
use tracing::warn;

use super::eligibility::Blacklist;
use crate::types::{RiskStatus, RiskVerdict, TokenObservation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Supply concentrated; symbol (and dev, if known) were blacklisted.
    BundledSupply,
    /// Provider did not rate the token `Good`.
    Status(RiskStatus),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::BundledSupply => write!(f, "bundled supply"),
            RejectReason::Status(status) => write!(f, "risk status {status}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Reject(RejectReason),
}

impl GateDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, GateDecision::Accept)
    }
}

/// Accept iff the status is `Good` and supply is not bundled.
pub fn evaluate(
    verdict: &RiskVerdict,
    obs: &TokenObservation,
    blacklist: &mut Blacklist,
) -> GateDecision {
    if verdict.is_bundled_supply {
        blacklist.add_coin(&obs.symbol);
        if let Some(dev) = obs.known_dev() {
            blacklist.add_dev(dev);
        }
        warn!(
            symbol = %obs.symbol,
            dev = obs.known_dev().unwrap_or("<unknown>"),
            "Bundled supply detected, token and developer blacklisted"
        );
        return GateDecision::Reject(RejectReason::BundledSupply);
    }

    if verdict.status != RiskStatus::Good {
        return GateDecision::Reject(RejectReason::Status(verdict.status.clone()));
    }

    GateDecision::Accept
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
