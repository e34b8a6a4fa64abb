//! External data sources.
//!
//! Defines the `MarketDataSource` and `RiskCheckSource` traits and provides
//! HTTP implementations for:
//! - DexScreener-style token snapshot endpoint (market data)
//! - Rugcheck-style token report endpoint (risk verdicts)

pub mod dexscreener;
pub mod rugcheck;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{RiskVerdict, TokenObservation};

/// Fetches a market snapshot for one token.
///
/// Any error (transport, non-success status, malformed payload) means the
/// token is skipped for this cycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_observation(&self, token_address: &str) -> Result<TokenObservation>;
}

/// Fetches a risk verdict for one token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RiskCheckSource: Send + Sync {
    async fn fetch_verdict(&self, token_address: &str) -> Result<RiskVerdict>;
}
