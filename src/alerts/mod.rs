//! Outbound side effects: alert notifications and trade requests.
//!
//! Both are fire-and-forget from the pipeline's point of view: errors are
//! returned so callers can log them, never to abort a token's pass.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// Delivers a human-readable alert.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Asks an external executor to trade the token identified by `symbol`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeRelay: Send + Sync {
    async fn request_trade(&self, symbol: &str) -> Result<()>;
}
