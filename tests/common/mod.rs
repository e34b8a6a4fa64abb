//! In-memory collaborators for integration testing.
//!
//! Deterministic `MarketDataSource` / `RiskCheckSource` / `Notifier` /
//! `TradeRelay` implementations whose state is fully controllable from
//! test code.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sentinel::alerts::{Notifier, TradeRelay};
use sentinel::sources::{MarketDataSource, RiskCheckSource};
use sentinel::storage::ObservationStore;
use sentinel::strategy::FilterConfig;
use sentinel::types::{RiskStatus, RiskVerdict, TokenObservation};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A healthy token: passes the default filters, fires no events on a
/// flat history.
pub fn token(symbol: &str) -> TokenObservation {
    TokenObservation {
        token_id: format!("{symbol}-mint"),
        name: format!("{symbol} Token"),
        symbol: symbol.to_string(),
        price: 1.0,
        liquidity: 50_000.0,
        volume: 10_000.0,
        market_cap: 1_000_000.0,
        dev_address: Some(format!("{symbol}-dev")),
        observed_at: Utc::now(),
    }
}

pub fn default_filters() -> FilterConfig {
    FilterConfig {
        min_liquidity: 1_000.0,
        max_price: 100.0,
        min_volume: 500.0,
        max_volume_liquidity_ratio: 5.0,
    }
}

pub fn good() -> RiskVerdict {
    RiskVerdict::new(RiskStatus::Good, false)
}

pub fn temp_path() -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("sentinel_it_{}.db", uuid::Uuid::new_v4()));
    path
}

pub async fn temp_store() -> ObservationStore {
    ObservationStore::open(temp_path()).await.unwrap()
}

/// Run raw SQL against the database file through a separate pool, the way
/// an outside process would.
pub async fn execute_sql(path: &Path, sql: &str) {
    let options = SqliteConnectOptions::new().filename(path);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::query(sql).execute(&pool).await.unwrap();
    pool.close().await;
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// Serves observations keyed by token address. Unknown addresses fail.
#[derive(Default)]
pub struct FakeMarket {
    observations: Mutex<HashMap<String, TokenObservation>>,
    delay: Option<Duration>,
    calls: Mutex<usize>,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Register (or replace) the snapshot served for `obs.token_id`.
    pub fn set(&self, obs: TokenObservation) {
        self.observations
            .lock()
            .unwrap()
            .insert(obs.token_id.clone(), obs);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl MarketDataSource for FakeMarket {
    async fn fetch_observation(&self, token_address: &str) -> Result<TokenObservation> {
        *self.calls.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let found = self.observations.lock().unwrap().get(token_address).cloned();
        found
            .map(|mut obs| {
                obs.observed_at = Utc::now();
                obs
            })
            .ok_or_else(|| anyhow!("HTTP 404: unknown token {token_address}"))
    }
}

// ---------------------------------------------------------------------------
// Risk checks
// ---------------------------------------------------------------------------

/// Serves verdicts keyed by token address; unknown addresses get `Good`.
#[derive(Default)]
pub struct FakeRisk {
    verdicts: Mutex<HashMap<String, RiskVerdict>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRisk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token_address: &str, verdict: RiskVerdict) {
        self.verdicts
            .lock()
            .unwrap()
            .insert(token_address.to_string(), verdict);
    }

    pub fn calls_for(&self, token_address: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.as_str() == token_address)
            .count()
    }
}

#[async_trait]
impl RiskCheckSource for FakeRisk {
    async fn fetch_verdict(&self, token_address: &str) -> Result<RiskVerdict> {
        self.calls.lock().unwrap().push(token_address.to_string());
        let verdict = self.verdicts.lock().unwrap().get(token_address).cloned();
        Ok(verdict.unwrap_or_else(good))
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Records every message it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Records requested trade symbols.
#[derive(Default)]
pub struct RecordingRelay {
    symbols: Mutex<Vec<String>>,
}

impl RecordingRelay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.symbols.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeRelay for RecordingRelay {
    async fn request_trade(&self, symbol: &str) -> Result<()> {
        self.symbols.lock().unwrap().push(symbol.to_string());
        Ok(())
    }
}
