//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (Telegram credentials) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::strategy::{DetectionConfig, FilterConfig};
use crate::types::SentinelError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub sources: SourcesConfig,
    pub storage: StorageConfig,
    pub filters: FilterConfig,
    #[serde(default)]
    pub blacklist: BlacklistConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub trade_relay: TradeRelayConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub name: String,
    pub update_interval_secs: u64,
    /// Token addresses polled every cycle.
    pub tracked_tokens: Vec<String>,
    /// Upper bound on tokens fetched concurrently.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub dex_api_url: String,
    pub rugcheck_api_url: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub database_path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BlacklistConfig {
    #[serde(default)]
    pub coins: Vec<String>,
    #[serde(default)]
    pub devs: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AlertsConfig {
    pub telegram_bot_token_env: Option<String>,
    pub telegram_chat_id_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TradeRelayConfig {
    /// When false, trade requests are only logged.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default = "default_trade_command")]
    pub trade_command: String,
}

impl Default for TradeRelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command_prefix: default_command_prefix(),
            trade_command: default_trade_command(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Absolute z-score above which an observation is flagged.
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    /// Minimum rows before the scan runs at all.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            z_threshold: default_z_threshold(),
            min_samples: default_min_samples(),
        }
    }
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_command_prefix() -> String {
    "/bonkbot".to_string()
}

fn default_trade_command() -> String {
    "buy".to_string()
}

fn default_dashboard_port() -> u16 {
    8080
}

fn default_z_threshold() -> f64 {
    3.0
}

fn default_min_samples() -> usize {
    20
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file: {path}"))?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), SentinelError> {
        let fail = |msg: &str| Err(SentinelError::Config(msg.to_string()));

        if self.monitor.update_interval_secs == 0 {
            return fail("monitor.update_interval_secs must be > 0");
        }
        if self.monitor.tracked_tokens.is_empty() {
            return fail("monitor.tracked_tokens must not be empty");
        }
        if self.monitor.tracked_tokens.iter().any(|t| t.trim().is_empty()) {
            return fail("monitor.tracked_tokens contains an empty address");
        }
        if self.monitor.max_concurrent_fetches == 0 {
            return fail("monitor.max_concurrent_fetches must be > 0");
        }
        if self.sources.fetch_timeout_secs == 0 {
            return fail("sources.fetch_timeout_secs must be > 0");
        }

        let f = &self.filters;
        for (name, value) in [
            ("filters.min_liquidity", f.min_liquidity),
            ("filters.max_price", f.max_price),
            ("filters.min_volume", f.min_volume),
            ("filters.max_volume_liquidity_ratio", f.max_volume_liquidity_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SentinelError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if f.max_volume_liquidity_ratio == 0.0 {
            return fail("filters.max_volume_liquidity_ratio must be > 0");
        }

        let d = &self.detection;
        for (name, value) in [
            ("detection.rug_max_liquidity", d.rug_max_liquidity),
            ("detection.rug_price_ratio", d.rug_price_ratio),
            ("detection.pump_min_volume", d.pump_min_volume),
            ("detection.pump_price_ratio", d.pump_price_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SentinelError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        let z = self.analytics.z_threshold;
        if self.analytics.enabled && (z.is_nan() || z <= 0.0) {
            return fail("analytics.z_threshold must be > 0");
        }

        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
