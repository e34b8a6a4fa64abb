//! Risk-check client.
//!
//! GET `{base_url}/{token_address}` returning
//! `{ "status": "Good", "is_bundled_supply": false }`. Missing or null
//! fields fall back to `Unknown` / `false`; unrecognised statuses are kept
//! verbatim.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::RiskCheckSource;
use crate::types::{RiskVerdict, SentinelError};

const SOURCE_NAME: &str = "rugcheck";

pub struct RugcheckClient {
    http: Client,
    base_url: String,
}

impl RugcheckClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("SENTINEL/0.1.0 (token-monitor)")
            .build()
            .context("Failed to build HTTP client for risk checks")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}

#[async_trait]
impl RiskCheckSource for RugcheckClient {
    async fn fetch_verdict(&self, token_address: &str) -> Result<RiskVerdict> {
        let url = format!("{}/{}", self.base_url, urlencoding::encode(token_address));
        debug!(url = %url, "Fetching risk verdict");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Risk-check request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SentinelError::Fetch {
                source_name: SOURCE_NAME.to_string(),
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        let verdict: RiskVerdict = resp
            .json()
            .await
            .context("Failed to parse risk-check response")?;

        Ok(verdict)
    }
}
