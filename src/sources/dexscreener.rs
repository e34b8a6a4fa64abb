//! Market-data client.
//!
//! GET `{base_url}/{token_address}` returning a single token snapshot:
//!
//! ```json
//! { "token": { "id": "...", "name": "...", "symbol": "...", "price": 0.01,
//!              "liquidity": 52000.0, "volume": 11000.0, "marketCap": 900000.0,
//!              "dev_address": "..." } }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::MarketDataSource;
use crate::types::{SentinelError, TokenObservation};

const SOURCE_NAME: &str = "dexscreener";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: RawToken,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawToken {
    id: String,
    name: String,
    symbol: String,
    price: f64,
    liquidity: f64,
    volume: f64,
    #[serde(default)]
    market_cap: f64,
    #[serde(default, rename = "dev_address")]
    dev_address: Option<String>,
}

impl RawToken {
    /// Validate numeric ranges and convert to a `TokenObservation`.
    fn into_observation(self) -> Result<TokenObservation, SentinelError> {
        let malformed = |message: String| SentinelError::MalformedObservation {
            token: self.id.clone(),
            message,
        };

        let numbers = [
            ("price", self.price),
            ("liquidity", self.liquidity),
            ("volume", self.volume),
            ("marketCap", self.market_cap),
        ];
        for (field, value) in numbers {
            if !value.is_finite() {
                return Err(malformed(format!("{field} is not finite")));
            }
            if value < 0.0 {
                return Err(malformed(format!("{field} is negative ({value})")));
            }
        }
        if self.price <= 0.0 {
            return Err(malformed("price must be positive".to_string()));
        }

        Ok(TokenObservation {
            token_id: self.id,
            name: self.name,
            symbol: self.symbol,
            price: self.price,
            liquidity: self.liquidity,
            volume: self.volume,
            market_cap: self.market_cap,
            dev_address: self.dev_address.filter(|d| !d.is_empty()),
            observed_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct DexScreenerClient {
    http: Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("SENTINEL/0.1.0 (token-monitor)")
            .build()
            .context("Failed to build HTTP client for market data")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn token_url(&self, token_address: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(token_address))
    }

    fn parse(body: &str) -> Result<TokenObservation> {
        let resp: TokenResponse =
            serde_json::from_str(body).context("Failed to parse market-data response")?;
        Ok(resp.token.into_observation()?)
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    async fn fetch_observation(&self, token_address: &str) -> Result<TokenObservation> {
        let url = self.token_url(token_address);
        debug!(url = %url, "Fetching token snapshot");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Market-data request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SentinelError::Fetch {
                source_name: SOURCE_NAME.to_string(),
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        let body = resp.text().await.context("Failed to read market-data body")?;
        Self::parse(&body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{"token": {
        "id": "So1aMint", "name": "Foo Coin", "symbol": "FOO",
        "price": 0.0125, "liquidity": 52000.0, "volume": 11000.0,
        "marketCap": 900000.0, "dev_address": "DevAddr1"
    }}"#;

    #[test]
    fn test_parse_full_payload() {
        let obs = DexScreenerClient::parse(FULL).unwrap();
        assert_eq!(obs.token_id, "So1aMint");
        assert_eq!(obs.name, "Foo Coin");
        assert_eq!(obs.symbol, "FOO");
        assert!((obs.price - 0.0125).abs() < 1e-12);
        assert!((obs.market_cap - 900_000.0).abs() < 1e-9);
        assert_eq!(obs.dev_address.as_deref(), Some("DevAddr1"));
    }

    #[test]
    fn test_parse_missing_optional_fields() {
        let body = r#"{"token": {"id": "m", "name": "n", "symbol": "S",
            "price": 1.0, "liquidity": 10.0, "volume": 5.0}}"#;
        let obs = DexScreenerClient::parse(body).unwrap();
        assert_eq!(obs.market_cap, 0.0);
        assert!(obs.dev_address.is_none());
    }

    #[test]
    fn test_parse_empty_dev_becomes_none() {
        let body = r#"{"token": {"id": "m", "name": "n", "symbol": "S",
            "price": 1.0, "liquidity": 10.0, "volume": 5.0, "dev_address": ""}}"#;
        let obs = DexScreenerClient::parse(body).unwrap();
        assert!(obs.dev_address.is_none());
    }

    #[test]
    fn test_parse_missing_price_fails() {
        let body = r#"{"token": {"id": "m", "name": "n", "symbol": "S",
            "liquidity": 10.0, "volume": 5.0}}"#;
        assert!(DexScreenerClient::parse(body).is_err());
    }

    #[test]
    fn test_parse_rejects_non_positive_price() {
        let body = r#"{"token": {"id": "m", "name": "n", "symbol": "S",
            "price": 0.0, "liquidity": 10.0, "volume": 5.0}}"#;
        let err = DexScreenerClient::parse(body).unwrap_err();
        assert!(err.to_string().contains("price must be positive"));
    }

    #[test]
    fn test_parse_rejects_negative_liquidity() {
        let body = r#"{"token": {"id": "m", "name": "n", "symbol": "S",
            "price": 1.0, "liquidity": -1.0, "volume": 5.0}}"#;
        assert!(DexScreenerClient::parse(body).is_err());
    }

    #[test]
    fn test_token_url_encodes_address() {
        let client =
            DexScreenerClient::new("https://api.example.com/tokens/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.token_url("abc"), "https://api.example.com/tokens/abc");
        assert_eq!(client.token_url("a/b c"), "https://api.example.com/tokens/a%2Fb%20c");
        assert_eq!(client.name(), "dexscreener");
    }
}
