//! Shared types for the SENTINEL monitor.
//!
//! These types form the data model used across all modules: the
//! observation snapshot, risk verdicts, detected events, per-token
//! outcomes, and the domain error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// A single polling-cycle snapshot of a token's market metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenObservation {
    /// Stable identifier (contract / mint address).
    pub token_id: String,
    pub name: String,
    pub symbol: String,
    /// Price in quote-currency units. Always positive.
    pub price: f64,
    pub liquidity: f64,
    /// Trailing-window traded volume.
    pub volume: f64,
    pub market_cap: f64,
    /// Developer / deployer address, when the provider reports one.
    pub dev_address: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl TokenObservation {
    /// The developer address, or `None` when missing or empty.
    pub fn known_dev(&self) -> Option<&str> {
        self.dev_address.as_deref().filter(|d| !d.is_empty())
    }

    /// Helper to build a test observation with sensible defaults.
    #[cfg(test)]
    pub fn sample(symbol: &str) -> Self {
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
}

impl fmt::Display for TokenObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) price={:.8} liq=${:.0} vol=${:.0} mcap=${:.0}",
            self.symbol, self.token_id, self.price, self.liquidity, self.volume, self.market_cap,
        )
    }
}

// ---------------------------------------------------------------------------
// Risk verdict
// ---------------------------------------------------------------------------

/// Risk-provider status tag. Only `Good` lets a token through the gate;
/// everything else is kept verbatim for persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum RiskStatus {
    Good,
    Bad,
    #[default]
    Unknown,
    Other(String),
}

impl From<String> for RiskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Good" => RiskStatus::Good,
            "Bad" => RiskStatus::Bad,
            "Unknown" | "" => RiskStatus::Unknown,
            _ => RiskStatus::Other(s),
        }
    }
}

impl From<Option<String>> for RiskStatus {
    fn from(s: Option<String>) -> Self {
        s.map(RiskStatus::from).unwrap_or_default()
    }
}

impl From<RiskStatus> for String {
    fn from(status: RiskStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskStatus::Good => write!(f, "Good"),
            RiskStatus::Bad => write!(f, "Bad"),
            RiskStatus::Unknown => write!(f, "Unknown"),
            RiskStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Result of a risk-scoring check for one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskVerdict {
    #[serde(default)]
    pub status: RiskStatus,
    /// Supply concentrated among few holders / the developer.
    #[serde(default)]
    pub is_bundled_supply: bool,
}

impl RiskVerdict {
    pub fn new(status: RiskStatus, is_bundled_supply: bool) -> Self {
        Self {
            status,
            is_bundled_supply,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Kind of detected state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Rug,
    Pump,
    CexListing,
}

impl EventType {
    /// Tag used in the events table.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Rug => "rug",
            EventType::Pump => "pump",
            EventType::CexListing => "cex_listing",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rug" => Ok(EventType::Rug),
            "pump" => Ok(EventType::Pump),
            "cex_listing" => Ok(EventType::CexListing),
            other => Err(SentinelError::UnknownEventType(other.to_string())),
        }
    }
}

/// A detected event for a token. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub token_id: String,
    pub event_type: EventType,
    pub details: String,
    pub detected_at: DateTime<Utc>,
}

/// An event as read back from the store, with its assigned row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    #[serde(flatten)]
    pub event: Event,
}

// ---------------------------------------------------------------------------
// Per-token outcome
// ---------------------------------------------------------------------------

/// Why a token's pass ended before evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    FetchFailed,
    Blacklisted,
    Filtered,
    RiskCheckFailed,
    Rejected,
    StoreFailed,
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::FetchFailed => "fetch failed",
            SkipReason::Blacklisted => "blacklisted",
            SkipReason::Filtered => "filtered",
            SkipReason::RiskCheckFailed => "risk check failed",
            SkipReason::Rejected => "rejected by risk gate",
            SkipReason::StoreFailed => "store failure",
            SkipReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Terminal state of one token's pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenOutcome {
    Skipped(SkipReason),
    /// Persisted and run through detection; lists the events that fired.
    Evaluated { events: Vec<EventType> },
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of a single polling cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub tokens_tracked: usize,
    pub evaluated: usize,
    pub fetch_failures: usize,
    pub blacklisted: usize,
    pub filtered: usize,
    pub risk_failures: usize,
    pub rejected: usize,
    pub store_failures: usize,
    pub cancelled: usize,
    pub rug_events: usize,
    pub pump_events: usize,
}

impl CycleReport {
    /// Aggregate per-token outcomes into a report.
    pub fn tally(cycle_number: u64, started_at: DateTime<Utc>, outcomes: &[TokenOutcome]) -> Self {
        let mut report = CycleReport {
            cycle_number,
            started_at: Some(started_at),
            tokens_tracked: outcomes.len(),
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                TokenOutcome::Evaluated { events } => {
                    report.evaluated += 1;
                    for event in events {
                        match event {
                            EventType::Rug => report.rug_events += 1,
                            EventType::Pump => report.pump_events += 1,
                            EventType::CexListing => {}
                        }
                    }
                }
                TokenOutcome::Skipped(reason) => match reason {
                    SkipReason::FetchFailed => report.fetch_failures += 1,
                    SkipReason::Blacklisted => report.blacklisted += 1,
                    SkipReason::Filtered => report.filtered += 1,
                    SkipReason::RiskCheckFailed => report.risk_failures += 1,
                    SkipReason::Rejected => report.rejected += 1,
                    SkipReason::StoreFailed => report.store_failures += 1,
                    SkipReason::Cancelled => report.cancelled += 1,
                },
            }
        }

        report
    }

    pub fn skipped(&self) -> usize {
        self.tokens_tracked - self.evaluated
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle #{}: tracked={} evaluated={} skipped={} rugs={} pumps={}",
            self.cycle_number,
            self.tokens_tracked,
            self.evaluated,
            self.skipped(),
            self.rug_events,
            self.pump_events,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for SENTINEL.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    #[error("Fetch error ({source_name}): {message}")]
    Fetch { source_name: String, message: String },

    #[error("Malformed observation for {token}: {message}")]
    MalformedObservation { token: String, message: String },

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- RiskStatus tests --

    #[test]
    fn test_risk_status_from_string() {
        assert_eq!(RiskStatus::from("Good".to_string()), RiskStatus::Good);
        assert_eq!(RiskStatus::from("Bad".to_string()), RiskStatus::Bad);
        assert_eq!(RiskStatus::from(String::new()), RiskStatus::Unknown);
        assert_eq!(
            RiskStatus::from("Warning".to_string()),
            RiskStatus::Other("Warning".to_string())
        );
    }

    #[test]
    fn test_risk_status_is_case_sensitive() {
        assert_eq!(
            RiskStatus::from("good".to_string()),
            RiskStatus::Other("good".to_string())
        );
    }

    #[test]
    fn test_verdict_defaults_when_fields_missing() {
        let v: RiskVerdict = serde_json::from_str("{}").unwrap();
        assert_eq!(v.status, RiskStatus::Unknown);
        assert!(!v.is_bundled_supply);
    }

    #[test]
    fn test_verdict_null_status_is_unknown() {
        let v: RiskVerdict =
            serde_json::from_str(r#"{"status": null, "is_bundled_supply": false}"#).unwrap();
        assert_eq!(v.status, RiskStatus::Unknown);
        assert!(!v.is_bundled_supply);
    }

    #[test]
    fn test_verdict_parses_provider_status() {
        let v: RiskVerdict =
            serde_json::from_str(r#"{"status": "Danger", "is_bundled_supply": true}"#).unwrap();
        assert_eq!(v.status, RiskStatus::Other("Danger".to_string()));
        assert!(v.is_bundled_supply);
        assert_eq!(v.status.to_string(), "Danger");
    }

    // -- EventType tests --

    #[test]
    fn test_event_type_tags() {
        assert_eq!(EventType::Rug.as_str(), "rug");
        assert_eq!(EventType::Pump.to_string(), "pump");
        assert_eq!("cex_listing".parse::<EventType>().unwrap(), EventType::CexListing);
        assert!("moon".parse::<EventType>().is_err());
    }

    // -- Observation tests --

    #[test]
    fn test_known_dev_ignores_empty() {
        let mut obs = TokenObservation::sample("FOO");
        assert_eq!(obs.known_dev(), Some("FOO-dev"));
        obs.dev_address = Some(String::new());
        assert_eq!(obs.known_dev(), None);
        obs.dev_address = None;
        assert_eq!(obs.known_dev(), None);
    }

    // -- CycleReport tests --

    #[test]
    fn test_cycle_report_tally() {
        let outcomes = vec![
            TokenOutcome::Evaluated {
                events: vec![EventType::Rug, EventType::Pump],
            },
            TokenOutcome::Evaluated { events: vec![] },
            TokenOutcome::Skipped(SkipReason::FetchFailed),
            TokenOutcome::Skipped(SkipReason::Rejected),
            TokenOutcome::Skipped(SkipReason::Filtered),
        ];
        let report = CycleReport::tally(3, Utc::now(), &outcomes);

        assert_eq!(report.cycle_number, 3);
        assert_eq!(report.tokens_tracked, 5);
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.skipped(), 3);
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.filtered, 1);
        assert_eq!(report.rug_events, 1);
        assert_eq!(report.pump_events, 1);
    }

    #[test]
    fn test_cycle_report_display() {
        let outcomes = [TokenOutcome::Evaluated { events: vec![] }];
        let report = CycleReport::tally(1, Utc::now(), &outcomes);
        assert_eq!(
            report.to_string(),
            "Cycle #1: tracked=1 evaluated=1 skipped=0 rugs=0 pumps=0"
        );
    }
}
