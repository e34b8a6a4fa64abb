//! Pipeline orchestrator.
//!
//! One polling cycle walks every tracked token through
//! fetch → eligibility → risk check → gate → persist → detect → alert.
//!
//! Network fetches run concurrently across tokens (bounded by
//! `max_concurrent_fetches`). Everything that touches the blacklist or
//! writes to the store runs under the blacklist mutex, so each token's
//! gate/persist/detect step is atomic with respect to the others.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::alerts::{Notifier, TradeRelay};
use crate::config::AppConfig;
use crate::sources::{MarketDataSource, RiskCheckSource};
use crate::storage::ObservationStore;
use crate::strategy::eligibility::{is_blacklisted, Blacklist};
use crate::strategy::gate::{self, GateDecision};
use crate::strategy::{DetectionConfig, EventDetector, FilterConfig, SharedBlacklist};
use crate::types::{CycleReport, Event, EventType, SkipReason, TokenObservation, TokenOutcome};

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// External collaborators the pipeline talks to.
pub struct Collaborators {
    pub market: Arc<dyn MarketDataSource>,
    pub risk: Arc<dyn RiskCheckSource>,
    pub notifier: Arc<dyn Notifier>,
    pub trade_relay: Arc<dyn TradeRelay>,
}

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub tracked_tokens: Vec<String>,
    pub filters: FilterConfig,
    pub detection: DetectionConfig,
    pub max_concurrent_fetches: usize,
    pub fetch_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            tracked_tokens: cfg.monitor.tracked_tokens.clone(),
            filters: cfg.filters.clone(),
            detection: cfg.detection.clone(),
            max_concurrent_fetches: cfg.monitor.max_concurrent_fetches.max(1),
            fetch_timeout: Duration::from_secs(cfg.sources.fetch_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    market: Arc<dyn MarketDataSource>,
    risk: Arc<dyn RiskCheckSource>,
    notifier: Arc<dyn Notifier>,
    trade_relay: Arc<dyn TradeRelay>,
    store: ObservationStore,
    blacklist: SharedBlacklist,
    filters: FilterConfig,
    detector: EventDetector,
    tracked_tokens: Vec<String>,
    max_concurrent_fetches: usize,
    fetch_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        collaborators: Collaborators,
        store: ObservationStore,
        blacklist: SharedBlacklist,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            market: collaborators.market,
            risk: collaborators.risk,
            notifier: collaborators.notifier,
            trade_relay: collaborators.trade_relay,
            store,
            blacklist,
            filters: settings.filters,
            detector: EventDetector::new(settings.detection),
            tracked_tokens: settings.tracked_tokens,
            max_concurrent_fetches: settings.max_concurrent_fetches.max(1),
            fetch_timeout: settings.fetch_timeout,
        }
    }

    pub fn blacklist(&self) -> SharedBlacklist {
        Arc::clone(&self.blacklist)
    }

    /// Run every tracked token through the pipeline once.
    ///
    /// A set shutdown flag makes tokens that have not started yet report
    /// `Cancelled`; passes already in flight finish normally.
    pub async fn run_cycle(
        &self,
        cycle_number: u64,
        shutdown: &watch::Receiver<bool>,
    ) -> CycleReport {
        let started_at = Utc::now();
        info!(
            cycle = cycle_number,
            tokens = self.tracked_tokens.len(),
            "Starting cycle"
        );

        let outcomes: Vec<TokenOutcome> = stream::iter(self.tracked_tokens.iter())
            .map(|address| async move {
                if *shutdown.borrow() {
                    debug!(token = %address, "Shutdown requested, token pass not started");
                    return TokenOutcome::Skipped(SkipReason::Cancelled);
                }
                self.evaluate_token(address).await
            })
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        let report = CycleReport::tally(cycle_number, started_at, &outcomes);
        info!(
            cycle = cycle_number,
            evaluated = report.evaluated,
            skipped = report.skipped(),
            fetch_failures = report.fetch_failures,
            rejected = report.rejected,
            rugs = report.rug_events,
            pumps = report.pump_events,
            "Cycle complete"
        );
        report
    }

    /// One token's full pass. Never fails: every problem maps to a skip.
    pub async fn evaluate_token(&self, address: &str) -> TokenOutcome {
        // 1. Market data
        let obs = match self.bounded(self.market.fetch_observation(address)).await {
            Ok(obs) => obs,
            Err(e) => {
                warn!(token = %address, error = %e, "Observation fetch failed, skipping");
                return TokenOutcome::Skipped(SkipReason::FetchFailed);
            }
        };
        debug!(observation = %obs, "Observation fetched");

        // 2. Pre-screen so ineligible tokens never cost a risk call
        let prescreen = {
            let blacklist = self.blacklist.lock().await;
            self.screen(&obs, &blacklist)
        };
        if let Some(reason) = prescreen {
            return TokenOutcome::Skipped(reason);
        }

        // 3. Risk verdict
        let verdict = match self.bounded(self.risk.fetch_verdict(address)).await {
            Ok(v) => v,
            Err(e) => {
                warn!(token = %address, error = %e, "Risk check failed, skipping");
                return TokenOutcome::Skipped(SkipReason::RiskCheckFailed);
            }
        };

        // 4. Critical section: gate, persist, detect
        let events = {
            let mut blacklist = self.blacklist.lock().await;

            // Another token's gate may have grown the blacklist meanwhile
            if let Some(reason) = self.screen(&obs, &blacklist) {
                return TokenOutcome::Skipped(reason);
            }

            if let GateDecision::Reject(reason) = gate::evaluate(&verdict, &obs, &mut blacklist) {
                info!(symbol = %obs.symbol, reason = %reason, "Rejected by risk gate");
                return TokenOutcome::Skipped(SkipReason::Rejected);
            }

            if let Err(e) = self
                .store
                .record_observation(&obs, &verdict.status, verdict.is_bundled_supply)
                .await
            {
                error!(symbol = %obs.symbol, error = %e, "Failed to persist observation");
                return TokenOutcome::Skipped(SkipReason::StoreFailed);
            }

            let baseline = match self.store.historical_average_price(&obs.token_id).await {
                Ok(avg) => avg,
                Err(e) => {
                    error!(symbol = %obs.symbol, error = %e, "Failed to read price baseline");
                    return TokenOutcome::Skipped(SkipReason::StoreFailed);
                }
            };

            let events = self.detector.detect(&obs, baseline);
            for event in &events {
                self.persist_event(event).await;
            }
            events
        };

        // 5. Side effects, outside the lock
        for event in &events {
            self.dispatch(&obs, event).await;
        }

        TokenOutcome::Evaluated {
            events: events.iter().map(|e| e.event_type).collect(),
        }
    }

    // -- Helpers --

    /// Blacklist membership, then quality thresholds.
    fn screen(&self, obs: &TokenObservation, blacklist: &Blacklist) -> Option<SkipReason> {
        if is_blacklisted(obs, blacklist) {
            debug!(symbol = %obs.symbol, "Token blacklisted, skipping");
            return Some(SkipReason::Blacklisted);
        }
        if let Err(rejection) = self.filters.check(obs) {
            debug!(symbol = %obs.symbol, reason = %rejection, "Token filtered out");
            return Some(SkipReason::Filtered);
        }
        None
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.fetch_timeout, fut)
            .await
            .with_context(|| format!("timed out after {:?}", self.fetch_timeout))?
    }

    /// Store an event, retrying once. A second failure is logged and the
    /// event is still dispatched by the caller.
    async fn persist_event(&self, event: &Event) {
        let result = match self.store.record_event(event).await {
            Ok(id) => Ok(id),
            Err(e) => {
                warn!(token_id = %event.token_id, error = %e, "Event write failed, retrying once");
                self.store.record_event(event).await
            }
        };

        match result {
            Ok(id) => info!(
                token_id = %event.token_id,
                event_type = %event.event_type,
                id,
                details = %event.details,
                "Event recorded"
            ),
            Err(e) => error!(
                token_id = %event.token_id,
                event_type = %event.event_type,
                error = %e,
                "Event could not be persisted"
            ),
        }
    }

    /// Notify about an event; pumps also request a trade.
    async fn dispatch(&self, obs: &TokenObservation, event: &Event) {
        let message = match event.event_type {
            EventType::Rug => format!("🚨 Rug Pull Detected: {}", obs.symbol),
            EventType::Pump => format!("🚀 Pump Detected: {}", obs.symbol),
            EventType::CexListing => format!("🏦 CEX Listing Detected: {}", obs.symbol),
        };

        if let Err(e) = self.notifier.notify(&message).await {
            warn!(symbol = %obs.symbol, error = %e, "Notification failed");
        }

        if event.event_type == EventType::Pump {
            if let Err(e) = self.trade_relay.request_trade(&obs.symbol).await {
                warn!(symbol = %obs.symbol, error = %e, "Trade request failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
