//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;

use crate::storage::ObservationStore;
use crate::strategy::SharedBlacklist;
use crate::types::{CycleReport, StoredEvent};

const DEFAULT_EVENT_LIMIT: u32 = 50;
const MAX_EVENT_LIMIT: u32 = 500;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub monitor_name: String,
    pub started_at: DateTime<Utc>,
    pub tracked_tokens: usize,
    pub cycles_run: RwLock<u64>,
    pub last_cycle: RwLock<Option<CycleReport>>,
    pub store: ObservationStore,
    pub blacklist: SharedBlacklist,
}

impl DashboardState {
    pub fn new(
        monitor_name: &str,
        tracked_tokens: usize,
        store: ObservationStore,
        blacklist: SharedBlacklist,
    ) -> Self {
        Self {
            monitor_name: monitor_name.to_string(),
            started_at: Utc::now(),
            tracked_tokens,
            cycles_run: RwLock::new(0),
            last_cycle: RwLock::new(None),
            store,
            blacklist,
        }
    }

    /// Publish a finished cycle.
    pub async fn record_cycle(&self, report: CycleReport) {
        *self.cycles_run.write().await += 1;
        *self.last_cycle.write().await = Some(report);
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub tracked_tokens: usize,
    pub cycles_run: u64,
    pub uptime_secs: i64,
    pub last_cycle: Option<CycleReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlacklistResponse {
    pub coins: Vec<String>,
    pub devs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let cycles_run = *state.cycles_run.read().await;
    let last_cycle = state.last_cycle.read().await.clone();

    Json(StatusResponse {
        name: state.monitor_name.clone(),
        tracked_tokens: state.tracked_tokens,
        cycles_run,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        last_cycle,
    })
}

/// GET /api/events?limit=N
pub async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<StoredEvent>>, StatusCode> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT).min(MAX_EVENT_LIMIT);

    state.store.recent_events(limit).await.map(Json).map_err(|e| {
        error!(error = %e, "Failed to load recent events");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// GET /api/blacklist
pub async fn get_blacklist(State(state): State<AppState>) -> Json<BlacklistResponse> {
    let blacklist = state.blacklist.lock().await;
    Json(BlacklistResponse {
        coins: blacklist.coins().map(String::from).collect(),
        devs: blacklist.devs().map(String::from).collect(),
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
