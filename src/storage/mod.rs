//! Persistence layer.
//!
//! Append-only SQLite log of token observations and detected events.
//! The pipeline is the only writer; the dashboard and analytics pass
//! only read. Every aggregate query re-scans the token's history, there
//! is no caching layer.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

use crate::types::{Event, RiskStatus, StoredEvent, TokenObservation};

const CREATE_OBSERVATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS observations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token_id TEXT NOT NULL,
        name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        price REAL NOT NULL,
        liquidity REAL NOT NULL,
        volume REAL NOT NULL,
        market_cap REAL NOT NULL,
        dev_address TEXT,
        is_bundled_supply INTEGER NOT NULL,
        risk_status TEXT NOT NULL,
        observed_at TEXT NOT NULL
    )
"#;

const CREATE_OBSERVATIONS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_observations_token ON observations (token_id)";

const CREATE_EVENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        details TEXT NOT NULL,
        detected_at TEXT NOT NULL
    )
"#;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Write failed: {0}")]
    WriteFailed(#[source] sqlx::Error),

    #[error("Read failed: {0}")]
    ReadFailed(#[source] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

// ---------------------------------------------------------------------------
// Stored rows
// ---------------------------------------------------------------------------

/// An observation row as read back, including the gate attributes folded
/// in at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObservation {
    pub id: i64,
    pub observation: TokenObservation,
    pub is_bundled_supply: bool,
    pub risk_status: RiskStatus,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle to the observation/event database. Cheap to clone; clones share
/// the same connection pool.
#[derive(Clone)]
pub struct ObservationStore {
    pool: SqlitePool,
}

impl ObservationStore {
    /// Open (creating if needed) the database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Open {
                path: path.display().to_string(),
                source,
            })?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(path = %path.display(), "Observation store ready");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        for ddl in [CREATE_OBSERVATIONS, CREATE_OBSERVATIONS_INDEX, CREATE_EVENTS] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(StoreError::WriteFailed)?;
        }
        Ok(())
    }

    /// Append one observation together with its risk-check attributes.
    pub async fn record_observation(
        &self,
        obs: &TokenObservation,
        risk_status: &RiskStatus,
        is_bundled: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO observations
                (token_id, name, symbol, price, liquidity, volume, market_cap,
                 dev_address, is_bundled_supply, risk_status, observed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&obs.token_id)
        .bind(&obs.name)
        .bind(&obs.symbol)
        .bind(obs.price)
        .bind(obs.liquidity)
        .bind(obs.volume)
        .bind(obs.market_cap)
        .bind(obs.dev_address.as_deref())
        .bind(is_bundled)
        .bind(risk_status.to_string())
        .bind(obs.observed_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::WriteFailed)?;

        debug!(token_id = %obs.token_id, price = obs.price, "Observation recorded");
        Ok(())
    }

    /// Append one event row exactly as detected. Returns the assigned
    /// event id.
    pub async fn record_event(&self, event: &Event) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO events (token_id, event_type, details, detected_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&event.token_id)
        .bind(event.event_type.as_str())
        .bind(&event.details)
        .bind(event.detected_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::WriteFailed)?;

        let id = result.last_insert_rowid();
        debug!(token_id = %event.token_id, event_type = %event.event_type, id, "Event recorded");
        Ok(id)
    }

    /// Mean price over every stored observation of `token_id`; `0.0` when
    /// there is no history.
    pub async fn historical_average_price(&self, token_id: &str) -> Result<f64, StoreError> {
        let avg: Option<f64> =
            sqlx::query_scalar("SELECT AVG(price) FROM observations WHERE token_id = ?")
                .bind(token_id)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::ReadFailed)?;

        Ok(avg.unwrap_or(0.0))
    }

    /// Most recent events across all tokens, newest first.
    pub async fn recent_events(&self, limit: u32) -> Result<Vec<StoredEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, token_id, event_type, details, detected_at
            FROM events ORDER BY id DESC LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::ReadFailed)?;

        rows.iter().map(event_from_row).collect()
    }

    /// All events for one token, oldest first.
    pub async fn events_for_token(&self, token_id: &str) -> Result<Vec<StoredEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, token_id, event_type, details, detected_at
            FROM events WHERE token_id = ? ORDER BY id
            "#,
        )
        .bind(token_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::ReadFailed)?;

        rows.iter().map(event_from_row).collect()
    }

    /// Full observation table, oldest first. Used by the batch analytics pass.
    pub async fn all_observations(&self) -> Result<Vec<StoredObservation>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, token_id, name, symbol, price, liquidity, volume, market_cap,
                   dev_address, is_bundled_supply, risk_status, observed_at
            FROM observations ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::ReadFailed)?;

        rows.iter().map(observation_from_row).collect()
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

fn event_from_row(row: &SqliteRow) -> Result<StoredEvent, StoreError> {
    let event_type: String = row.try_get("event_type").map_err(StoreError::ReadFailed)?;
    let detected_at: String = row.try_get("detected_at").map_err(StoreError::ReadFailed)?;

    Ok(StoredEvent {
        id: row.try_get("id").map_err(StoreError::ReadFailed)?,
        event: Event {
            token_id: row.try_get("token_id").map_err(StoreError::ReadFailed)?,
            event_type: event_type
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("unknown event type {event_type:?}")))?,
            details: row.try_get("details").map_err(StoreError::ReadFailed)?,
            detected_at: parse_timestamp(&detected_at)?,
        },
    })
}

fn observation_from_row(row: &SqliteRow) -> Result<StoredObservation, StoreError> {
    let observed_at: String = row.try_get("observed_at").map_err(StoreError::ReadFailed)?;
    let risk_status: String = row.try_get("risk_status").map_err(StoreError::ReadFailed)?;

    Ok(StoredObservation {
        id: row.try_get("id").map_err(StoreError::ReadFailed)?,
        observation: TokenObservation {
            token_id: row.try_get("token_id").map_err(StoreError::ReadFailed)?,
            name: row.try_get("name").map_err(StoreError::ReadFailed)?,
            symbol: row.try_get("symbol").map_err(StoreError::ReadFailed)?,
            price: row.try_get("price").map_err(StoreError::ReadFailed)?,
            liquidity: row.try_get("liquidity").map_err(StoreError::ReadFailed)?,
            volume: row.try_get("volume").map_err(StoreError::ReadFailed)?,
            market_cap: row.try_get("market_cap").map_err(StoreError::ReadFailed)?,
            dev_address: row.try_get("dev_address").map_err(StoreError::ReadFailed)?,
            observed_at: parse_timestamp(&observed_at)?,
        },
        is_bundled_supply: row.try_get("is_bundled_supply").map_err(StoreError::ReadFailed)?,
        risk_status: RiskStatus::from(risk_status),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::EventType;
    use std::path::PathBuf;

    pub(crate) fn temp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("sentinel_test_{}.db", uuid::Uuid::new_v4()));
        p
    }

    pub(crate) async fn temp_store() -> ObservationStore {
        ObservationStore::open(temp_path()).await.unwrap()
    }

    fn event(token_id: &str, event_type: EventType, details: &str) -> Event {
        Event {
            token_id: token_id.to_string(),
            event_type,
            details: details.to_string(),
            detected_at: Utc::now(),
        }
    }

    fn obs_with_price(token_id: &str, price: f64) -> TokenObservation {
        let mut obs = TokenObservation::sample("FOO");
        obs.token_id = token_id.to_string();
        obs.price = price;
        obs
    }

    #[tokio::test]
    async fn test_average_price_no_history_is_zero() {
        let store = temp_store().await;
        let avg = store.historical_average_price("nothing-here").await.unwrap();
        assert_eq!(avg, 0.0);
    }

    #[tokio::test]
    async fn test_average_price_over_history() {
        let store = temp_store().await;
        for price in [10.0, 20.0, 30.0] {
            store
                .record_observation(&obs_with_price("tok-a", price), &RiskStatus::Good, false)
                .await
                .unwrap();
        }
        // Other tokens must not leak into the baseline
        store
            .record_observation(&obs_with_price("tok-b", 1_000.0), &RiskStatus::Good, false)
            .await
            .unwrap();

        let avg = store.historical_average_price("tok-a").await.unwrap();
        assert!((avg - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_average_price_reads_are_stable() {
        let store = temp_store().await;
        store
            .record_observation(&obs_with_price("tok-a", 4.0), &RiskStatus::Good, false)
            .await
            .unwrap();

        let first = store.historical_average_price("tok-a").await.unwrap();
        let second = store.historical_average_price("tok-a").await.unwrap();
        let third = store.historical_average_price("tok-a").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(store.all_observations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_observations_append() {
        let store = temp_store().await;
        let obs = obs_with_price("tok-a", 2.0);
        store.record_observation(&obs, &RiskStatus::Good, false).await.unwrap();
        store.record_observation(&obs, &RiskStatus::Good, false).await.unwrap();

        let rows = store.all_observations().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].id < rows[1].id);
    }

    #[tokio::test]
    async fn test_observation_roundtrip_preserves_attributes() {
        let store = temp_store().await;
        let mut obs = obs_with_price("tok-a", 0.000123);
        obs.dev_address = None;
        store
            .record_observation(&obs, &RiskStatus::Other("Warn".into()), true)
            .await
            .unwrap();

        let rows = store.all_observations().await.unwrap();
        let row = &rows[0];
        assert_eq!(row.observation.token_id, "tok-a");
        assert_eq!(row.observation.symbol, "FOO");
        assert_eq!(row.observation.dev_address, None);
        assert!(row.is_bundled_supply);
        assert_eq!(row.risk_status, RiskStatus::Other("Warn".into()));
        assert_eq!(
            row.observation.observed_at.timestamp_millis(),
            obs.observed_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_record_and_read_events() {
        let store = temp_store().await;
        let first = store
            .record_event(&event("tok-a", EventType::Rug, "Liquidity and price dropped"))
            .await
            .unwrap();
        let second = store
            .record_event(&event("tok-b", EventType::Pump, "Price and volume increased"))
            .await
            .unwrap();
        tokio_test::assert_ok!(store.record_event(&event("tok-a", EventType::Pump, "again")).await);
        assert!(second > first);

        let recent = store.recent_events(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event.token_id, "tok-a");
        assert_eq!(recent[0].event.event_type, EventType::Pump);
        assert_eq!(recent[1].id, second);

        let for_a = store.events_for_token("tok-a").await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[0].event.event_type, EventType::Rug);
        assert_eq!(for_a[0].event.details, "Liquidity and price dropped");
    }

    #[tokio::test]
    async fn test_event_keeps_detection_time() {
        let store = temp_store().await;
        let mut detected = event("tok-a", EventType::Rug, "Liquidity and price dropped");
        detected.detected_at = Utc::now() - chrono::Duration::seconds(30);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        store.record_event(&detected).await.unwrap();
        // A retried write must not shift the timestamp either
        store.record_event(&detected).await.unwrap();

        let stored = store.events_for_token("tok-a").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].event, detected);
        assert_eq!(stored[1].event.detected_at, detected.detected_at);
    }

    #[tokio::test]
    async fn test_reopen_keeps_history() {
        let path = temp_path();
        {
            let store = ObservationStore::open(&path).await.unwrap();
            store
                .record_observation(&obs_with_price("tok-a", 8.0), &RiskStatus::Good, false)
                .await
                .unwrap();
        }
        let store = ObservationStore::open(&path).await.unwrap();
        let avg = store.historical_average_price("tok-a").await.unwrap();
        assert!((avg - 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_open_bad_path_fails() {
        let result = ObservationStore::open("/nonexistent-dir-sentinel/xyz/db.sqlite").await;
        assert!(matches!(result, Err(StoreError::Open { .. })));
    }
}
