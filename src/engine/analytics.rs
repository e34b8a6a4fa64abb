//! Batch anomaly scan over the stored observation history.
//!
//! Standardises price, volume and liquidity across every stored row and
//! reports rows whose largest absolute z-score exceeds the threshold.
//! Runs after a cycle when enabled; it only reads the store and never
//! feeds back into gating or detection.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AnalyticsConfig;
use crate::storage::{ObservationStore, StoreError, StoredObservation};

/// One flagged observation row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub observation_id: i64,
    pub token_id: String,
    pub symbol: String,
    /// Feature with the largest deviation.
    pub feature: &'static str,
    pub z_score: f64,
}

/// Mean and population standard deviation of one feature.
#[derive(Debug, Clone, Copy)]
struct FeatureStats {
    mean: f64,
    std_dev: f64,
}

impl FeatureStats {
    fn of(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// `None` when the feature has no spread.
    fn z(&self, value: f64) -> Option<f64> {
        if self.std_dev > f64::EPSILON {
            Some((value - self.mean) / self.std_dev)
        } else {
            None
        }
    }
}

const FEATURES: [&str; 3] = ["price", "volume", "liquidity"];

fn feature_values(row: &StoredObservation) -> [f64; 3] {
    let obs = &row.observation;
    [obs.price, obs.volume, obs.liquidity]
}

pub struct AnomalyScanner {
    z_threshold: f64,
    min_samples: usize,
}

impl AnomalyScanner {
    pub fn new(z_threshold: f64, min_samples: usize) -> Self {
        Self {
            z_threshold,
            min_samples,
        }
    }

    pub fn from_config(cfg: &AnalyticsConfig) -> Self {
        Self::new(cfg.z_threshold, cfg.min_samples)
    }

    /// Flag rows whose most extreme feature exceeds the threshold.
    pub fn scan(&self, rows: &[StoredObservation]) -> Vec<Anomaly> {
        if rows.is_empty() || rows.len() < self.min_samples {
            debug!(
                rows = rows.len(),
                min = self.min_samples,
                "Too few observations for anomaly scan"
            );
            return Vec::new();
        }

        let stats: Vec<FeatureStats> = (0..FEATURES.len())
            .map(|i| {
                let column: Vec<f64> = rows.iter().map(|r| feature_values(r)[i]).collect();
                FeatureStats::of(&column)
            })
            .collect();

        rows.iter()
            .filter_map(|row| {
                let values = feature_values(row);
                let (feature, z) = stats
                    .iter()
                    .zip(values)
                    .zip(FEATURES)
                    .filter_map(|((s, v), name)| s.z(v).map(|z| (name, z)))
                    .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))?;

                (z.abs() > self.z_threshold).then(|| Anomaly {
                    observation_id: row.id,
                    token_id: row.observation.token_id.clone(),
                    symbol: row.observation.symbol.clone(),
                    feature,
                    z_score: z,
                })
            })
            .collect()
    }

    /// Load the full history, scan it and log what was found.
    pub async fn run(&self, store: &ObservationStore) -> Result<Vec<Anomaly>, StoreError> {
        let rows = store.all_observations().await?;
        let anomalies = self.scan(&rows);

        for a in &anomalies {
            warn!(
                symbol = %a.symbol,
                observation_id = a.observation_id,
                feature = a.feature,
                z_score = format!("{:.2}", a.z_score),
                "Anomalous observation"
            );
        }
        info!(rows = rows.len(), anomalies = anomalies.len(), "Anomaly scan complete");

        Ok(anomalies)
    }
}
