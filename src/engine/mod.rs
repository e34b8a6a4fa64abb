//! Core engine: the per-cycle monitoring pipeline and the optional
//! batch analytics pass that runs after it.

pub mod analytics;
pub mod pipeline;

pub use analytics::{Anomaly, AnomalyScanner};
pub use pipeline::{Collaborators, Pipeline, PipelineSettings};
