//! SENTINEL: token market monitor with rug-pull and pump detection.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod sources;
pub mod alerts;
pub mod strategy;
pub mod engine;
pub mod storage;
pub mod dashboard;
