//! Decision logic: eligibility filtering, risk gating, and event detection.
//!
//! Each submodule is a pure function of its inputs (the gate additionally
//! mutates the blacklist it is handed). Sequencing and side effects live
//! in `engine::pipeline`.

pub mod eligibility;
pub mod events;
pub mod gate;

pub use eligibility::{is_blacklisted, passes_filters, Blacklist, FilterConfig, SharedBlacklist};
pub use events::{DetectionConfig, EventDetector};
pub use gate::{GateDecision, RejectReason};
