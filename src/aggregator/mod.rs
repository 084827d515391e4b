//! Shared aggregation over trace events.
//!
//! This module provides the building blocks every analyzer uses:
//! - Time-ordered working copies and temporal clustering
//! - Preceding-event (cause → effect) lookups
//! - Call-stack frame tallies
//! - Grouped duration statistics and growth rates

pub mod metrics;
pub mod stack_builder;
pub mod timeline;

// Re-export main types and functions
pub use metrics::{growth_rate, to_ms, top_n, DurationStats};
pub use stack_builder::{collapse_stack, tally_all_frames, tally_top_frames, FrameStats};
pub use timeline::{cluster_by_gap, nearest_ended_before, sorted_by_time, Cluster, ClusterSummary};
