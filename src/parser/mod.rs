//! Trace parsing and input schema definitions.
//!
//! This module handles:
//! - Loading raw JSON trace exports
//! - The `TraceEvent` record and its typed payload view
//! - Classifying event names into the shared sub-filters

pub mod classify;
pub mod payload;
pub mod schema;
pub mod trace_events;

// Re-export main types
pub use classify::{ActivityClass, EventSets, MutationDirection, TriggerKind};
pub use payload::EventPayload;
pub use schema::{StackFrame, TraceEvent};
pub use trace_events::{load_trace_file, parse_trace_events};
