//! Perf Trace Analyzer
//!
//! Bottleneck analysis for browser performance traces.
//!
//! Given the event stream recorded by a browser's tracing subsystem, the
//! engine reports long tasks, layout thrashing, script-triggered layouts,
//! style recalculation cost, memory and DOM growth, and network waterfall
//! problems, each with recommendations.
//!
//! ## Getting Started
//!
//! ```ignore
//! use perf_trace_analyzer::{analyze_trace_data, AnalysisOptions};
//! use perf_trace_analyzer::parser::load_trace_file;
//!
//! let events = load_trace_file("trace.json")?;
//! for bottleneck in analyze_trace_data(&events, &AnalysisOptions::default()) {
//!     println!("{}: {}", bottleneck.kind.as_str(), bottleneck.description);
//! }
//! ```
//!
//! The engine never fails: analyzer errors come back as `analysis_error`
//! bottlenecks alongside the results of the analyzers that succeeded.

pub mod aggregator;
pub mod analyzer;
pub mod commands;
pub mod output;
pub mod parser;
pub mod utils;

pub use analyzer::{analyze_trace_data, AnalysisOptions, Bottleneck, BottleneckType};
pub use parser::TraceEvent;
