//! Bottleneck analyzers and the pipeline that runs them.
//!
//! Each analyzer is a pure function over the normalized event list. The
//! pipeline in `pipeline` decides which ones run and isolates their failures.

pub mod css_variables;
pub mod heuristics;
pub mod js_execution;
pub mod layout_thrashing;
pub mod long_tasks;
pub mod memory_dom;
pub mod normalizer;
pub mod options;
pub mod pipeline;
pub mod resource_loading;
pub mod schema;

// Re-export main entry points
pub use css_variables::{analyze_css_variables_impact, CssVariablesImpact};
pub use js_execution::analyze_javascript_execution;
pub use layout_thrashing::analyze_layout_thrashing;
pub use long_tasks::analyze_long_tasks;
pub use memory_dom::{analyze_memory_and_dom_growth, MemoryDomAnalysis};
pub use normalizer::normalize;
pub use options::{load_options, AnalysisOptions, DetailLevel};
pub use pipeline::analyze_trace_data;
pub use resource_loading::analyze_resource_loading;
pub use schema::{AnalysisReport, Bottleneck, BottleneckType};
