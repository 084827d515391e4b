//! Analysis options.
//!
//! A flat struct with a default for every field. Options can be loaded from
//! a TOML file (camelCase keys, same names as the JSON options object) and
//! then overridden from the command line.

use crate::utils::config::{
    DEFAULT_LAYOUT_THRASHING_THRESHOLD, DEFAULT_LONG_TASK_THRESHOLD_MS,
    DEFAULT_MEMORY_LEAK_THRESHOLD_KB,
};
use crate::utils::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How much of the long-task output is listed
///
/// Limits the task list and drops per-task breakdowns at `basic`. Other
/// analyzers always report in full, and no level changes which analyzers run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Basic,
    #[default]
    Detailed,
    Comprehensive,
}

impl DetailLevel {
    /// Maximum number of long tasks listed (`None` = all)
    pub fn task_limit(&self) -> Option<usize> {
        match self {
            Self::Basic => Some(5),
            Self::Detailed => Some(20),
            Self::Comprehensive => None,
        }
    }

    /// Whether per-task activity breakdowns are included
    pub fn includes_breakdown(&self) -> bool {
        !matches!(self, Self::Basic)
    }
}

/// Options accepted by `analyze_trace_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    pub analyze_layout_thrashing: bool,
    pub analyze_css_variables: bool,
    pub analyze_js_execution: bool,
    pub analyze_long_tasks: bool,
    pub analyze_memory_and_dom: bool,
    pub analyze_resource_loading: bool,

    /// Tasks at or above this duration are long tasks
    pub long_task_threshold_ms: f64,

    /// Advisory: reported alongside the thrashing sequence count
    pub layout_thrashing_threshold: usize,

    /// Heap growth rate (KB/s) above which a leak is suspected
    pub memory_leak_threshold_kb: f64,

    pub detail_level: DetailLevel,

    pub include_recommendations: bool,

    /// Informational: echoed in layout details, matching heatmap entries are flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_selector: Option<String>,

    /// `"start-end"` in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_time_range_ms: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            analyze_layout_thrashing: true,
            analyze_css_variables: true,
            analyze_js_execution: true,
            analyze_long_tasks: true,
            analyze_memory_and_dom: true,
            analyze_resource_loading: true,
            long_task_threshold_ms: DEFAULT_LONG_TASK_THRESHOLD_MS,
            layout_thrashing_threshold: DEFAULT_LAYOUT_THRASHING_THRESHOLD,
            memory_leak_threshold_kb: DEFAULT_MEMORY_LEAK_THRESHOLD_KB,
            detail_level: DetailLevel::default(),
            include_recommendations: true,
            focus_selector: None,
            focus_time_range_ms: None,
        }
    }
}

/// Load options from a TOML file
///
/// Missing keys keep their defaults.
///
/// # Errors
/// * `ConfigError::IoError` - If file cannot be read
/// * `ConfigError::ParseFailed` - If TOML is invalid
///
/// # Example
/// ```ignore
/// let options = load_options("perf-trace.toml")?;
/// ```
pub fn load_options(path: impl AsRef<Path>) -> Result<AnalysisOptions, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let options: AnalysisOptions = toml::from_str(&contents)?;
    Ok(options)
}
