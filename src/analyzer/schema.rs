//! Output schema: bottlenecks and the report envelope.
//!
//! A `Bottleneck` has no identity beyond its position in the returned list.
//! `details` holds the analyzer-specific payload as plain JSON so the
//! presentation layer can render it without knowing the analyzer types.

use super::options::AnalysisOptions;
use crate::utils::error::AnalysisError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Discriminator of a bottleneck record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckType {
    LongTasks,
    LayoutThrashing,
    JavascriptExecution,
    CssVariablesImpact,
    MemoryDomGrowth,
    LargeResources,
    ResourceLoading,
    AnalysisError,
}

impl BottleneckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongTasks => "long_tasks",
            Self::LayoutThrashing => "layout_thrashing",
            Self::JavascriptExecution => "javascript_execution",
            Self::CssVariablesImpact => "css_variables_impact",
            Self::MemoryDomGrowth => "memory_dom_growth",
            Self::LargeResources => "large_resources",
            Self::ResourceLoading => "resource_loading",
            Self::AnalysisError => "analysis_error",
        }
    }
}

/// The unit of engine output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    #[serde(rename = "type")]
    pub kind: BottleneckType,

    /// Short human summary
    pub description: String,

    /// Analyzer-specific structured payload
    pub details: Value,
}

impl Bottleneck {
    /// Build a bottleneck from a typed details struct
    ///
    /// # Errors
    /// * `AnalysisError::Serialization` - details could not be converted to JSON
    pub fn new<T: Serialize>(
        kind: BottleneckType,
        description: impl Into<String>,
        details: &T,
    ) -> Result<Self, AnalysisError> {
        Ok(Self {
            kind,
            description: description.into(),
            details: serde_json::to_value(details)?,
        })
    }

    /// An `analysis_error` record, optionally naming the analyzer that failed
    pub fn analysis_error(analyzer: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        let description = match analyzer {
            Some(name) => format!("Analyzer '{}' failed: {}", name, message),
            None => message.clone(),
        };

        Self {
            kind: BottleneckType::AnalysisError,
            description,
            details: json!({ "analyzer": analyzer, "error": message }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == BottleneckType::AnalysisError
    }

    /// Empty every `recommendations` array inside `details`
    pub fn strip_recommendations(&mut self) {
        clear_recommendations(&mut self.details);
    }
}

fn clear_recommendations(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == "recommendations" {
                    *child = Value::Array(Vec::new());
                } else {
                    clear_recommendations(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(clear_recommendations),
        _ => {}
    }
}

/// Report envelope written by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Trace file that was analyzed
    pub source: String,

    /// Number of events loaded from the trace
    pub event_count: usize,

    /// Options the engine ran with
    pub options: AnalysisOptions,

    /// Engine output, in analyzer order
    pub bottlenecks: Vec<Bottleneck>,

    /// Timestamp when the report was generated
    pub generated_at: String,
}

impl AnalysisReport {
    pub fn error_count(&self) -> usize {
        self.bottlenecks.iter().filter(|b| b.is_error()).count()
    }
}
