//! Bottleneck aggregation.
//!
//! Runs the analyzers in a fixed order and concatenates their output. A
//! failing analyzer, whether it returns an error or panics, is replaced by an
//! `analysis_error` record and the others still run.

use super::css_variables::analyze_css_variables_impact;
use super::js_execution::analyze_javascript_execution;
use super::layout_thrashing::analyze_layout_thrashing;
use super::long_tasks::analyze_long_tasks;
use super::memory_dom::analyze_memory_and_dom_growth;
use super::normalizer::normalize;
use super::options::AnalysisOptions;
use super::resource_loading::analyze_resource_loading;
use super::schema::Bottleneck;
use crate::parser::{EventSets, TraceEvent};
use crate::utils::error::{AnalysisError, NormalizeError};
use log::{debug, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Analyze a trace and return every bottleneck found
///
/// **Public** - main engine entry point
///
/// Never fails and never panics: problems are reported as `analysis_error`
/// bottlenecks. Empty input yields exactly one of them.
///
/// # Arguments
/// * `raw_events` - Trace events in capture order
/// * `options` - Analyzer switches and thresholds
///
/// # Example
/// ```ignore
/// let events = load_trace_file("trace.json")?;
/// let bottlenecks = analyze_trace_data(&events, &AnalysisOptions::default());
/// ```
pub fn analyze_trace_data(raw_events: &[TraceEvent], options: &AnalysisOptions) -> Vec<Bottleneck> {
    match panic::catch_unwind(AssertUnwindSafe(|| run_pipeline(raw_events, options))) {
        Ok(bottlenecks) => bottlenecks,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("Analysis pipeline aborted: {}", message);
            vec![Bottleneck::analysis_error(None, format!("Analysis failed: {}", message))]
        }
    }
}

fn run_pipeline(raw_events: &[TraceEvent], options: &AnalysisOptions) -> Vec<Bottleneck> {
    let events = match normalize(raw_events, options.focus_time_range_ms.as_deref()) {
        Ok(events) if !events.is_empty() => events,
        Ok(_) => return vec![Bottleneck::analysis_error(None, NormalizeError::NoEvents.to_string())],
        Err(e) => return vec![Bottleneck::analysis_error(None, e.to_string())],
    };

    info!("Analyzing {} trace events", events.len());
    let sets = EventSets::from_events(&events);
    debug!(
        "Sub-filters: {} layout, {} style, {} script, {} memory, {} dom",
        sets.layout.len(),
        sets.style.len(),
        sets.script.len(),
        sets.memory.len(),
        sets.dom.len()
    );

    let mut bottlenecks = Vec::new();

    if options.analyze_long_tasks {
        bottlenecks.extend(run_isolated("long_tasks", || {
            analyze_long_tasks(&events, options.long_task_threshold_ms, options.detail_level)
                .map(|found| found.into_iter().collect())
        }));
    }

    if options.analyze_layout_thrashing {
        bottlenecks.extend(run_isolated("layout_thrashing", || {
            analyze_layout_thrashing(&events, options).map(|found| found.into_iter().collect())
        }));
    }

    if options.analyze_js_execution {
        bottlenecks.extend(run_isolated("javascript_execution", || {
            analyze_javascript_execution(&events).map(|found| found.into_iter().collect())
        }));
    }

    if options.analyze_css_variables && !sets.style.is_empty() {
        bottlenecks.extend(run_isolated("css_variables", || {
            let impact = analyze_css_variables_impact(&sets.style, &events)?;
            Ok(vec![impact.to_bottleneck()?])
        }));
    }

    if options.analyze_memory_and_dom && (!sets.memory.is_empty() || !sets.dom.is_empty()) {
        bottlenecks.extend(run_isolated("memory_dom", || {
            let analysis =
                analyze_memory_and_dom_growth(&sets.memory, &sets.dom, &events, options.memory_leak_threshold_kb)?;
            Ok(vec![analysis.to_bottleneck()?])
        }));
    }

    if options.analyze_resource_loading {
        bottlenecks.extend(run_isolated("resource_loading", || analyze_resource_loading(&events)));
    }

    if !options.include_recommendations {
        bottlenecks.iter_mut().for_each(Bottleneck::strip_recommendations);
    }

    info!(
        "Found {} bottleneck(s), {} analyzer error(s)",
        bottlenecks.len(),
        bottlenecks.iter().filter(|b| b.is_error()).count()
    );
    bottlenecks
}

/// Run one analyzer, converting an error or a panic into an `analysis_error`
fn run_isolated<F>(name: &str, analyzer: F) -> Vec<Bottleneck>
where
    F: FnOnce() -> Result<Vec<Bottleneck>, AnalysisError>,
{
    debug!("Running analyzer '{}'", name);

    match panic::catch_unwind(AssertUnwindSafe(analyzer)) {
        Ok(Ok(found)) => found,
        Ok(Err(e)) => {
            warn!("Analyzer '{}' failed: {}", name, e);
            vec![Bottleneck::analysis_error(Some(name), e.to_string())]
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("Analyzer '{}' panicked: {}", name, message);
            vec![Bottleneck::analysis_error(Some(name), message)]
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::schema::BottleneckType;
    use serde_json::json;

    #[test]
    fn test_empty_input_single_error() {
        let out = analyze_trace_data(&[], &AnalysisOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, BottleneckType::AnalysisError);
        assert_eq!(out[0].description, "No trace events found");
    }

    #[test]
    fn test_window_that_filters_everything() {
        let options = AnalysisOptions {
            focus_time_range_ms: Some("500-600".into()),
            ..AnalysisOptions::default()
        };
        let out = analyze_trace_data(&[TraceEvent::new("Layout", 0.0)], &options);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_error());
    }

    #[test]
    fn test_run_isolated_catches_errors_and_panics() {
        let failed = run_isolated("broken", || {
            Err(AnalysisError::InvalidTimestamp { name: "Layout".into() })
        });
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].details["analyzer"], "broken");

        let panicked = run_isolated("exploding", || panic!("boom"));
        assert_eq!(panicked[0].details["error"], "boom");
        assert!(panicked[0].description.contains("exploding"));
    }

    #[test]
    fn test_invalid_timestamp_isolated_per_analyzer() {
        let events = vec![
            TraceEvent::new("Layout", 0.0).with_dur(60_000.0),
            TraceEvent::new("ResourceSendRequest", f64::NAN),
        ];

        let out = analyze_trace_data(&events, &AnalysisOptions::default());

        // every analyzer that sorts the full event list reports the bad timestamp
        let errors: Vec<&str> = out
            .iter()
            .filter(|b| b.is_error())
            .filter_map(|b| b.details["analyzer"].as_str())
            .collect();
        assert!(errors.contains(&"long_tasks"));
        assert!(errors.contains(&"resource_loading"));
    }

    #[test]
    fn test_gating_and_order() {
        let events = vec![
            TraceEvent::new("Layout", 0.0).with_dur(60_000.0),
            TraceEvent::new("UpdateCounters", 100_000.0).with_args(json!({ "data": { "nodes": 10 } })),
        ];
        let options = AnalysisOptions {
            analyze_layout_thrashing: false,
            ..AnalysisOptions::default()
        };

        let kinds: Vec<BottleneckType> = analyze_trace_data(&events, &options).iter().map(|b| b.kind).collect();

        assert_eq!(kinds, vec![BottleneckType::LongTasks, BottleneckType::MemoryDomGrowth]);
    }

    #[test]
    fn test_recommendations_stripped() {
        let events = vec![TraceEvent::new("Layout", 0.0).with_dur(60_000.0)];
        let options = AnalysisOptions {
            include_recommendations: false,
            ..AnalysisOptions::default()
        };

        for bottleneck in analyze_trace_data(&events, &options) {
            if let Some(recs) = bottleneck.details.get("recommendations") {
                assert_eq!(recs, &json!([]));
            }
        }
    }
}
