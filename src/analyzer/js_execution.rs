//! JavaScript ↔ layout correlation.
//!
//! Links each layout to the script execution that ended closest before it
//! (within 100ms), then aggregates the impact per `(url, function)`.
//! Also ranks call-stack frames on forced layouts and evaluated script URLs.

use super::schema::{Bottleneck, BottleneckType};
use crate::aggregator::{nearest_ended_before, sorted_by_time, tally_all_frames, to_ms, top_n, DurationStats, FrameStats};
use crate::parser::classify::{is_layout_event, is_script_event};
use crate::parser::TraceEvent;
use crate::utils::config::{
    CORRELATION_BATCHING_COUNT, CORRELATION_SAMPLES, DEEP_CALL_STACK_OCCURRENCES,
    EVALUATE_SCRIPT_EVENT_NAME, MICROS_PER_MS, SCRIPT_GROUP_SPLIT_MS, SCRIPT_LOOKBACK_MS,
    TOP_CALL_STACK_FRAMES, TOP_OFFENDERS, TOTAL_SCRIPT_REDUCTION_MS,
};
use crate::utils::error::AnalysisError;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaScriptExecutionDetails {
    pub script_event_count: usize,
    pub total_script_time_ms: f64,
    pub correlation_count: usize,
    pub layout_triggering_scripts: Vec<ScriptLayoutImpact>,
    pub call_stack_hotspots: Vec<FrameStats>,
    pub script_evaluations: Vec<ScriptEvaluation>,
    pub recommendations: Vec<String>,
}

/// Layouts attributed to one `(url, function)`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptLayoutImpact {
    pub url: String,
    pub function_name: String,
    pub layouts_triggered: usize,
    pub total_layout_duration_ms: f64,
    pub samples: Vec<Correlation>,
}

/// One script → layout pairing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    pub script_start: f64,
    pub script_end: f64,
    pub layout_start: f64,
    /// `layoutStart - scriptEnd`
    pub time_between_ms: f64,
    pub layout_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEvaluation {
    pub url: String,
    #[serde(flatten)]
    pub stats: DurationStats,
}

/// Correlate script execution with the layouts it triggers
///
/// **Public** - engine entry point for JavaScript analysis
///
/// # Returns
/// `Ok(None)` when the trace has no script-execution events
pub fn analyze_javascript_execution(events: &[TraceEvent]) -> Result<Option<Bottleneck>, AnalysisError> {
    let sorted = sorted_by_time(events)?;

    let scripts: Vec<&TraceEvent> = sorted.iter().copied().filter(|e| is_script_event(&e.name)).collect();
    if scripts.is_empty() {
        return Ok(None);
    }
    let layouts: Vec<&TraceEvent> = sorted.iter().copied().filter(|e| is_layout_event(&e.name)).collect();

    let correlations = correlate_layouts(&scripts, &layouts);
    debug!("Correlated {} of {} layouts with script execution", correlations.len(), layouts.len());

    let correlation_count = correlations.len();
    let layout_triggering_scripts = aggregate_by_script(correlations);

    let stacked: Vec<&TraceEvent> = layouts.iter().copied().filter(|e| e.has_stack_trace()).collect();
    let all_frames = tally_all_frames(&stacked);
    let deepest_repeat = all_frames.first().map(|f| f.count()).unwrap_or(0);
    let call_stack_hotspots: Vec<FrameStats> = all_frames.into_iter().take(TOP_CALL_STACK_FRAMES).collect();

    let script_evaluations = rank_script_evaluations(&scripts);
    let total_script_time_ms = to_ms(scripts.iter().map(|e| e.duration()).sum());

    let recommendations = build_recommendations(
        correlation_count,
        layout_triggering_scripts.first(),
        &script_evaluations,
        total_script_time_ms,
        deepest_repeat,
        call_stack_hotspots.first(),
    );

    let details = JavaScriptExecutionDetails {
        script_event_count: scripts.len(),
        total_script_time_ms,
        correlation_count,
        layout_triggering_scripts,
        call_stack_hotspots,
        script_evaluations,
        recommendations,
    };

    let description = format!(
        "{} script execution(s) totaling {:.1}ms; {} layout(s) triggered shortly after script",
        details.script_event_count, total_script_time_ms, correlation_count
    );

    Bottleneck::new(BottleneckType::JavascriptExecution, description, &details).map(Some)
}

/// Pair each layout with the script that ended closest before it
fn correlate_layouts<'a>(
    scripts: &[&'a TraceEvent],
    layouts: &[&'a TraceEvent],
) -> Vec<(&'a TraceEvent, Correlation)> {
    let window_us = SCRIPT_LOOKBACK_MS * MICROS_PER_MS;

    layouts
        .iter()
        .filter_map(|layout| {
            let (script, gap) = nearest_ended_before(scripts, layout.start(), window_us)?;
            Some((
                script,
                Correlation {
                    script_start: script.start(),
                    script_end: script.end(),
                    layout_start: layout.start(),
                    time_between_ms: to_ms(gap),
                    layout_duration_ms: layout.duration_ms(),
                },
            ))
        })
        .collect()
}

/// Group pairings by script identity, most layouts first
fn aggregate_by_script(correlations: Vec<(&TraceEvent, Correlation)>) -> Vec<ScriptLayoutImpact> {
    let mut groups: HashMap<(String, String), ScriptLayoutImpact> = HashMap::new();

    for (script, correlation) in correlations {
        let data = script.script_data();
        let url = data.url_or_unknown().to_string();
        let function_name = data.function_or_anonymous().to_string();

        let entry = groups
            .entry((url.clone(), function_name.clone()))
            .or_insert_with(|| ScriptLayoutImpact {
                url,
                function_name,
                layouts_triggered: 0,
                total_layout_duration_ms: 0.0,
                samples: Vec::new(),
            });

        entry.layouts_triggered += 1;
        entry.total_layout_duration_ms += correlation.layout_duration_ms;
        if entry.samples.len() < CORRELATION_SAMPLES {
            entry.samples.push(correlation);
        }
    }

    top_n(groups.into_values().collect(), TOP_OFFENDERS, |a, b| {
        b.layouts_triggered
            .cmp(&a.layouts_triggered)
            .then(b.total_layout_duration_ms.total_cmp(&a.total_layout_duration_ms))
            .then_with(|| a.url.cmp(&b.url))
            .then_with(|| a.function_name.cmp(&b.function_name))
    })
}

/// `EvaluateScript` time per URL, most expensive first
fn rank_script_evaluations(scripts: &[&TraceEvent]) -> Vec<ScriptEvaluation> {
    let mut by_url: HashMap<String, DurationStats> = HashMap::new();
    for event in scripts.iter().filter(|e| e.name == EVALUATE_SCRIPT_EVENT_NAME) {
        let url = event.script_data().url_or_unknown().to_string();
        by_url.entry(url).or_default().record(event.duration());
    }

    let evaluations = by_url
        .into_iter()
        .map(|(url, stats)| ScriptEvaluation { url, stats })
        .collect();

    top_n(evaluations, TOP_OFFENDERS, |a, b| {
        b.stats
            .total_duration_ms
            .total_cmp(&a.stats.total_duration_ms)
            .then_with(|| a.url.cmp(&b.url))
    })
}

fn build_recommendations(
    correlation_count: usize,
    top_script: Option<&ScriptLayoutImpact>,
    evaluations: &[ScriptEvaluation],
    total_script_time_ms: f64,
    deepest_repeat: usize,
    top_frame: Option<&FrameStats>,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if correlation_count > CORRELATION_BATCHING_COUNT {
        let culprit = top_script
            .map(|s| format!(" (worst offender: {} in {})", s.function_name, s.url))
            .unwrap_or_default();
        recommendations.push(format!(
            "{} layouts followed script execution: batch DOM updates and avoid interleaving reads and writes{}",
            correlation_count, culprit
        ));
    }
    for evaluation in evaluations.iter().filter(|e| e.stats.total_duration_ms > SCRIPT_GROUP_SPLIT_MS) {
        recommendations.push(format!(
            "{} spends {:.1}ms evaluating: split the bundle and lazy-load code that is not needed at startup",
            evaluation.url, evaluation.stats.total_duration_ms
        ));
    }
    if total_script_time_ms > TOTAL_SCRIPT_REDUCTION_MS {
        recommendations.push(format!(
            "Total script execution is {:.1}ms: remove unused JavaScript, defer third-party scripts, and minimize main-thread work",
            total_script_time_ms
        ));
    }
    if deepest_repeat >= DEEP_CALL_STACK_OCCURRENCES {
        if let Some(frame) = top_frame {
            recommendations.push(format!(
                "{} appears on {} layout-forcing stacks: flatten the call chain or cache layout reads",
                frame.function_name,
                frame.count()
            ));
        }
    }

    recommendations
}
