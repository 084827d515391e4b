//! CSS cascade impact.
//!
//! Groups style recalculations into bursts and guesses which bursts were
//! caused by script writing CSS custom properties. Depth and width are coarse
//! magnitude bands, not a trace of the real cascade.

use super::heuristics::looks_like_style_script;
use super::schema::{Bottleneck, BottleneckType};
use crate::aggregator::{cluster_by_gap, nearest_ended_before, sorted_by_time, to_ms, ClusterSummary};
use crate::parser::classify::is_script_event;
use crate::parser::payload::EventPayload;
use crate::parser::TraceEvent;
use crate::utils::config::{
    CLUSTER_GAP_MS, LONG_RECALC_MS, MICROS_PER_MS, RECALC_SCRIPT_LOOKBACK_MS, SCRIPT_LOOKBACK_MS,
    TOP_RECALC_BOTTLENECKS,
};
use crate::utils::error::AnalysisError;
use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CssVariablesImpact {
    pub variables_detected: bool,
    pub variable_changes: Vec<VariableChange>,
    pub cascade_impact: CascadeImpact,
    pub recalculation_bottlenecks: Vec<RecalcBottleneck>,
    pub recommendations: Vec<String>,
}

/// A recalc burst preceded by a script that looks like it touched styles
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableChange {
    pub script: ScriptRef,
    pub cluster_start: f64,
    pub cluster_end: f64,
    pub affected_recalculations: usize,
    pub total_recalc_duration_ms: f64,
    /// Dimensionless: event count × total duration (µs) / 1e6
    pub impact_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRef {
    pub name: String,
    pub start_time: f64,
    pub url: String,
    pub function_name: String,
}

impl ScriptRef {
    fn from_event(event: &TraceEvent) -> Self {
        let data = event.script_data();
        Self {
            name: event.name.clone(),
            start_time: event.start(),
            url: data.url_or_unknown().to_string(),
            function_name: data.function_or_anonymous().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeImpact {
    /// 1..=4 from the longest single recalc
    pub depth: u8,
    /// 1..=4 from the number of recalcs
    pub width: u8,
    pub total_recalculations: usize,
    pub total_recalc_time_ms: f64,
    pub max_recalc_ms: f64,
    pub clusters: Vec<ClusterSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcBottleneck {
    pub start_time: f64,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_count: Option<u64>,
    pub triggered_by: Option<ScriptRef>,
}

impl CssVariablesImpact {
    /// Wrap as a `css_variables_impact` bottleneck
    pub fn to_bottleneck(&self) -> Result<Bottleneck, AnalysisError> {
        let description = format!(
            "{} style recalculation(s) totaling {:.1}ms in {} burst(s); {} possible CSS variable change(s)",
            self.cascade_impact.total_recalculations,
            self.cascade_impact.total_recalc_time_ms,
            self.cascade_impact.clusters.len(),
            self.variable_changes.len()
        );
        Bottleneck::new(BottleneckType::CssVariablesImpact, description, self)
    }
}

/// Estimate the cost of style recalculation and its likely script causes
///
/// **Public** - engine entry point for CSS analysis
///
/// # Arguments
/// * `style_events` - `RecalculateStyles` events
/// * `all_events` - Full event list, searched for script causes
pub fn analyze_css_variables_impact(
    style_events: &[&TraceEvent],
    all_events: &[TraceEvent],
) -> Result<CssVariablesImpact, AnalysisError> {
    let recalcs = sorted_by_time(style_events.iter().copied())?;
    let scripts = sorted_by_time(all_events.iter().filter(|e| is_script_event(&e.name)))?;
    debug!("Analyzing {} style recalculations against {} scripts", recalcs.len(), scripts.len());

    let clusters = cluster_by_gap(&recalcs, CLUSTER_GAP_MS * MICROS_PER_MS);

    let variable_changes: Vec<VariableChange> = clusters
        .iter()
        .filter_map(|cluster| {
            let (script, _) =
                nearest_ended_before(&scripts, cluster.start_time, SCRIPT_LOOKBACK_MS * MICROS_PER_MS)?;
            if !looks_like_style_script(&script.script_data()) {
                return None;
            }
            Some(VariableChange {
                script: ScriptRef::from_event(script),
                cluster_start: cluster.start_time,
                cluster_end: cluster.end_time,
                affected_recalculations: cluster.event_count(),
                total_recalc_duration_ms: to_ms(cluster.total_duration),
                impact_score: cluster.event_count() as f64 * cluster.total_duration / 1_000_000.0,
            })
        })
        .collect();

    let max_recalc_ms = recalcs.iter().map(|e| e.duration_ms()).fold(0.0, f64::max);
    let cascade_impact = CascadeImpact {
        depth: cascade_depth(max_recalc_ms),
        width: cascade_width(recalcs.len()),
        total_recalculations: recalcs.len(),
        total_recalc_time_ms: to_ms(recalcs.iter().map(|e| e.duration()).sum()),
        max_recalc_ms,
        clusters: clusters.iter().map(|c| c.summary()).collect(),
    };

    let recalculation_bottlenecks = longest_recalcs(&recalcs, &scripts);
    let recommendations = build_recommendations(&variable_changes, &cascade_impact, &recalculation_bottlenecks);

    Ok(CssVariablesImpact {
        variables_detected: !variable_changes.is_empty(),
        variable_changes,
        cascade_impact,
        recalculation_bottlenecks,
        recommendations,
    })
}

fn cascade_depth(max_recalc_ms: f64) -> u8 {
    match max_recalc_ms {
        ms if ms > 20.0 => 4,
        ms if ms > 10.0 => 3,
        ms if ms > 5.0 => 2,
        _ => 1,
    }
}

fn cascade_width(recalc_count: usize) -> u8 {
    match recalc_count {
        n if n > 100 => 4,
        n if n > 50 => 3,
        n if n > 20 => 2,
        _ => 1,
    }
}

/// The longest recalcs over the threshold, each with the script running just before
fn longest_recalcs(recalcs: &[&TraceEvent], scripts: &[&TraceEvent]) -> Vec<RecalcBottleneck> {
    let window_us = RECALC_SCRIPT_LOOKBACK_MS * MICROS_PER_MS;

    let mut long: Vec<&TraceEvent> = recalcs
        .iter()
        .copied()
        .filter(|e| e.duration_ms() > LONG_RECALC_MS)
        .collect();
    long.sort_by(|a, b| b.duration().total_cmp(&a.duration()).then(a.ts.total_cmp(&b.ts)));
    long.truncate(TOP_RECALC_BOTTLENECKS);

    long.into_iter()
        .map(|recalc| {
            let triggered_by = scripts
                .iter()
                .rev()
                .find(|s| s.start() <= recalc.start() && recalc.start() - s.end() <= window_us)
                .map(|s| ScriptRef::from_event(s));

            let element_count = match recalc.payload() {
                EventPayload::RecalculateStyles(style) => style.element_count,
                _ => None,
            };

            RecalcBottleneck {
                start_time: recalc.start(),
                duration_ms: recalc.duration_ms(),
                element_count,
                triggered_by,
            }
        })
        .collect()
}

fn build_recommendations(
    changes: &[VariableChange],
    cascade: &CascadeImpact,
    bottlenecks: &[RecalcBottleneck],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if !changes.is_empty() {
        recommendations.push(format!(
            "{} recalculation burst(s) follow style-related scripts: set custom properties on the narrowest element instead of :root",
            changes.len()
        ));
    }
    if cascade.depth >= 3 {
        recommendations.push(format!(
            "Longest style recalculation took {:.1}ms: simplify selectors and reduce custom property nesting",
            cascade.max_recalc_ms
        ));
    }
    if cascade.width >= 3 {
        recommendations.push(format!(
            "{} style recalculations: batch style writes and isolate components with `contain: style`",
            cascade.total_recalculations
        ));
    }
    if bottlenecks.iter().any(|b| b.triggered_by.is_some()) {
        recommendations.push(
            "Long recalculations start right after script: move style changes into requestAnimationFrame or toggle classes instead of inline styles"
                .to_string(),
        );
    }

    recommendations
}
