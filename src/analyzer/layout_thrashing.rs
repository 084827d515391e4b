//! Layout-thrashing detection.
//!
//! Thrashing is the read → write → read pattern: script reads a layout
//! property, mutates the DOM, then reads again, forcing a second synchronous
//! layout. This module finds those sequences, attributes forced layouts to
//! the script running at the time, and ranks the call sites and DOM targets
//! involved.

use super::options::AnalysisOptions;
use super::schema::{Bottleneck, BottleneckType};
use crate::aggregator::{
    cluster_by_gap, collapse_stack, sorted_by_time, tally_top_frames, to_ms, top_n, Cluster,
    ClusterSummary, FrameStats,
};
use crate::parser::classify::{is_dom_mutation, is_layout_event, is_layout_read, is_script_event, is_style_event};
use crate::parser::payload::mutation_target;
use crate::parser::TraceEvent;
use crate::utils::config::{
    CLUSTER_GAP_MS, HEATMAP_SAMPLES, LAYOUT_FREQUENCY_ADVICE_COUNT, MICROS_PER_MS,
    STYLE_RECALC_ADVICE_COUNT, TOP_HEATMAP_TARGETS, TOP_OFFENDERS,
};
use crate::utils::error::AnalysisError;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutThrashingDetails {
    pub layout_event_count: usize,
    pub style_event_count: usize,
    pub total_layout_time_ms: f64,
    pub total_style_time_ms: f64,
    pub thrashing_sequences: Vec<ThrashingSequence>,
    pub thrashing_threshold: usize,
    pub exceeds_threshold: bool,
    pub forced_layouts: Vec<ForcedLayout>,
    pub dom_mutation_heatmap: Vec<HeatmapEntry>,
    pub worst_offenders: Vec<FrameStats>,
    pub layout_bursts: LayoutBursts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_selector: Option<String>,
    pub recommendations: Vec<String>,
}

/// One read → write(s) → read sequence
///
/// Times are in trace microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrashingSequence {
    pub first_read_time: f64,
    pub second_read_time: f64,
    pub time_between_reads: f64,
    pub mutation_count: usize,
    pub mutations: Vec<String>,
    /// Duration of the forced second layout
    pub impact: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcedLayout {
    pub name: String,
    pub start_time: f64,
    pub duration_ms: f64,
    pub stack: String,
    pub cause: Option<LayoutCause>,
}

/// Script execution whose span covers a forced layout
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutCause {
    pub name: String,
    pub start_time: f64,
    pub url: String,
    pub function_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapEntry {
    pub target: String,
    pub count: usize,
    pub focused: bool,
    pub samples: Vec<MutationSample>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSample {
    pub name: String,
    pub start_time: f64,
}

/// Layout events grouped with the 50ms gap rule
#[derive(Debug, Clone, Serialize)]
pub struct LayoutBursts {
    pub count: usize,
    pub largest: Option<ClusterSummary>,
}

/// Detect layout thrashing
///
/// **Public** - engine entry point for layout thrashing
///
/// # Returns
/// `Ok(None)` when the trace has no layout events
pub fn analyze_layout_thrashing(
    events: &[TraceEvent],
    options: &AnalysisOptions,
) -> Result<Option<Bottleneck>, AnalysisError> {
    let sorted = sorted_by_time(events)?;

    let layout_events: Vec<&TraceEvent> = sorted.iter().copied().filter(|e| is_layout_event(&e.name)).collect();
    if layout_events.is_empty() {
        return Ok(None);
    }

    let style_events: Vec<&TraceEvent> = sorted.iter().copied().filter(|e| is_style_event(&e.name)).collect();
    let mutations: Vec<&TraceEvent> = sorted.iter().copied().filter(|e| is_dom_mutation(&e.name)).collect();
    let scripts: Vec<&TraceEvent> = sorted.iter().copied().filter(|e| is_script_event(&e.name)).collect();
    let stacked_layouts: Vec<&TraceEvent> = layout_events.iter().copied().filter(|e| e.has_stack_trace()).collect();

    debug!(
        "Layout analysis: {} layout, {} style, {} mutation events",
        layout_events.len(),
        style_events.len(),
        mutations.len()
    );

    let thrashing_sequences = find_thrashing_sequences(&layout_events, &mutations);
    let forced_layouts = attribute_forced_layouts(&stacked_layouts, &scripts);
    let dom_mutation_heatmap = build_mutation_heatmap(&mutations, options.focus_selector.as_deref());
    let mut worst_offenders = tally_top_frames(&stacked_layouts);
    worst_offenders.truncate(TOP_OFFENDERS);
    let layout_bursts = summarize_bursts(&layout_events);

    let recommendations = build_recommendations(
        !thrashing_sequences.is_empty(),
        !forced_layouts.is_empty(),
        style_events.len(),
        layout_events.len(),
    );

    let details = LayoutThrashingDetails {
        layout_event_count: layout_events.len(),
        style_event_count: style_events.len(),
        total_layout_time_ms: to_ms(layout_events.iter().map(|e| e.duration()).sum()),
        total_style_time_ms: to_ms(style_events.iter().map(|e| e.duration()).sum()),
        exceeds_threshold: thrashing_sequences.len() >= options.layout_thrashing_threshold,
        thrashing_threshold: options.layout_thrashing_threshold,
        thrashing_sequences,
        forced_layouts,
        dom_mutation_heatmap,
        worst_offenders,
        layout_bursts,
        focus_selector: options.focus_selector.clone(),
        recommendations,
    };

    let description = format!(
        "{} layout thrashing sequence(s) and {} forced layout(s) across {} layout events",
        details.thrashing_sequences.len(),
        details.forced_layouts.len(),
        details.layout_event_count
    );

    Bottleneck::new(BottleneckType::LayoutThrashing, description, &details).map(Some)
}

/// Pair consecutive layout reads on one thread separated by at least one
/// DOM mutation on that thread
///
/// The second read must carry a captured stack: that is what marks it as
/// forced by script rather than scheduled by the renderer. Both inputs are
/// time-sorted.
pub fn find_thrashing_sequences(layout_events: &[&TraceEvent], mutations: &[&TraceEvent]) -> Vec<ThrashingSequence> {
    let reads: Vec<&TraceEvent> = layout_events.iter().copied().filter(|e| is_layout_read(&e.name)).collect();

    reads
        .iter()
        .enumerate()
        .filter(|(_, second)| second.has_stack_trace())
        .filter_map(|(i, &second)| {
            let first = reads[..i].iter().rev().find(|r| r.same_thread(second)).copied()?;

            let lo = mutations.partition_point(|m| m.start() <= first.start());
            let hi = mutations.partition_point(|m| m.start() < second.start()).max(lo);
            let between: Vec<&TraceEvent> = mutations[lo..hi]
                .iter()
                .copied()
                .filter(|m| m.same_thread(second))
                .collect();

            if between.is_empty() {
                return None;
            }

            Some(ThrashingSequence {
                first_read_time: first.start(),
                second_read_time: second.start(),
                time_between_reads: second.start() - first.start(),
                mutation_count: between.len(),
                mutations: between.iter().map(|m| m.name.clone()).collect(),
                impact: second.duration(),
            })
        })
        .collect()
}

/// Attribute each stack-bearing layout to the script running when it started
fn attribute_forced_layouts(stacked_layouts: &[&TraceEvent], scripts: &[&TraceEvent]) -> Vec<ForcedLayout> {
    stacked_layouts
        .iter()
        .map(|layout| {
            // Scripts are time-sorted, so the last covering one started most recently
            let started = scripts.partition_point(|s| s.start() <= layout.start());
            let cause = scripts[..started]
                .iter()
                .rev()
                .find(|s| layout.start() <= s.end() && s.same_thread(layout))
                .map(|s| {
                    let script = s.script_data();
                    LayoutCause {
                        name: s.name.clone(),
                        start_time: s.start(),
                        url: script.url_or_unknown().to_string(),
                        function_name: script.function_or_anonymous().to_string(),
                    }
                });

            ForcedLayout {
                name: layout.name.clone(),
                start_time: layout.start(),
                duration_ms: layout.duration_ms(),
                stack: collapse_stack(&layout.stack_trace()),
                cause,
            }
        })
        .collect()
}

/// Group mutations by target, most-mutated first
fn build_mutation_heatmap(mutations: &[&TraceEvent], focus_selector: Option<&str>) -> Vec<HeatmapEntry> {
    let mut groups: HashMap<String, Vec<&TraceEvent>> = HashMap::new();
    for event in mutations {
        groups.entry(mutation_target(event)).or_default().push(event);
    }

    let entries: Vec<HeatmapEntry> = groups
        .into_iter()
        .map(|(target, events)| HeatmapEntry {
            focused: focus_selector.is_some_and(|sel| !sel.is_empty() && target.contains(sel)),
            count: events.len(),
            samples: events
                .iter()
                .take(HEATMAP_SAMPLES)
                .map(|e| MutationSample { name: e.name.clone(), start_time: e.start() })
                .collect(),
            target,
        })
        .collect();

    top_n(entries, TOP_HEATMAP_TARGETS, |a, b| {
        b.count.cmp(&a.count).then_with(|| a.target.cmp(&b.target))
    })
}

fn summarize_bursts(layout_events: &[&TraceEvent]) -> LayoutBursts {
    let clusters = cluster_by_gap(layout_events, CLUSTER_GAP_MS * MICROS_PER_MS);
    // rev() so the earliest of equally large bursts wins
    let largest = clusters.iter().rev().max_by_key(|c| c.event_count()).map(Cluster::summary);

    LayoutBursts { count: clusters.len(), largest }
}

fn build_recommendations(
    has_thrashing: bool,
    has_forced_layouts: bool,
    style_count: usize,
    layout_count: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if has_thrashing {
        recommendations.push(
            "Batch DOM reads and writes: perform all layout reads first, then all mutations (e.g. via requestAnimationFrame)".to_string(),
        );
    }
    if has_forced_layouts {
        recommendations.push(
            "Avoid reading layout-triggering properties (offsetWidth, getBoundingClientRect, scrollTop) right after mutating the DOM".to_string(),
        );
    }
    if style_count > STYLE_RECALC_ADVICE_COUNT {
        recommendations.push(format!(
            "{} style recalculations: simplify selectors, reduce the number of affected elements, and prefer class toggles over inline style changes",
            style_count
        ));
    }
    if layout_count > LAYOUT_FREQUENCY_ADVICE_COUNT {
        recommendations.push(format!(
            "{} layout events: reduce layout frequency by animating transform/opacity and using CSS containment",
            layout_count
        ));
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stacked(name: &str, ts: f64, dur: f64, function: &str) -> TraceEvent {
        TraceEvent::new(name, ts).with_dur(dur).with_args(json!({
            "beginData": { "stackTrace": [{ "url": "app.js", "functionName": function, "lineNumber": 10 }] }
        }))
    }

    #[test]
    fn test_no_layout_events() {
        let events = vec![TraceEvent::new("Paint", 0.0)];
        assert!(analyze_layout_thrashing(&events, &AnalysisOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_read_write_read_sequence() {
        let events = vec![
            TraceEvent::new("Layout", 1_000.0).with_dur(100.0),
            TraceEvent::new("UpdateLayoutTree", 1_500.0).with_dur(50.0),
            stacked("Layout", 2_000.0, 300.0, "measure"),
        ];

        let b = analyze_layout_thrashing(&events, &AnalysisOptions::default()).unwrap().unwrap();
        let sequences = b.details["thrashingSequences"].as_array().unwrap();

        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0]["timeBetweenReads"], 1_000.0);
        assert_eq!(sequences[0]["impact"], 300.0);
        assert_eq!(sequences[0]["mutations"], json!(["UpdateLayoutTree"]));
    }

    #[test]
    fn test_no_mutation_between_reads() {
        let events = vec![
            TraceEvent::new("Layout", 1_000.0).with_dur(100.0),
            stacked("Layout", 2_000.0, 300.0, "measure"),
        ];
        let layouts: Vec<&TraceEvent> = events.iter().collect();
        assert!(find_thrashing_sequences(&layouts, &[]).is_empty());
    }

    #[test]
    fn test_reads_pair_within_one_thread() {
        let events = vec![
            TraceEvent::new("Layout", 1_000.0).with_dur(100.0).with_thread(1, 1),
            TraceEvent::new("Layout", 1_200.0).with_dur(100.0).with_thread(2, 9),
            TraceEvent::new("DOMNodeInserted", 1_400.0).with_thread(2, 9),
            TraceEvent::new("UpdateLayoutTree", 1_500.0).with_dur(50.0).with_thread(1, 1),
            stacked("Layout", 2_000.0, 300.0, "measure").with_thread(1, 1),
        ];
        let layouts: Vec<&TraceEvent> = events.iter().filter(|e| is_layout_event(&e.name)).collect();
        let mutations: Vec<&TraceEvent> = events.iter().filter(|e| is_dom_mutation(&e.name)).collect();

        let sequences = find_thrashing_sequences(&layouts, &mutations);

        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].first_read_time, 1_000.0);
        assert_eq!(sequences[0].mutations, vec!["UpdateLayoutTree".to_string()]);
    }

    #[test]
    fn test_mutations_from_other_threads_do_not_count() {
        let events = vec![
            TraceEvent::new("Layout", 1_000.0).with_dur(100.0).with_thread(1, 1),
            TraceEvent::new("DOMNodeInserted", 1_400.0).with_thread(1, 2),
            stacked("Layout", 2_000.0, 300.0, "measure").with_thread(1, 1),
        ];
        let layouts: Vec<&TraceEvent> = vec![&events[0], &events[2]];
        let mutations: Vec<&TraceEvent> = vec![&events[1]];

        assert!(find_thrashing_sequences(&layouts, &mutations).is_empty());
    }

    #[test]
    fn test_forced_layout_attribution() {
        let events = vec![
            TraceEvent::new("FunctionCall", 0.0)
                .with_dur(10_000.0)
                .with_args(json!({ "data": { "url": "outer.js", "functionName": "outer" } })),
            TraceEvent::new("FunctionCall", 1_000.0)
                .with_dur(5_000.0)
                .with_args(json!({ "data": { "url": "inner.js", "functionName": "inner" } })),
            stacked("Layout", 2_000.0, 500.0, "inner"),
            stacked("Layout", 20_000.0, 500.0, "orphan"),
        ];

        let b = analyze_layout_thrashing(&events, &AnalysisOptions::default()).unwrap().unwrap();
        let forced = b.details["forcedLayouts"].as_array().unwrap();

        assert_eq!(forced.len(), 2);
        assert_eq!(forced[0]["cause"]["functionName"], "inner");
        assert_eq!(forced[0]["cause"]["url"], "inner.js");
        assert!(forced[1]["cause"].is_null());
    }

    #[test]
    fn test_heatmap_ranking_and_focus() {
        let mut events = vec![TraceEvent::new("Layout", 0.0)];
        for i in 0..3 {
            events.push(
                TraceEvent::new("InvalidateLayout", 10.0 + i as f64)
                    .with_args(json!({ "data": { "nodeName": "DIV.card" } })),
            );
        }
        events.push(TraceEvent::new("InvalidateLayout", 20.0).with_args(json!({ "data": { "tagName": "SPAN" } })));
        events.push(TraceEvent::new("InvalidateLayout", 30.0));

        let options = AnalysisOptions { focus_selector: Some("card".to_string()), ..Default::default() };
        let b = analyze_layout_thrashing(&events, &options).unwrap().unwrap();
        let heatmap = b.details["domMutationHeatmap"].as_array().unwrap();

        assert_eq!(heatmap.len(), 3);
        assert_eq!(heatmap[0]["target"], "DIV.card");
        assert_eq!(heatmap[0]["count"], 3);
        assert_eq!(heatmap[0]["focused"], true);
        assert_eq!(heatmap[1]["target"], "SPAN");
        assert_eq!(heatmap[2]["target"], "unknown");
        assert_eq!(b.details["focusSelector"], "card");
    }

    #[test]
    fn test_worst_offenders_limited() {
        let events: Vec<TraceEvent> = (0..12)
            .map(|i| stacked("Layout", i as f64 * 100.0, 1_000.0, &format!("fn{}", i)))
            .collect();

        let b = analyze_layout_thrashing(&events, &AnalysisOptions::default()).unwrap().unwrap();
        assert_eq!(b.details["worstOffenders"].as_array().unwrap().len(), 10);
        assert_eq!(b.details["worstOffenders"][0]["count"], 1);
        assert_eq!(b.details["worstOffenders"][0]["averageDurationMs"], 1.0);
    }

    #[test]
    fn test_recommendations_are_additive() {
        let recs = build_recommendations(true, true, 51, 101);
        assert_eq!(recs.len(), 4);
        assert!(build_recommendations(false, false, 50, 100).is_empty());
    }

    #[test]
    fn test_layout_bursts() {
        let events = vec![
            TraceEvent::new("Layout", 0.0),
            TraceEvent::new("Layout", 10_000.0),
            TraceEvent::new("Layout", 20_000.0),
            TraceEvent::new("Layout", 500_000.0),
        ];
        let b = analyze_layout_thrashing(&events, &AnalysisOptions::default()).unwrap().unwrap();
        assert_eq!(b.details["layoutBursts"]["count"], 2);
        assert_eq!(b.details["layoutBursts"]["largest"]["eventCount"], 3);
    }
}
