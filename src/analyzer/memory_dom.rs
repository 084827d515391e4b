//! Heap, DOM and event-listener growth.
//!
//! Every leak reported here is a heuristic over `UpdateCounters` snapshots:
//! a sustained upward slope, not proof of retention.

use super::schema::{Bottleneck, BottleneckType};
use crate::aggregator::{growth_rate, sorted_by_time, top_n};
use crate::parser::classify::{is_gc_event, MutationDirection};
use crate::parser::payload::{mutation_target, CounterData, EventPayload};
use crate::parser::TraceEvent;
use crate::utils::config::{
    BYTES_PER_KB, DOM_GROWTH_MIN_NODES, DOM_GROWTH_RATE_PER_SEC, HEAP_LIMIT_USAGE_RATIO,
    HEAP_TREND_KB_PER_SEC, LARGE_DOM_NODES, LISTENER_GROWTH_MIN, LISTENER_GROWTH_RATE_PER_SEC,
    LISTENER_TO_NODE_RATIO, MICROS_PER_SEC, NODE_TREND_PER_SEC, SUSTAINED_GROWTH_SECS,
    TOP_ELEMENT_GROWTH,
};
use crate::utils::error::AnalysisError;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDomAnalysis {
    pub memory_usage: MemoryUsage,
    pub dom_size: DomSize,
    pub potential_leaks: Vec<PotentialLeak>,
    pub event_listener_leaks: Vec<PotentialLeak>,
    pub element_growth: Vec<ElementGrowth>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    RapidlyIncreasing,
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    fn from_rate(rate: f64, (rapid, rising): (f64, f64)) -> Self {
        if rate > rapid {
            Self::RapidlyIncreasing
        } else if rate > rising {
            Self::Increasing
        } else if rate < -rising {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }
}

/// Heap readings in KB
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub snapshot_count: usize,
    pub initial_kb: Option<f64>,
    pub final_kb: Option<f64>,
    pub peak_kb: Option<f64>,
    pub limit_kb: Option<f64>,
    pub growth_rate_kb_per_sec: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSize {
    pub initial_nodes: Option<f64>,
    pub final_nodes: Option<f64>,
    pub peak_nodes: Option<f64>,
    pub growth_rate_per_sec: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakKind {
    ContinuousMemoryGrowth,
    ContinuousDomGrowth,
    EventListenerGrowth,
    DisproportionateListenerGrowth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PotentialLeak {
    #[serde(rename = "type")]
    pub kind: LeakKind,
    pub severity: Severity,
    pub description: String,
    pub growth_rate: f64,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementGrowth {
    pub node_type: String,
    pub additions: usize,
    pub removals: usize,
    pub net_growth: i64,
}

/// First, last and peak of one counter across the snapshots that report it
#[derive(Debug, Clone, Copy)]
struct Series {
    first: (f64, f64),
    last: (f64, f64),
    peak: f64,
}

impl Series {
    fn collect(snapshots: &[(f64, CounterData)], pick: fn(&CounterData) -> Option<f64>) -> Option<Self> {
        let mut readings = snapshots.iter().filter_map(|(ts, c)| pick(c).map(|v| (*ts, v)));
        let first = readings.next()?;
        Some(readings.fold(
            Self { first, last: first, peak: first.1 },
            |series, reading| Self {
                last: reading,
                peak: series.peak.max(reading.1),
                ..series
            },
        ))
    }

    fn rate(&self) -> f64 {
        growth_rate(self.first, self.last)
    }

    fn net(&self) -> f64 {
        self.last.1 - self.first.1
    }

    fn duration_secs(&self) -> f64 {
        (self.last.0 - self.first.0) / MICROS_PER_SEC
    }
}

impl MemoryDomAnalysis {
    /// Wrap as a `memory_dom_growth` bottleneck
    pub fn to_bottleneck(&self) -> Result<Bottleneck, AnalysisError> {
        let description = format!(
            "Heap {:.1} KB/s, DOM {:.1} nodes/s; {} potential leak(s), {} listener leak(s)",
            self.memory_usage.growth_rate_kb_per_sec,
            self.dom_size.growth_rate_per_sec,
            self.potential_leaks.len(),
            self.event_listener_leaks.len()
        );
        Bottleneck::new(BottleneckType::MemoryDomGrowth, description, self)
    }
}

/// Track heap, DOM and listener growth and flag likely leaks
///
/// **Public** - engine entry point for memory analysis
///
/// # Arguments
/// * `memory_events` - `UpdateCounters` and GC events
/// * `dom_events` - DOM mutation events
/// * `all_events` - Full event list, searched for GC activity
/// * `leak_threshold_kb` - Heap growth (KB/s) above which a leak is suspected
pub fn analyze_memory_and_dom_growth(
    memory_events: &[&TraceEvent],
    dom_events: &[&TraceEvent],
    all_events: &[TraceEvent],
    leak_threshold_kb: f64,
) -> Result<MemoryDomAnalysis, AnalysisError> {
    let sorted = sorted_by_time(memory_events.iter().copied())?;
    let snapshots: Vec<(f64, CounterData)> = sorted
        .iter()
        .filter_map(|e| match e.payload() {
            EventPayload::Counters(counters) => Some((e.start(), counters)),
            _ => None,
        })
        .collect();
    debug!("Collected {} counter snapshots", snapshots.len());

    let heap = Series::collect(&snapshots, |c| c.js_heap_size_used);
    let limit = Series::collect(&snapshots, |c| c.js_heap_size_limit);
    let nodes = Series::collect(&snapshots, |c| c.nodes);
    let listeners = Series::collect(&snapshots, |c| c.js_event_listeners);

    let heap_rate_kb = heap.map(|s| s.rate() / BYTES_PER_KB).unwrap_or(0.0);
    let memory_usage = MemoryUsage {
        snapshot_count: snapshots.len(),
        initial_kb: heap.map(|s| s.first.1 / BYTES_PER_KB),
        final_kb: heap.map(|s| s.last.1 / BYTES_PER_KB),
        peak_kb: heap.map(|s| s.peak / BYTES_PER_KB),
        limit_kb: limit.map(|s| s.peak / BYTES_PER_KB),
        growth_rate_kb_per_sec: heap_rate_kb,
        trend: Trend::from_rate(heap_rate_kb, HEAP_TREND_KB_PER_SEC),
    };

    let node_rate = nodes.map(|s| s.rate()).unwrap_or(0.0);
    let dom_size = DomSize {
        initial_nodes: nodes.map(|s| s.first.1),
        final_nodes: nodes.map(|s| s.last.1),
        peak_nodes: nodes.map(|s| s.peak),
        growth_rate_per_sec: node_rate,
        trend: Trend::from_rate(node_rate, NODE_TREND_PER_SEC),
    };

    let mut potential_leaks = Vec::new();
    if let Some(heap) = heap {
        let rate = heap.rate() / BYTES_PER_KB;
        if rate > leak_threshold_kb && heap.duration_secs() > SUSTAINED_GROWTH_SECS {
            let gc_seen = all_events
                .iter()
                .any(|e| is_gc_event(&e.name) && e.ts >= heap.first.0 && e.ts <= heap.last.0);
            let severity = if gc_seen { Severity::High } else { Severity::Medium };
            potential_leaks.push(PotentialLeak {
                kind: LeakKind::ContinuousMemoryGrowth,
                severity,
                description: format!(
                    "JS heap grew {:.1} KB/s for {:.1}s{}",
                    rate,
                    heap.duration_secs(),
                    if gc_seen { " despite garbage collection" } else { "" }
                ),
                growth_rate: rate,
                duration_secs: heap.duration_secs(),
            });
        }
    }
    if let Some(nodes) = nodes {
        if nodes.rate() > DOM_GROWTH_RATE_PER_SEC
            && nodes.duration_secs() > SUSTAINED_GROWTH_SECS
            && nodes.net() >= DOM_GROWTH_MIN_NODES
        {
            potential_leaks.push(PotentialLeak {
                kind: LeakKind::ContinuousDomGrowth,
                severity: Severity::Medium,
                description: format!(
                    "DOM grew by {} nodes ({:.1}/s) over {:.1}s",
                    nodes.net(),
                    nodes.rate(),
                    nodes.duration_secs()
                ),
                growth_rate: nodes.rate(),
                duration_secs: nodes.duration_secs(),
            });
        }
    }

    let event_listener_leaks = listeners.map(|l| listener_leaks(&l, nodes.as_ref())).unwrap_or_default();
    let element_growth = tally_element_growth(dom_events);

    let heap_near_limit = match (memory_usage.peak_kb, memory_usage.limit_kb) {
        (Some(peak), Some(limit)) if limit > 0.0 => peak / limit > HEAP_LIMIT_USAGE_RATIO,
        _ => false,
    };
    let recommendations = build_recommendations(
        &potential_leaks,
        &event_listener_leaks,
        dom_size.peak_nodes.unwrap_or(0.0),
        heap_near_limit,
    );

    Ok(MemoryDomAnalysis {
        memory_usage,
        dom_size,
        potential_leaks,
        event_listener_leaks,
        element_growth,
        recommendations,
    })
}

fn listener_leaks(listeners: &Series, nodes: Option<&Series>) -> Vec<PotentialLeak> {
    let mut leaks = Vec::new();
    let rate = listeners.rate();
    let net = listeners.net();

    if rate > LISTENER_GROWTH_RATE_PER_SEC
        && listeners.duration_secs() > SUSTAINED_GROWTH_SECS
        && net >= LISTENER_GROWTH_MIN
    {
        leaks.push(PotentialLeak {
            kind: LeakKind::EventListenerGrowth,
            severity: Severity::Medium,
            description: format!("{} event listeners added ({:.2}/s) without removal", net, rate),
            growth_rate: rate,
            duration_secs: listeners.duration_secs(),
        });
    }

    if net > 0.0 {
        let node_net = nodes.map(|n| n.net()).unwrap_or(0.0);
        let disproportionate = if node_net > 0.0 {
            net / node_net > LISTENER_TO_NODE_RATIO
        } else {
            node_net == 0.0
        };
        if disproportionate {
            leaks.push(PotentialLeak {
                kind: LeakKind::DisproportionateListenerGrowth,
                severity: Severity::Low,
                description: format!("Listeners grew by {} while nodes grew by {}", net, node_net),
                growth_rate: rate,
                duration_secs: listeners.duration_secs(),
            });
        }
    }

    leaks
}

fn tally_element_growth(dom_events: &[&TraceEvent]) -> Vec<ElementGrowth> {
    let mut by_type: HashMap<String, (usize, usize)> = HashMap::new();

    for event in dom_events {
        let Some(direction) = MutationDirection::from_name(&event.name) else {
            continue;
        };
        let counts = by_type.entry(mutation_target(event)).or_default();
        match direction {
            MutationDirection::Added => counts.0 += 1,
            MutationDirection::Removed => counts.1 += 1,
        }
    }

    let growth = by_type
        .into_iter()
        .map(|(node_type, (additions, removals))| ElementGrowth {
            node_type,
            additions,
            removals,
            net_growth: additions as i64 - removals as i64,
        })
        .collect();

    top_n(growth, TOP_ELEMENT_GROWTH, |a, b| {
        b.additions.cmp(&a.additions).then_with(|| a.node_type.cmp(&b.node_type))
    })
}

fn build_recommendations(
    leaks: &[PotentialLeak],
    listener_leaks: &[PotentialLeak],
    peak_nodes: f64,
    heap_near_limit: bool,
) -> Vec<String> {
    let mut recommendations: Vec<String> = leaks
        .iter()
        .chain(listener_leaks)
        .map(|leak| match leak.kind {
            LeakKind::ContinuousMemoryGrowth => {
                "Heap keeps growing: release references held by closures, caches and detached DOM nodes"
            }
            LeakKind::ContinuousDomGrowth => "DOM keeps growing: remove nodes that leave the view instead of hiding them",
            LeakKind::EventListenerGrowth => {
                "Event listeners accumulate: remove listeners on teardown or use event delegation"
            }
            LeakKind::DisproportionateListenerGrowth => {
                "Listeners grow faster than the DOM: check for handlers registered on every render"
            }
        })
        .map(String::from)
        .collect();

    if peak_nodes > LARGE_DOM_NODES {
        recommendations.push(format!(
            "DOM peaked at {} nodes: virtualize long lists and render off-screen content lazily",
            peak_nodes
        ));
    }
    if heap_near_limit {
        recommendations.push(
            "Heap usage is above 70% of the limit: pool and reuse objects instead of allocating per frame".to_string(),
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counters(ts: f64, data: serde_json::Value) -> TraceEvent {
        TraceEvent::new("UpdateCounters", ts).with_args(json!({ "data": data }))
    }

    fn run(events: &[TraceEvent]) -> MemoryDomAnalysis {
        let memory: Vec<&TraceEvent> = events
            .iter()
            .filter(|e| crate::parser::classify::is_memory_event(&e.name))
            .collect();
        let dom: Vec<&TraceEvent> = events
            .iter()
            .filter(|e| crate::parser::classify::is_dom_mutation(&e.name))
            .collect();
        analyze_memory_and_dom_growth(&memory, &dom, events, 10.0).unwrap()
    }

    #[test]
    fn test_heap_growth_with_gc_is_high() {
        let events = vec![
            counters(0.0, json!({ "jsHeapSizeUsed": 1_000_000 })),
            TraceEvent::new("MajorGC", 5_000_000.0).with_dur(1_000.0),
            counters(10_000_000.0, json!({ "jsHeapSizeUsed": 1_000_000 + 200 * 1024 })),
        ];

        let analysis = run(&events);

        assert_eq!(analysis.potential_leaks.len(), 1);
        let leak = &analysis.potential_leaks[0];
        assert_eq!(leak.kind, LeakKind::ContinuousMemoryGrowth);
        assert_eq!(leak.severity, Severity::High);
        assert!((leak.growth_rate - 20.0).abs() < 1e-9);
        assert_eq!(analysis.memory_usage.trend, Trend::Increasing);
    }

    #[test]
    fn test_heap_growth_without_gc_is_medium() {
        let events = vec![
            counters(0.0, json!({ "jsHeapSizeUsed": 1_000_000 })),
            counters(10_000_000.0, json!({ "jsHeapSizeUsed": 1_000_000 + 200 * 1024 })),
        ];
        assert_eq!(run(&events).potential_leaks[0].severity, Severity::Medium);
    }

    #[test]
    fn test_short_window_not_flagged() {
        let events = vec![
            counters(0.0, json!({ "jsHeapSizeUsed": 0, "nodes": 0 })),
            counters(5_000_000.0, json!({ "jsHeapSizeUsed": 10_000_000, "nodes": 500 })),
        ];
        let analysis = run(&events);
        assert!(analysis.potential_leaks.is_empty());
        assert_eq!(analysis.memory_usage.trend, Trend::RapidlyIncreasing);
        assert_eq!(analysis.dom_size.trend, Trend::RapidlyIncreasing);
    }

    #[test]
    fn test_dom_and_listener_growth() {
        let events = vec![
            counters(0.0, json!({ "nodes": 100, "jsEventListeners": 10 })),
            counters(10_000_000.0, json!({ "nodes": 120, "jsEventListeners": 50 })),
        ];

        let analysis = run(&events);

        assert_eq!(analysis.potential_leaks[0].kind, LeakKind::ContinuousDomGrowth);
        let kinds: Vec<LeakKind> = analysis.event_listener_leaks.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LeakKind::EventListenerGrowth, LeakKind::DisproportionateListenerGrowth]
        );
    }

    #[test]
    fn test_listener_growth_with_flat_dom() {
        let events = vec![
            counters(0.0, json!({ "nodes": 100, "jsEventListeners": 10 })),
            counters(1_000_000.0, json!({ "nodes": 100, "jsEventListeners": 11 })),
        ];
        let analysis = run(&events);
        assert_eq!(analysis.event_listener_leaks.len(), 1);
        assert_eq!(analysis.event_listener_leaks[0].kind, LeakKind::DisproportionateListenerGrowth);
    }

    #[test]
    fn test_element_growth_ranking() {
        let mut events = Vec::new();
        for i in 0..3 {
            events.push(
                TraceEvent::new("DOMNodeInserted", i as f64).with_args(json!({ "data": { "nodeName": "DIV" } })),
            );
        }
        events.push(TraceEvent::new("DOMNodeRemoved", 5.0).with_args(json!({ "data": { "nodeName": "DIV" } })));
        events.push(TraceEvent::new("DOMNodeInserted", 6.0).with_args(json!({ "data": { "nodeName": "LI" } })));

        let growth = run(&events).element_growth;

        assert_eq!(
            growth[0],
            ElementGrowth { node_type: "DIV".into(), additions: 3, removals: 1, net_growth: 2 }
        );
        assert_eq!(growth[1].node_type, "LI");
    }

    #[test]
    fn test_size_recommendations() {
        let events = vec![counters(
            0.0,
            json!({ "nodes": 1_500, "jsHeapSizeUsed": 80_000_000, "jsHeapSizeLimit": 100_000_000 }),
        )];
        let recs = run(&events).recommendations;
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("virtualize"));
        assert!(recs[1].contains("70%"));
    }
}
