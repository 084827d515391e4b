use perf_trace_analyzer::aggregator::metrics::{growth_rate, DurationStats};
use perf_trace_analyzer::aggregator::stack_builder::{collapse_stack, tally_all_frames, tally_top_frames};
use perf_trace_analyzer::aggregator::timeline::{cluster_by_gap, nearest_ended_before, sorted_by_time};
use perf_trace_analyzer::parser::{StackFrame, TraceEvent};
use pretty_assertions::assert_eq;
use serde_json::json;

fn stacked_layout(ts: f64, dur: f64, frames: serde_json::Value) -> TraceEvent {
    TraceEvent::new("Layout", ts)
        .with_dur(dur)
        .with_args(json!({ "beginData": { "stackTrace": frames } }))
}

#[test]
fn test_clustering_is_idempotent() {
    let events: Vec<TraceEvent> = [0.0, 10_000.0, 55_000.0, 200_000.0, 240_000.0]
        .iter()
        .map(|&ts| TraceEvent::new("RecalculateStyles", ts).with_dur(1_000.0))
        .collect();
    let sorted = sorted_by_time(&events).unwrap();

    let first = cluster_by_gap(&sorted, 50_000.0);
    let flattened: Vec<&TraceEvent> = first.iter().flat_map(|c| c.events.iter().copied()).collect();
    let second = cluster_by_gap(&flattened, 50_000.0);

    let first_sizes: Vec<usize> = first.iter().map(|c| c.event_count()).collect();
    let second_sizes: Vec<usize> = second.iter().map(|c| c.event_count()).collect();
    assert_eq!(first_sizes, vec![3, 2]);
    assert_eq!(first_sizes, second_sizes);
}

#[test]
fn test_sorted_by_time_is_stable() {
    let events = vec![
        TraceEvent::new("B", 5.0),
        TraceEvent::new("A", 1.0),
        TraceEvent::new("C", 5.0),
    ];

    let names: Vec<&str> = sorted_by_time(&events).unwrap().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn test_nearest_ended_before_ignores_overlapping() {
    let script = TraceEvent::new("FunctionCall", 0.0).with_dur(5_000.0);
    let running = TraceEvent::new("FunctionCall", 4_000.0).with_dur(10_000.0);
    let candidates = vec![&script, &running];

    let (found, gap) = nearest_ended_before(&candidates, 6_000.0, 100_000.0).unwrap();
    assert_eq!(found.start(), 0.0);
    assert_eq!(gap, 1_000.0);
}

#[test]
fn test_top_frames_vs_all_frames() {
    let frames = json!([
        { "url": "app.js", "functionName": "measure", "lineNumber": 10 },
        { "url": "app.js", "functionName": "render", "lineNumber": 2 }
    ]);
    let events = vec![
        stacked_layout(0.0, 2_000.0, frames.clone()),
        stacked_layout(10.0, 4_000.0, frames),
    ];
    let refs: Vec<&TraceEvent> = events.iter().collect();

    let top = tally_top_frames(&refs);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].function_name, "measure");
    assert_eq!(top[0].stats.count, 2);
    assert_eq!(top[0].stats.total_duration_ms, 6.0);

    let all = tally_all_frames(&refs);
    assert_eq!(all.len(), 2);
}

#[test]
fn test_collapse_stack_outermost_first() {
    let frames = vec![
        StackFrame::from_value(&json!({ "url": "a.js", "functionName": "inner" })).unwrap(),
        StackFrame::from_value(&json!({ "url": "a.js", "functionName": "outer" })).unwrap(),
    ];
    assert_eq!(collapse_stack(&frames), "outer;inner");
}

#[test]
fn test_duration_stats_and_growth() {
    let mut stats = DurationStats::default();
    stats.record(1_500.0);
    stats.record(500.0);

    assert_eq!(stats.count, 2);
    assert_eq!(stats.average_duration_ms, 1.0);
    assert_eq!(growth_rate((0.0, 100.0), (2_000_000.0, 300.0)), 100.0);
    assert_eq!(growth_rate((5.0, 1.0), (5.0, 9.0)), 0.0);
}
