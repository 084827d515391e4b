//! Long-task attribution.
//!
//! A long task is any event whose duration reaches the threshold. Each one
//! is attributed to the activity class that dominates the events it contains,
//! and to the nearest input / network / timer event in the 500ms before it.

use super::options::DetailLevel;
use super::schema::{Bottleneck, BottleneckType};
use crate::aggregator::{sorted_by_time, to_ms};
use crate::parser::{ActivityClass, TraceEvent, TriggerKind};
use crate::utils::config::{MICROS_PER_MS, TASK_CONTEXT_LOOKBACK_MS};
use crate::utils::error::AnalysisError;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTasksDetails {
    pub threshold_ms: f64,
    pub count: usize,
    pub total_duration_ms: f64,
    pub longest_task_ms: f64,
    pub by_dominant_activity: BTreeMap<ActivityClass, usize>,
    pub tasks: Vec<LongTask>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTask {
    pub name: String,
    pub start_time: f64,
    pub duration_ms: f64,
    pub dominant_activity: ActivityClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_breakdown: Option<BTreeMap<ActivityClass, usize>>,
    pub context: TaskContext,
}

/// Nearest preceding trigger of each kind
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskContext {
    pub input: TriggerContext,
    pub network: TriggerContext,
    pub timer: TriggerContext,
}

impl TaskContext {
    fn slot(&mut self, kind: TriggerKind) -> &mut TriggerContext {
        match kind {
            TriggerKind::Input => &mut self.input,
            TriggerKind::Network => &mut self.network,
            TriggerKind::Timer => &mut self.timer,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerContext {
    pub detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_before_task_ms: Option<f64>,
}

/// Find and attribute long tasks
///
/// **Public** - engine entry point for long tasks
///
/// # Returns
/// `Ok(None)` when no event reaches the threshold
pub fn analyze_long_tasks(
    events: &[TraceEvent],
    threshold_ms: f64,
    detail: DetailLevel,
) -> Result<Option<Bottleneck>, AnalysisError> {
    let sorted = sorted_by_time(events)?;
    let threshold_us = threshold_ms * MICROS_PER_MS;

    let mut tasks: Vec<LongTask> = sorted
        .iter()
        .filter(|e| e.dur.is_some_and(|d| d >= threshold_us))
        .map(|task| attribute_task(task, &sorted, detail))
        .collect();

    debug!("Found {} long tasks (threshold {}ms)", tasks.len(), threshold_ms);

    if tasks.is_empty() {
        return Ok(None);
    }

    tasks.sort_by(|a, b| {
        b.duration_ms
            .total_cmp(&a.duration_ms)
            .then(a.start_time.total_cmp(&b.start_time))
    });

    let count = tasks.len();
    let total_duration_ms: f64 = tasks.iter().map(|t| t.duration_ms).sum();
    let longest_task_ms = tasks[0].duration_ms;

    let mut by_dominant_activity = BTreeMap::new();
    for task in &tasks {
        *by_dominant_activity.entry(task.dominant_activity).or_insert(0) += 1;
    }

    let recommendations = build_recommendations(&tasks, &by_dominant_activity);

    if let Some(limit) = detail.task_limit() {
        tasks.truncate(limit);
    }

    let details = LongTasksDetails {
        threshold_ms,
        count,
        total_duration_ms,
        longest_task_ms,
        by_dominant_activity,
        tasks,
        recommendations,
    };

    let description = format!(
        "Found {} long task(s) of {}ms or more, totaling {:.1}ms (longest {:.1}ms)",
        count, threshold_ms, total_duration_ms, longest_task_ms
    );

    Bottleneck::new(BottleneckType::LongTasks, description, &details).map(Some)
}

/// Attribute one task
///
/// **Private** - internal helper for analyze_long_tasks
fn attribute_task(task: &TraceEvent, sorted: &[&TraceEvent], detail: DetailLevel) -> LongTask {
    let breakdown = count_contained_activity(task, sorted);
    let dominant_activity = dominant_class(&breakdown);

    LongTask {
        name: task.name.clone(),
        start_time: task.start(),
        duration_ms: task.duration_ms(),
        dominant_activity,
        activity_breakdown: detail.includes_breakdown().then_some(breakdown),
        context: discover_context(task, sorted),
    }
}

/// Count activity classes of events inside `[task.start, task.end]`, the task included
///
/// Only events on the task's own thread count: raster and compositor
/// threads paint alongside the main thread all the time.
fn count_contained_activity(task: &TraceEvent, sorted: &[&TraceEvent]) -> BTreeMap<ActivityClass, usize> {
    let first = sorted.partition_point(|e| e.start() < task.start());

    let mut counts = BTreeMap::new();
    for event in sorted[first..].iter().take_while(|e| e.start() <= task.end()) {
        if event.end() > task.end() || !task.same_thread(event) {
            continue;
        }
        if let Some(class) = ActivityClass::classify(&event.name) {
            *counts.entry(class).or_insert(0) += 1;
        }
    }
    counts
}

/// Highest count wins; ties go to the earlier class in `ActivityClass::RANKED`
pub fn dominant_class(counts: &BTreeMap<ActivityClass, usize>) -> ActivityClass {
    let mut best = (ActivityClass::Other, 0);
    for class in ActivityClass::RANKED {
        let count = counts.get(&class).copied().unwrap_or(0);
        if count > best.1 {
            best = (class, count);
        }
    }
    best.0
}

/// Nearest input / network / timer events in the lookback window before the task
fn discover_context(task: &TraceEvent, sorted: &[&TraceEvent]) -> TaskContext {
    let window_start = task.start() - TASK_CONTEXT_LOOKBACK_MS * MICROS_PER_MS;
    let lo = sorted.partition_point(|e| e.start() < window_start);
    let hi = sorted.partition_point(|e| e.start() < task.start());

    let mut context = TaskContext::default();
    // Walk backwards so the first hit per kind is the nearest
    for event in sorted[lo..hi].iter().rev() {
        let Some(kind) = TriggerKind::classify(event) else {
            continue;
        };
        let slot = context.slot(kind);
        if !slot.detected {
            *slot = TriggerContext {
                detected: true,
                event_name: Some(event.name.clone()),
                time_before_task_ms: Some(to_ms(task.start() - event.start())),
            };
        }
    }
    context
}

fn build_recommendations(
    tasks: &[LongTask],
    by_activity: &BTreeMap<ActivityClass, usize>,
) -> Vec<String> {
    let mut recommendations = vec![
        "Split long tasks into chunks under 50ms and yield to the main thread between them".to_string(),
    ];

    let has = |class: ActivityClass| by_activity.get(&class).copied().unwrap_or(0) > 0;

    if has(ActivityClass::Javascript) {
        recommendations.push(
            "Move heavy script work off the main thread (Web Workers) or defer it with requestIdleCallback".to_string(),
        );
    }
    if has(ActivityClass::Layout) || has(ActivityClass::Style) {
        recommendations.push(
            "Long tasks are dominated by rendering work: batch DOM reads before writes and limit style invalidation".to_string(),
        );
    }
    if has(ActivityClass::GarbageCollection) {
        recommendations.push("Reduce allocation churn to shorten garbage-collection pauses".to_string());
    }
    if tasks.iter().any(|t| t.context.input.detected) {
        recommendations.push(
            "Some long tasks follow user input: keep event handlers short and defer non-visual work".to_string(),
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_layout_task() {
        let events = vec![TraceEvent::new("Layout", 1_000_000.0).with_dur(60_000.0)];
        let b = analyze_long_tasks(&events, 50.0, DetailLevel::Detailed).unwrap().unwrap();

        assert_eq!(b.kind, BottleneckType::LongTasks);
        assert_eq!(b.details["count"], 1);
        assert_eq!(b.details["tasks"][0]["dominantActivity"], "layout");
        assert_eq!(b.details["tasks"][0]["context"]["input"]["detected"], false);
        assert_eq!(b.details["tasks"][0]["context"]["network"]["detected"], false);
        assert_eq!(b.details["tasks"][0]["context"]["timer"]["detected"], false);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let at = vec![TraceEvent::new("RunTask", 0.0).with_dur(50_000.0)];
        assert!(analyze_long_tasks(&at, 50.0, DetailLevel::Detailed).unwrap().is_some());

        let below = vec![TraceEvent::new("RunTask", 0.0).with_dur(49_999.0)];
        assert!(analyze_long_tasks(&below, 50.0, DetailLevel::Detailed).unwrap().is_none());
    }

    #[test]
    fn test_no_durations_yields_none() {
        let events = vec![TraceEvent::new("Paint", 0.0), TraceEvent::new("Layout", 10.0)];
        assert!(analyze_long_tasks(&events, 50.0, DetailLevel::Detailed).unwrap().is_none());
    }

    #[test]
    fn test_dominant_class_with_nested_events() {
        let events = vec![
            TraceEvent::new("RunTask", 0.0).with_dur(100_000.0),
            TraceEvent::new("FunctionCall", 1_000.0).with_dur(10_000.0),
            TraceEvent::new("FunctionCall", 20_000.0).with_dur(10_000.0),
            TraceEvent::new("RecalculateStyles", 40_000.0).with_dur(1_000.0),
            // Ends after the task: not contained
            TraceEvent::new("Layout", 95_000.0).with_dur(10_000.0),
        ];

        let b = analyze_long_tasks(&events, 50.0, DetailLevel::Detailed).unwrap().unwrap();
        let task = &b.details["tasks"][0];
        assert_eq!(task["name"], "RunTask");
        assert_eq!(task["dominantActivity"], "javascript");
        assert_eq!(task["activityBreakdown"]["javascript"], 2);
        assert!(task["activityBreakdown"].get("layout").is_none());
    }

    #[test]
    fn test_tie_breaks_by_priority() {
        let mut counts = BTreeMap::new();
        counts.insert(ActivityClass::Paint, 2);
        counts.insert(ActivityClass::Style, 2);
        assert_eq!(dominant_class(&counts), ActivityClass::Style);
        assert_eq!(dominant_class(&BTreeMap::new()), ActivityClass::Other);
    }

    #[test]
    fn test_context_discovery() {
        let events = vec![
            // Outside the 500ms window
            TraceEvent::new("TimerFire", 0.0),
            TraceEvent::new("EventDispatch", 600_000.0).with_args(json!({ "data": { "type": "click" } })),
            TraceEvent::new("ResourceReceiveResponse", 700_000.0),
            TraceEvent::new("EventDispatch", 750_000.0).with_args(json!({ "data": { "type": "keydown" } })),
            TraceEvent::new("RunTask", 800_000.0).with_dur(70_000.0),
        ];

        let b = analyze_long_tasks(&events, 50.0, DetailLevel::Detailed).unwrap().unwrap();
        let context = &b.details["tasks"][0]["context"];

        assert_eq!(context["input"]["detected"], true);
        assert_eq!(context["input"]["timeBeforeTaskMs"], 50.0);
        assert_eq!(context["network"]["eventName"], "ResourceReceiveResponse");
        assert_eq!(context["timer"]["detected"], false);
    }

    #[test]
    fn test_breakdown_ignores_other_threads() {
        let events = vec![
            TraceEvent::new("RunTask", 0.0).with_dur(100_000.0).with_thread(1, 1),
            TraceEvent::new("FunctionCall", 10_000.0).with_dur(30_000.0).with_thread(1, 1),
            TraceEvent::new("RasterTask", 20_000.0).with_dur(5_000.0).with_thread(1, 2),
            TraceEvent::new("RasterTask", 30_000.0).with_dur(5_000.0).with_thread(1, 2),
            TraceEvent::new("RasterTask", 40_000.0).with_dur(5_000.0).with_thread(1, 2),
        ];

        let b = analyze_long_tasks(&events, 50.0, DetailLevel::Detailed).unwrap().unwrap();
        let task = &b.details["tasks"][0];

        assert_eq!(task["name"], "RunTask");
        assert_eq!(task["dominantActivity"], "javascript");
        assert!(task["activityBreakdown"].get("paint").is_none());
    }

    #[test]
    fn test_basic_detail_limits_tasks() {
        let events: Vec<TraceEvent> = (0..8)
            .map(|i| TraceEvent::new("RunTask", i as f64 * 1_000_000.0).with_dur(60_000.0 + i as f64))
            .collect();

        let b = analyze_long_tasks(&events, 50.0, DetailLevel::Basic).unwrap().unwrap();
        assert_eq!(b.details["count"], 8);
        assert_eq!(b.details["tasks"].as_array().unwrap().len(), 5);
        assert!(b.details["tasks"][0].get("activityBreakdown").is_none());
        // Longest first
        assert_eq!(b.details["tasks"][0]["durationMs"], 60.007);
    }
}
