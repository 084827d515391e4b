//! Call-stack aggregation for stack-bearing trace events.
//!
//! Two tallies are built from captured JS stacks:
//! - top frame only (who directly forced the work)
//! - every frame (which functions show up anywhere on forcing stacks)
//!
//! Stacks can also be rendered in collapsed form: "outer;middle;inner".

use super::metrics::DurationStats;
use crate::parser::{StackFrame, TraceEvent};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

/// Aggregated statistics for one `(url, functionName, lineNumber)` location
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    pub url: String,
    pub function_name: String,
    pub line_number: Option<i64>,
    #[serde(flatten)]
    pub stats: DurationStats,
}

impl FrameStats {
    pub fn count(&self) -> usize {
        self.stats.count
    }
}

/// Tally the top frame of each event's stack
///
/// **Public** - used for "worst offender" rankings
pub fn tally_top_frames(events: &[&TraceEvent]) -> Vec<FrameStats> {
    build_frame_tally(events, true)
}

/// Tally every frame of each event's stack
///
/// A frame that appears twice in one stack (recursion) is counted twice.
pub fn tally_all_frames(events: &[&TraceEvent]) -> Vec<FrameStats> {
    build_frame_tally(events, false)
}

/// Shared tally: group selected frames by location, rank by count
///
/// **Private** - internal helper for the two tallies
fn build_frame_tally(events: &[&TraceEvent], top_only: bool) -> Vec<FrameStats> {
    let mut tally: HashMap<(String, String, Option<i64>), DurationStats> = HashMap::new();

    for event in events {
        let frames = event.stack_trace();
        let selected = if top_only { &frames[..frames.len().min(1)] } else { &frames[..] };
        for frame in selected {
            tally.entry(frame.location_key()).or_default().record(event.duration());
        }
    }

    let mut ranked: Vec<FrameStats> = tally
        .into_iter()
        .map(|((url, function_name, line_number), stats)| FrameStats {
            url,
            function_name,
            line_number,
            stats,
        })
        .collect();

    // Count first; the rest only keeps the order deterministic
    ranked.sort_by(|a, b| {
        b.stats
            .count
            .cmp(&a.stats.count)
            .then(b.stats.total_duration_ms.total_cmp(&a.stats.total_duration_ms))
            .then_with(|| a.url.cmp(&b.url))
            .then_with(|| a.function_name.cmp(&b.function_name))
            .then(a.line_number.cmp(&b.line_number))
    });

    debug!("Tallied {} unique stack locations from {} events", ranked.len(), events.len());
    ranked
}

/// Render a captured stack in collapsed form, outermost caller first
///
/// Trace stacks list the innermost frame first.
pub fn collapse_stack(frames: &[StackFrame]) -> String {
    frames
        .iter()
        .rev()
        .map(|f| f.function_name.as_str())
        .collect::<Vec<_>>()
        .join(";")
}
