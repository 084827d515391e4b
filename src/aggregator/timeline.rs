//! Time-ordering, temporal clustering, and cause→effect lookups.
//!
//! Analyzers never sort the caller's events in place; they build a sorted
//! working copy of references with `sorted_by_time`.

use crate::parser::TraceEvent;
use crate::utils::config::MICROS_PER_MS;
use crate::utils::error::AnalysisError;
use serde::Serialize;

/// Check the invariants every analyzer relies on
///
/// **Public** - called for each event that enters a working copy
pub fn validate_event(event: &TraceEvent) -> Result<(), AnalysisError> {
    if !event.ts.is_finite() {
        return Err(AnalysisError::InvalidTimestamp { name: event.name.clone() });
    }
    if let Some(dur) = event.dur {
        if !dur.is_finite() || dur < 0.0 {
            return Err(AnalysisError::InvalidDuration {
                name: event.name.clone(),
                ts: event.ts,
                dur,
            });
        }
    }
    Ok(())
}

/// Validated, time-ordered working copy (stable for equal timestamps)
pub fn sorted_by_time<'a, I>(events: I) -> Result<Vec<&'a TraceEvent>, AnalysisError>
where
    I: IntoIterator<Item = &'a TraceEvent>,
{
    let mut sorted = Vec::new();
    for event in events {
        validate_event(event)?;
        sorted.push(event);
    }
    sorted.sort_by(|a, b| a.ts.total_cmp(&b.ts));
    Ok(sorted)
}

/// Find the candidate that ended closest before `instant`, at most `window_us` earlier
///
/// `candidates` must be sorted by start time. Returns the event and the gap
/// (`instant - end`). Ties keep the earliest candidate.
pub fn nearest_ended_before<'a>(
    candidates: &[&'a TraceEvent],
    instant: f64,
    window_us: f64,
) -> Option<(&'a TraceEvent, f64)> {
    // Anything that ended by `instant` also started by it
    let started = candidates.partition_point(|c| c.start() <= instant);
    candidates[..started]
        .iter()
        .filter(|c| c.end() <= instant && instant - c.end() <= window_us)
        .fold(None, |best: Option<(&'a TraceEvent, f64)>, &candidate| {
            let gap = instant - candidate.end();
            match best {
                Some((_, best_gap)) if best_gap <= gap => best,
                _ => Some((candidate, gap)),
            }
        })
}

/// A maximal run of events whose successive start times are within the gap threshold
#[derive(Debug, Clone)]
pub struct Cluster<'a> {
    pub start_time: f64,
    pub end_time: f64,
    /// Sum of member durations in microseconds
    pub total_duration: f64,
    pub events: Vec<&'a TraceEvent>,
}

impl<'a> Cluster<'a> {
    fn start(event: &'a TraceEvent) -> Self {
        Self {
            start_time: event.start(),
            end_time: event.end(),
            total_duration: event.duration(),
            events: vec![event],
        }
    }

    fn extended(mut self, event: &'a TraceEvent) -> Self {
        self.end_time = self.end_time.max(event.end());
        self.total_duration += event.duration();
        self.events.push(event);
        self
    }

    fn last_start(&self) -> f64 {
        self.events.last().map(|e| e.start()).unwrap_or(self.start_time)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn summary(&self) -> ClusterSummary {
        ClusterSummary {
            start_time: self.start_time,
            end_time: self.end_time,
            event_count: self.event_count(),
            total_duration_ms: self.total_duration / MICROS_PER_MS,
        }
    }
}

/// Serializable view of a cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub start_time: f64,
    pub end_time: f64,
    pub event_count: usize,
    pub total_duration_ms: f64,
}

/// Group time-sorted events into clusters
///
/// **Public** - shared by the layout and CSS analyzers
///
/// # Arguments
/// * `sorted` - Events ordered by timestamp
/// * `gap_us` - Maximum distance between successive start times inside one cluster
pub fn cluster_by_gap<'a>(sorted: &[&'a TraceEvent], gap_us: f64) -> Vec<Cluster<'a>> {
    sorted.iter().fold(Vec::new(), |mut clusters: Vec<Cluster<'a>>, &event| {
        match clusters.pop() {
            Some(current) if event.start() - current.last_start() <= gap_us => {
                clusters.push(current.extended(event));
            }
            Some(current) => {
                clusters.push(current);
                clusters.push(Cluster::start(event));
            }
            None => clusters.push(Cluster::start(event)),
        }
        clusters
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(ts: f64, dur: f64) -> TraceEvent {
        TraceEvent::new("RecalculateStyles", ts).with_dur(dur)
    }

    #[test]
    fn test_sorted_by_time_is_stable() {
        let events = vec![style(30.0, 1.0), style(10.0, 1.0), TraceEvent::new("Layout", 10.0)];
        let sorted = sorted_by_time(&events).unwrap();

        assert_eq!(sorted[0].name, "RecalculateStyles");
        assert_eq!(sorted[1].name, "Layout");
        assert_eq!(sorted[2].ts, 30.0);
    }

    #[test]
    fn test_sorted_by_time_rejects_bad_events() {
        let events = vec![TraceEvent::new("Layout", f64::NAN)];
        assert!(matches!(sorted_by_time(&events), Err(AnalysisError::InvalidTimestamp { .. })));

        let events = vec![style(0.0, -5.0)];
        assert!(matches!(sorted_by_time(&events), Err(AnalysisError::InvalidDuration { .. })));

        let events = vec![style(0.0, f64::NAN)];
        let err = sorted_by_time(&events).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDuration { .. }));
        assert!(err.to_string().contains("invalid duration"));
    }

    #[test]
    fn test_cluster_by_gap() {
        let events = vec![style(0.0, 1_000.0), style(40_000.0, 2_000.0), style(200_000.0, 500.0)];
        let sorted = sorted_by_time(&events).unwrap();
        let clusters = cluster_by_gap(&sorted, 50_000.0);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].event_count(), 2);
        assert_eq!(clusters[0].total_duration, 3_000.0);
        assert_eq!(clusters[0].end_time, 42_000.0);
        assert_eq!(clusters[1].start_time, 200_000.0);
    }

    #[test]
    fn test_cluster_gap_is_inclusive() {
        let events = vec![style(0.0, 0.0), style(50_000.0, 0.0)];
        let sorted = sorted_by_time(&events).unwrap();
        assert_eq!(cluster_by_gap(&sorted, 50_000.0).len(), 1);
    }

    #[test]
    fn test_merged_clusters_recluster_to_one() {
        let first = vec![style(0.0, 100.0), style(10_000.0, 100.0)];
        let second = vec![style(30_000.0, 100.0), style(45_000.0, 100.0)];

        let merged: Vec<TraceEvent> = first.into_iter().chain(second).collect();
        let sorted = sorted_by_time(&merged).unwrap();
        let clusters = cluster_by_gap(&sorted, 50_000.0);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].event_count(), 4);
    }

    #[test]
    fn test_cluster_empty() {
        assert!(cluster_by_gap(&[], 50_000.0).is_empty());
    }

    #[test]
    fn test_nearest_ended_before() {
        let scripts = vec![
            TraceEvent::new("FunctionCall", 0.0).with_dur(10_000.0),
            TraceEvent::new("FunctionCall", 20_000.0).with_dur(5_000.0),
            TraceEvent::new("FunctionCall", 40_000.0).with_dur(30_000.0),
        ];
        let refs: Vec<&TraceEvent> = scripts.iter().collect();

        let (found, gap) = nearest_ended_before(&refs, 30_000.0, 100_000.0).unwrap();
        assert_eq!(found.ts, 20_000.0);
        assert_eq!(gap, 5_000.0);

        assert!(nearest_ended_before(&refs, 200_000.0, 100_000.0).is_none());
    }

    #[test]
    fn test_nearest_ended_before_skips_later_starts() {
        let scripts = vec![
            TraceEvent::new("FunctionCall", 0.0).with_dur(1_000.0),
            TraceEvent::new("FunctionCall", 5_000.0).with_dur(0.0),
        ];
        let refs: Vec<&TraceEvent> = scripts.iter().collect();

        let (found, gap) = nearest_ended_before(&refs, 4_000.0, 100_000.0).unwrap();
        assert_eq!(found.ts, 0.0);
        assert_eq!(gap, 3_000.0);
        assert!(nearest_ended_before(&refs, 0.0, 100_000.0).is_none());
    }
}
