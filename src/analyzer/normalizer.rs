//! Event normalizer.
//!
//! Rejects empty input and applies the optional focus time window. The
//! result is a filtered copy in original capture order; analyzers that need
//! time order sort their own working copies.

use crate::parser::TraceEvent;
use crate::utils::config::MICROS_PER_MS;
use crate::utils::error::NormalizeError;
use log::{debug, warn};

/// Inclusive time window in trace microseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    /// Parse a `"start-end"` millisecond pair
    ///
    /// Returns `None` for anything malformed (missing separator, non-numeric parts).
    pub fn parse_ms(range: &str) -> Option<Self> {
        let (start, end) = range.trim().split_once('-')?;
        let start: f64 = start.trim().parse().ok()?;
        let end: f64 = end.trim().parse().ok()?;

        if !start.is_finite() || !end.is_finite() {
            return None;
        }

        Some(Self {
            start: start * MICROS_PER_MS,
            end: end * MICROS_PER_MS,
        })
    }

    pub fn contains(&self, ts: f64) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Validate and window the raw event list
///
/// **Public** - first stage of the pipeline
///
/// # Arguments
/// * `events` - Raw events in capture order
/// * `focus_time_range_ms` - Optional `"start-end"` window in milliseconds
///
/// # Errors
/// * `NormalizeError::NoEvents` - The input list is empty
pub fn normalize(
    events: &[TraceEvent],
    focus_time_range_ms: Option<&str>,
) -> Result<Vec<TraceEvent>, NormalizeError> {
    if events.is_empty() {
        return Err(NormalizeError::NoEvents);
    }

    let window = focus_time_range_ms.and_then(|range| {
        let parsed = TimeWindow::parse_ms(range);
        if parsed.is_none() {
            warn!("Ignoring malformed focus time range '{}'", range);
        }
        parsed
    });

    let normalized: Vec<TraceEvent> = match window {
        Some(window) => events
            .iter()
            .filter(|e| window.contains(e.ts))
            .cloned()
            .collect(),
        None => events.to_vec(),
    };

    debug!("Normalized {} of {} events", normalized.len(), events.len());
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> Vec<TraceEvent> {
        vec![
            TraceEvent::new("A", 500.0),
            TraceEvent::new("B", 1_000.0),
            TraceEvent::new("C", 2_000.0),
            TraceEvent::new("D", 3_000.0),
        ]
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(&[], None), Err(NormalizeError::NoEvents));
    }

    #[test]
    fn test_no_range_keeps_everything_in_order() {
        let out = normalize(&events(), None).unwrap();
        let names: Vec<&str> = out.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_range_is_inclusive() {
        let out = normalize(&events(), Some("1-2")).unwrap();
        let names: Vec<&str> = out.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_malformed_range_is_ignored() {
        assert_eq!(normalize(&events(), Some("abc-2")).unwrap().len(), 4);
        assert_eq!(normalize(&events(), Some("12")).unwrap().len(), 4);
        assert_eq!(normalize(&events(), Some("")).unwrap().len(), 4);
    }

    #[test]
    fn test_range_can_filter_everything() {
        assert!(normalize(&events(), Some("100-200")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_ms() {
        assert_eq!(
            TimeWindow::parse_ms(" 1.5 - 3 "),
            Some(TimeWindow { start: 1_500.0, end: 3_000.0 })
        );
        assert!(TimeWindow::parse_ms("1-x").is_none());
    }
}
