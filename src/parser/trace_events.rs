//! Trace file loader.
//!
//! Accepts the two shapes browsers export:
//! - a bare JSON array of events
//! - an object with a `traceEvents` array (DevTools Performance panel export)
//!
//! Records that fail to deserialize are logged and skipped.

use super::schema::TraceEvent;
use crate::utils::error::ParseError;
use log::{debug, warn};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Field names under which exporters place the event array
const EVENT_FIELD_NAMES: &[&str] = &["traceEvents", "events"];

/// Parse trace events out of an already-decoded JSON document
///
/// **Public** - main entry point for in-memory traces
///
/// # Errors
/// * `ParseError::InvalidFormat` - Document is neither an array nor an object with an event array,
///   or every record failed to parse
pub fn parse_trace_events(raw_trace: &Value) -> Result<Vec<TraceEvent>, ParseError> {
    let records = extract_event_array(raw_trace)?;
    parse_events_array(records)
}

/// Load and parse a trace file from disk
///
/// **Public** - used by the analyze command
pub fn load_trace_file(path: impl AsRef<Path>) -> Result<Vec<TraceEvent>, ParseError> {
    let path = path.as_ref();
    debug!("Reading trace from: {}", path.display());

    let file = File::open(path)?;
    let raw: Value = serde_json::from_reader(BufReader::new(file))?;

    parse_trace_events(&raw)
}

/// Locate the event array inside the document
///
/// **Private** - internal helper for parse_trace_events
fn extract_event_array(raw_trace: &Value) -> Result<&[Value], ParseError> {
    match raw_trace {
        Value::Array(records) => Ok(records),
        Value::Object(obj) => EVENT_FIELD_NAMES
            .iter()
            .find_map(|field| obj.get(*field).and_then(Value::as_array))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                ParseError::InvalidFormat("Trace object has no traceEvents array".to_string())
            }),
        _ => Err(ParseError::InvalidFormat(
            "Trace must be a JSON array or an object with traceEvents".to_string(),
        )),
    }
}

/// Parse array of trace records
///
/// **Private** - internal parsing logic
fn parse_events_array(records: &[Value]) -> Result<Vec<TraceEvent>, ParseError> {
    let mut events = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        match serde_json::from_value::<TraceEvent>(record.clone()) {
            Ok(event) => events.push(event),
            Err(e) => {
                // Log but don't fail - exporters emit metadata records of varying shape
                warn!("Skipping trace record {}: {}", index, e);
            }
        }
    }

    if events.is_empty() && !records.is_empty() {
        return Err(ParseError::InvalidFormat(
            "All trace records failed to parse".to_string(),
        ));
    }

    debug!("Parsed {} of {} trace records", events.len(), records.len());
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let raw = json!([
            { "name": "Layout", "ts": 10, "dur": 5 },
            { "name": "Paint", "ts": 20 }
        ]);

        let events = parse_trace_events(&raw).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Layout");
    }

    #[test]
    fn test_parse_trace_events_object() {
        let raw = json!({
            "metadata": {},
            "traceEvents": [{ "name": "Layout", "ts": 10 }]
        });

        assert_eq!(parse_trace_events(&raw).unwrap().len(), 1);
    }

    #[test]
    fn test_skips_malformed_records() {
        let raw = json!([
            { "name": "Layout", "ts": 10 },
            { "ts": 20 },
            { "name": "Paint", "ts": "not a number" }
        ]);

        assert_eq!(parse_trace_events(&raw).unwrap().len(), 1);
    }

    #[test]
    fn test_all_records_malformed() {
        let raw = json!([{ "ts": 1 }, 42]);
        assert!(matches!(parse_trace_events(&raw), Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_empty_array_is_ok() {
        assert!(parse_trace_events(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_scalar() {
        assert!(parse_trace_events(&json!("trace")).is_err());
        assert!(parse_trace_events(&json!({ "nothing": [] })).is_err());
    }
}
