use perf_trace_analyzer::parser::payload::MutationData;
use perf_trace_analyzer::parser::{load_trace_file, ActivityClass, EventPayload, EventSets, MutationDirection, TraceEvent};
use perf_trace_analyzer::utils::error::ParseError;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_trace(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_devtools_export() {
    let file = write_trace(
        r#"{
            "metadata": { "source": "DevTools" },
            "traceEvents": [
                { "name": "Layout", "cat": "devtools.timeline", "ph": "X", "ts": 1000, "dur": 250, "pid": 1, "tid": 7 },
                { "name": "DOMNodeRemoved", "ph": "I", "ts": 1100, "args": { "data": { "tagName": "LI" } } },
                { "ph": "M", "args": { "name": "CrBrowserMain" } }
            ]
        }"#,
    );

    let events = load_trace_file(file.path()).unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].category.as_deref(), Some("devtools.timeline"));
    assert_eq!(events[0].end(), 1_250.0);
    assert_eq!(
        events[1].payload(),
        EventPayload::DomMutation(MutationData {
            target: "LI".to_string(),
            direction: Some(MutationDirection::Removed),
        })
    );
}

#[test]
fn test_load_missing_file() {
    assert!(matches!(
        load_trace_file("definitely/not/here.json"),
        Err(ParseError::IoError(_))
    ));
}

#[test]
fn test_load_invalid_json() {
    let file = write_trace("[{ \"name\": ");
    assert!(matches!(load_trace_file(file.path()), Err(ParseError::JsonError(_))));
}

#[test]
fn test_event_sets_overlap() {
    let events = vec![
        TraceEvent::new("UpdateLayoutTree", 0.0),
        TraceEvent::new("MajorGC", 1.0),
        TraceEvent::new("UpdateCounters", 2.0),
        TraceEvent::new("EvaluateScript", 3.0),
    ];

    let sets = EventSets::from_events(&events);

    // UpdateLayoutTree is both a layout event and a mutation
    assert_eq!(sets.layout.len(), 1);
    assert_eq!(sets.dom.len(), 1);
    assert_eq!(sets.memory.len(), 2);
    assert_eq!(sets.script.len(), 1);
    assert!(sets.style.is_empty());
}

#[test]
fn test_activity_labels() {
    assert_eq!(ActivityClass::classify("ParseHTML"), Some(ActivityClass::ParseHtml));
    assert_eq!(ActivityClass::classify("Paint"), Some(ActivityClass::Paint));
    assert_eq!(ActivityClass::classify("Whatever"), None);
}
