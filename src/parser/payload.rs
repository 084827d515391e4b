//! Typed view over the loosely-shaped `args` bag.
//!
//! The raw payload is an untyped JSON object whose layout depends on the
//! event name. `EventPayload` decodes the shapes the analyzers care about;
//! anything else is `Unknown`. Decoding never fails, absent keys are `None`.

use super::classify::{is_dom_mutation, is_first_paint_marker, is_script_event, MutationDirection};
use super::schema::{StackFrame, TraceEvent};
use crate::utils::config::{COUNTERS_EVENT_NAME, LAYOUT_READ_EVENT_NAME, STYLE_EVENT_NAME};
use serde_json::Value;

/// Decoded payload, keyed by event name
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Layout(LayoutData),
    RecalculateStyles(StyleData),
    ScriptExecution(ScriptData),
    Counters(CounterData),
    ResourceSendRequest(RequestData),
    ResourceReceiveResponse(ResponseData),
    ResourceFinish(FinishData),
    DomMutation(MutationData),
    PaintMarker,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutData {
    pub stack: Vec<StackFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleData {
    pub element_count: Option<u64>,
    pub stack: Vec<StackFrame>,
}

/// Identity of a script-execution event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptData {
    pub url: Option<String>,
    pub function_name: Option<String>,
    pub line_number: Option<i64>,
}

impl ScriptData {
    pub fn url_or_unknown(&self) -> &str {
        self.url.as_deref().filter(|u| !u.is_empty()).unwrap_or("unknown")
    }

    pub fn function_or_anonymous(&self) -> &str {
        self.function_name.as_deref().filter(|f| !f.is_empty()).unwrap_or("(anonymous)")
    }
}

/// One `UpdateCounters` reading
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CounterData {
    pub js_heap_size_used: Option<f64>,
    pub js_heap_size_limit: Option<f64>,
    pub nodes: Option<f64>,
    pub js_event_listeners: Option<f64>,
    pub documents: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestData {
    pub request_id: Option<String>,
    pub url: Option<String>,
    pub priority: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseData {
    pub request_id: Option<String>,
    pub url: Option<String>,
    pub status_code: Option<u64>,
    pub mime_type: Option<String>,
    pub from_cache: bool,
    pub from_service_worker: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinishData {
    pub request_id: Option<String>,
    pub url: Option<String>,
    pub encoded_data_length: Option<u64>,
    pub decoded_body_length: Option<u64>,
    pub did_fail: bool,
}

/// A DOM mutation with its best-effort target
#[derive(Debug, Clone, PartialEq)]
pub struct MutationData {
    /// `nodeName`, `selector`, or `tagName`, else "unknown"
    pub target: String,
    pub direction: Option<MutationDirection>,
}

impl EventPayload {
    /// Decode the payload of `event`
    ///
    /// **Public** - main entry point for typed payload access
    pub fn from_event(event: &TraceEvent) -> Self {
        let name = event.name.as_str();

        // UpdateLayoutTree falls through to DomMutation
        if name == LAYOUT_READ_EVENT_NAME {
            return Self::Layout(LayoutData { stack: event.stack_trace() });
        }
        if name == STYLE_EVENT_NAME {
            return Self::RecalculateStyles(StyleData {
                element_count: event.data_f64("elementCount").map(|n| n as u64),
                stack: event.stack_trace(),
            });
        }
        if is_script_event(name) {
            return Self::ScriptExecution(decode_script(event));
        }

        match name {
            COUNTERS_EVENT_NAME => Self::Counters(CounterData {
                js_heap_size_used: event.data_f64("jsHeapSizeUsed"),
                js_heap_size_limit: event.data_f64("jsHeapSizeLimit"),
                nodes: event.data_f64("nodes"),
                js_event_listeners: event.data_f64("jsEventListeners"),
                documents: event.data_f64("documents"),
            }),
            "ResourceSendRequest" => Self::ResourceSendRequest(RequestData {
                request_id: data_string(event, "requestId"),
                url: data_string(event, "url"),
                priority: data_string(event, "priority"),
                method: data_string(event, "requestMethod"),
            }),
            "ResourceReceiveResponse" => Self::ResourceReceiveResponse(ResponseData {
                request_id: data_string(event, "requestId"),
                url: data_string(event, "url"),
                status_code: event.data_f64("statusCode").map(|n| n as u64),
                mime_type: data_string(event, "mimeType"),
                from_cache: data_bool(event, "fromCache"),
                from_service_worker: data_bool(event, "fromServiceWorker"),
            }),
            "ResourceFinish" => Self::ResourceFinish(FinishData {
                request_id: data_string(event, "requestId"),
                url: data_string(event, "url"),
                encoded_data_length: event.data_f64("encodedDataLength").map(|n| n.max(0.0) as u64),
                decoded_body_length: event.data_f64("decodedBodyLength").map(|n| n.max(0.0) as u64),
                did_fail: data_bool(event, "didFail"),
            }),
            _ if is_dom_mutation(name) => Self::DomMutation(MutationData {
                target: mutation_target(event),
                direction: MutationDirection::from_name(name),
            }),
            _ if is_first_paint_marker(name) => Self::PaintMarker,
            _ => Self::Unknown,
        }
    }
}

impl TraceEvent {
    /// Typed view of this event's payload
    pub fn payload(&self) -> EventPayload {
        EventPayload::from_event(self)
    }

    /// Script identity, for any event (empty for non-script payloads)
    pub fn script_data(&self) -> ScriptData {
        match self.payload() {
            EventPayload::ScriptExecution(script) => script,
            _ => ScriptData::default(),
        }
    }
}

/// Best-effort target key of a mutation event
///
/// **Public** - shared by the heatmap and element-growth tallies
pub fn mutation_target(event: &TraceEvent) -> String {
    ["nodeName", "selector", "tagName"]
        .iter()
        .find_map(|key| event.data_str(key).filter(|s| !s.is_empty()))
        .unwrap_or("unknown")
        .to_string()
}

fn decode_script(event: &TraceEvent) -> ScriptData {
    let top_frame = event.stack_trace().into_iter().next();

    let url = data_string(event, "url")
        .or_else(|| data_string(event, "scriptName"))
        .or_else(|| top_frame.as_ref().map(|f| f.url.clone()).filter(|u| !u.is_empty()));
    let function_name = data_string(event, "functionName")
        .or_else(|| top_frame.as_ref().map(|f| f.function_name.clone()));
    let line_number = event
        .data()
        .and_then(|d| d.get("lineNumber"))
        .and_then(Value::as_i64)
        .or_else(|| top_frame.and_then(|f| f.line_number));

    ScriptData { url, function_name, line_number }
}

fn data_string(event: &TraceEvent, key: &str) -> Option<String> {
    event.data_str(key).map(str::to_string)
}

fn data_bool(event: &TraceEvent, key: &str) -> bool {
    event
        .data()
        .and_then(|d| d.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
