//! Input schema for browser trace events.
//!
//! Mirrors the Chrome trace event JSON shape. Only `name` is required;
//! everything else is defaulted so partially-populated records still load.

use crate::utils::config::MICROS_PER_MS;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single instrumentation record from the browser's tracing subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Event kind (e.g. "Layout", "RecalculateStyles", "V8.Execute")
    pub name: String,

    /// Originating trace category
    #[serde(default, rename = "cat", alias = "category", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Trace phase ("X", "B", "I", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<String>,

    /// Monotonic timestamp in microseconds
    #[serde(default)]
    pub ts: f64,

    /// Duration in microseconds (absent for instant events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dur: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<i64>,

    /// Free-form payload; shape depends on `name`
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

impl TraceEvent {
    /// Create an instant event
    ///
    /// **Public** - used by tests and callers that build events in memory
    pub fn new(name: impl Into<String>, ts: f64) -> Self {
        Self {
            name: name.into(),
            category: None,
            ph: None,
            ts,
            dur: None,
            pid: None,
            tid: None,
            args: Value::Null,
        }
    }

    pub fn with_dur(mut self, dur: f64) -> Self {
        self.dur = Some(dur);
        self
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    pub fn with_thread(mut self, pid: i64, tid: i64) -> Self {
        self.pid = Some(pid);
        self.tid = Some(tid);
        self
    }

    /// Whether both events ran on the same thread
    ///
    /// A missing id matches anything, so traces recorded without
    /// process/thread ids are treated as a single thread.
    pub fn same_thread(&self, other: &TraceEvent) -> bool {
        fn id_matches(a: Option<i64>, b: Option<i64>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }
        id_matches(self.pid, other.pid) && id_matches(self.tid, other.tid)
    }

    pub fn start(&self) -> f64 {
        self.ts
    }

    /// Duration in microseconds, zero for instant events
    pub fn duration(&self) -> f64 {
        self.dur.unwrap_or(0.0)
    }

    pub fn end(&self) -> f64 {
        self.ts + self.duration()
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration() / MICROS_PER_MS
    }

    /// `args.data`, where most event payloads live
    pub fn data(&self) -> Option<&Value> {
        self.args.get("data")
    }

    /// Walk `args` along `path`, returning `None` at the first missing key
    ///
    /// **Public** - defensive accessor used by the payload decoder
    pub fn arg(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.args, |value, key| value.get(key))
    }

    /// String field of `args.data`
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data()?.get(key)?.as_str()
    }

    /// Numeric field of `args.data` (integers and floats accepted)
    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.data()?.get(key)?.as_f64()
    }

    /// Captured JS call stack, from `args.data.stackTrace` or `args.beginData.stackTrace`
    pub fn stack_trace(&self) -> Vec<StackFrame> {
        let frames = self
            .arg(&["data", "stackTrace"])
            .or_else(|| self.arg(&["beginData", "stackTrace"]))
            .and_then(Value::as_array);

        match frames {
            Some(frames) => frames.iter().filter_map(StackFrame::from_value).collect(),
            None => Vec::new(),
        }
    }

    pub fn has_stack_trace(&self) -> bool {
        !self.stack_trace().is_empty()
    }
}

/// One frame of a captured JS call stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub url: String,
    pub function_name: String,
    pub line_number: Option<i64>,
    pub column_number: Option<i64>,
}

impl StackFrame {
    /// Decode a frame object, tolerating missing or mistyped fields
    ///
    /// Returns `None` only when the value is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let number = |key: &str| obj.get(key).and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));

        let function_name = obj
            .get("functionName")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("(anonymous)");

        Some(Self {
            url: obj.get("url").and_then(Value::as_str).unwrap_or("").to_string(),
            function_name: function_name.to_string(),
            line_number: number("lineNumber"),
            column_number: number("columnNumber"),
        })
    }

    /// Grouping key `(url, functionName, lineNumber)`
    pub fn location_key(&self) -> (String, String, Option<i64>) {
        (self.url.clone(), self.function_name.clone(), self.line_number)
    }
}
