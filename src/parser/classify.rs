//! Event-name classification and the shared per-call sub-filters.
//!
//! Trace event names are open-ended strings. Everything that decides
//! "is this a layout / style / script / memory / DOM event" lives here so
//! every analyzer agrees on the same sets.

use super::schema::TraceEvent;
use crate::utils::config::{
    COUNTERS_EVENT_NAME, DOM_MUTATION_EVENT_NAMES, FIRST_PAINT_EVENT_NAMES, FIRST_PAINT_MARKER,
    LAYOUT_EVENT_NAMES, LAYOUT_READ_EVENT_NAME, SCRIPT_EVENT_NAMES, STYLE_EVENT_NAME,
};
use serde::{Deserialize, Serialize};

pub fn is_layout_event(name: &str) -> bool {
    LAYOUT_EVENT_NAMES.contains(&name)
}

/// A layout read is an actual `Layout` pass (as opposed to a tree update)
pub fn is_layout_read(name: &str) -> bool {
    name == LAYOUT_READ_EVENT_NAME
}

pub fn is_style_event(name: &str) -> bool {
    name == STYLE_EVENT_NAME
}

pub fn is_script_event(name: &str) -> bool {
    SCRIPT_EVENT_NAMES.contains(&name)
}

pub fn is_dom_mutation(name: &str) -> bool {
    DOM_MUTATION_EVENT_NAMES.contains(&name) || MutationDirection::from_name(name).is_some()
}

pub fn is_gc_event(name: &str) -> bool {
    name.contains("GC") || name.contains("GarbageCollection")
}

pub fn is_memory_event(name: &str) -> bool {
    name == COUNTERS_EVENT_NAME || is_gc_event(name)
}

pub fn is_first_paint_marker(name: &str) -> bool {
    FIRST_PAINT_EVENT_NAMES.contains(&name) || name.contains(FIRST_PAINT_MARKER)
}

/// Whether a DOM mutation adds or removes nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationDirection {
    Added,
    Removed,
}

impl MutationDirection {
    pub fn from_name(name: &str) -> Option<Self> {
        if name.contains("Removed") || name.contains("RemoveChild") {
            Some(Self::Removed)
        } else if name.contains("Inserted") || name.contains("NodeAdded") || name.contains("AppendChild") {
            Some(Self::Added)
        } else {
            None
        }
    }
}

/// Activity class used to attribute long tasks
///
/// Declaration order is the tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityClass {
    Layout,
    Style,
    Javascript,
    Paint,
    ParseHtml,
    GarbageCollection,
    Other,
}

impl ActivityClass {
    /// Classes that can be dominant, in tie-break order
    pub const RANKED: [ActivityClass; 6] = [
        Self::Layout,
        Self::Style,
        Self::Javascript,
        Self::Paint,
        Self::ParseHtml,
        Self::GarbageCollection,
    ];

    /// Classify an event name, `None` for anything unrecognised
    pub fn classify(name: &str) -> Option<Self> {
        // GC first: "V8.GCScavenger" would otherwise read as script
        if is_gc_event(name) {
            Some(Self::GarbageCollection)
        } else if name.contains("Layout") {
            Some(Self::Layout)
        } else if name.contains("Style") {
            Some(Self::Style)
        } else if name.contains("Paint") || name.contains("Composite") || name.contains("Raster") {
            Some(Self::Paint)
        } else if name == "ParseHTML" {
            Some(Self::ParseHtml)
        } else if is_script_event(name)
            || name.starts_with("V8.")
            || name.contains("Script")
            || matches!(name, "TimerFire" | "EventDispatch" | "FireAnimationFrame" | "RunMicrotasks")
        {
            Some(Self::Javascript)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Style => "style",
            Self::Javascript => "javascript",
            Self::Paint => "paint",
            Self::ParseHtml => "parse-html",
            Self::GarbageCollection => "garbage-collection",
            Self::Other => "other",
        }
    }
}

/// What kind of trigger preceded a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Input,
    Network,
    Timer,
}

const INPUT_HINTS: &[&str] = &["input", "click", "key", "scroll", "touch", "mouse", "pointer"];

impl TriggerKind {
    /// Classify a potential trigger event by its name (and dispatched event type)
    pub fn classify(event: &TraceEvent) -> Option<Self> {
        let name = event.name.to_lowercase();
        let dispatch_type = event.data_str("type").map(str::to_lowercase).unwrap_or_default();

        if INPUT_HINTS.iter().any(|h| name.contains(h) || dispatch_type.contains(h)) {
            Some(Self::Input)
        } else if name.starts_with("resource")
            || name.contains("network")
            || name.contains("xhr")
            || name.contains("fetch")
        {
            Some(Self::Network)
        } else if name.contains("timer") {
            Some(Self::Timer)
        } else {
            None
        }
    }
}

/// Sub-filters computed once per analysis call and shared by the analyzers
#[derive(Debug, Default)]
pub struct EventSets<'a> {
    pub layout: Vec<&'a TraceEvent>,
    pub style: Vec<&'a TraceEvent>,
    pub script: Vec<&'a TraceEvent>,
    pub memory: Vec<&'a TraceEvent>,
    pub dom: Vec<&'a TraceEvent>,
}

impl<'a> EventSets<'a> {
    /// Partition `events` into the shared sub-filters (an event may land in several)
    pub fn from_events(events: &'a [TraceEvent]) -> Self {
        let mut sets = Self::default();

        for event in events {
            let name = event.name.as_str();
            if is_layout_event(name) {
                sets.layout.push(event);
            }
            if is_style_event(name) {
                sets.style.push(event);
            }
            if is_script_event(name) {
                sets.script.push(event);
            }
            if is_memory_event(name) {
                sets.memory.push(event);
            }
            if is_dom_mutation(name) {
                sets.dom.push(event);
            }
        }

        sets
    }
}
