//! Configuration and constants for the analysis engine.
//!
//! Every threshold below is a default observed in production traces.
//! The ones exposed through `AnalysisOptions` can be overridden per call.

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Microseconds per millisecond (trace timestamps are in microseconds)
pub const MICROS_PER_MS: f64 = 1_000.0;
pub const MICROS_PER_SEC: f64 = 1_000_000.0;
pub const BYTES_PER_KB: f64 = 1024.0;

// Option defaults
pub const DEFAULT_LONG_TASK_THRESHOLD_MS: f64 = 50.0;
pub const DEFAULT_LAYOUT_THRASHING_THRESHOLD: usize = 10;
pub const DEFAULT_MEMORY_LEAK_THRESHOLD_KB: f64 = 10.0;

// Long tasks
pub const TASK_CONTEXT_LOOKBACK_MS: f64 = 500.0;

// Clustering / correlation windows
pub const CLUSTER_GAP_MS: f64 = 50.0;
pub const SCRIPT_LOOKBACK_MS: f64 = 100.0;
pub const RECALC_SCRIPT_LOOKBACK_MS: f64 = 50.0;

// Ranking table sizes
pub const TOP_OFFENDERS: usize = 10;
pub const TOP_HEATMAP_TARGETS: usize = 10;
pub const HEATMAP_SAMPLES: usize = 10;
pub const TOP_CALL_STACK_FRAMES: usize = 15;
pub const CORRELATION_SAMPLES: usize = 5;
pub const TOP_RECALC_BOTTLENECKS: usize = 5;
pub const TOP_ELEMENT_GROWTH: usize = 5;

// Layout / style recommendation thresholds
pub const STYLE_RECALC_ADVICE_COUNT: usize = 50;
pub const LAYOUT_FREQUENCY_ADVICE_COUNT: usize = 100;

// JavaScript recommendation thresholds
pub const CORRELATION_BATCHING_COUNT: usize = 10;
pub const SCRIPT_GROUP_SPLIT_MS: f64 = 100.0;
pub const TOTAL_SCRIPT_REDUCTION_MS: f64 = 1_000.0;
pub const DEEP_CALL_STACK_OCCURRENCES: usize = 20;

// CSS recalculation
pub const LONG_RECALC_MS: f64 = 5.0;

// Memory / DOM growth
pub const SUSTAINED_GROWTH_SECS: f64 = 5.0;
pub const DOM_GROWTH_RATE_PER_SEC: f64 = 1.0;
pub const DOM_GROWTH_MIN_NODES: f64 = 10.0;
pub const LISTENER_GROWTH_RATE_PER_SEC: f64 = 0.5;
pub const LISTENER_GROWTH_MIN: f64 = 5.0;
pub const LISTENER_TO_NODE_RATIO: f64 = 1.5;
pub const LARGE_DOM_NODES: f64 = 1_000.0;
pub const HEAP_LIMIT_USAGE_RATIO: f64 = 0.7;
/// Trend bands: (rapid, rising) per second; falling is the negated rising band
pub const HEAP_TREND_KB_PER_SEC: (f64, f64) = (100.0, 10.0);
pub const NODE_TREND_PER_SEC: (f64, f64) = (10.0, 1.0);

// Resource loading
pub const LARGE_RESOURCE_BYTES: u64 = 500_000;
pub const CRITICAL_SCRIPT_BYTES: u64 = 100_000;
pub const CRITICAL_STYLE_BYTES: u64 = 50_000;
pub const CONTENTION_CONCURRENCY: usize = 6;
pub const IMAGE_BUDGET_BYTES: u64 = 1_000_000;
pub const SCRIPT_BUDGET_BYTES: u64 = 500_000;
pub const STYLE_BUDGET_BYTES: u64 = 100_000;
pub const MAX_FONT_FILES: usize = 3;

// Event names (different Chrome versions emit slightly different sets)
pub const LAYOUT_EVENT_NAMES: &[&str] = &["Layout", "UpdateLayoutTree"];
pub const LAYOUT_READ_EVENT_NAME: &str = "Layout";
pub const STYLE_EVENT_NAME: &str = "RecalculateStyles";
pub const SCRIPT_EVENT_NAMES: &[&str] = &["V8.Execute", "FunctionCall", "EvaluateScript"];
pub const EVALUATE_SCRIPT_EVENT_NAME: &str = "EvaluateScript";
pub const COUNTERS_EVENT_NAME: &str = "UpdateCounters";
pub const DOM_MUTATION_EVENT_NAMES: &[&str] = &[
    "UpdateLayoutTree",
    "InvalidateLayout",
    "ScheduleStyleRecalculation",
    "StyleRecalcInvalidationTracking",
    "StyleInvalidatorInvalidationTracking",
    "LayoutInvalidationTracking",
    "DOMNodeInserted",
    "DOMNodeRemoved",
    "DOMAttrModified",
    "DOMCharacterDataModified",
    "DOMSubtreeModified",
];
pub const FIRST_PAINT_EVENT_NAMES: &[&str] = &["firstPaint", "firstContentfulPaint"];
pub const FIRST_PAINT_MARKER: &str = "MarkFirstPaint";

/// Substrings that suggest a script touches styling (see `analyzer::heuristics`)
pub const STYLE_SCRIPT_HINTS: &[&str] = &["style", "css", "theme", "color", "var"];

/// File extension → resource type table
pub const RESOURCE_EXTENSIONS: &[(&str, &[&str])] = &[
    ("image", &["png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico", "bmp"]),
    ("script", &["js", "mjs", "cjs"]),
    ("style", &["css"]),
    ("font", &["woff", "woff2", "ttf", "otf", "eot"]),
    ("document", &["html", "htm", "php", "asp", "aspx"]),
    ("media", &["mp4", "webm", "mp3", "ogg", "wav", "m4a", "mov"]),
    ("data", &["json", "xml", "csv", "txt"]),
];
