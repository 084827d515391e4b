//! Output writers for analysis reports.
//!
//! - JSON reports (pretty)
//! - Plain-text summaries

pub mod json;
pub mod summary;

// Re-export main functions
pub use json::{read_report, report_to_string, write_report};
pub use summary::format_summary;
