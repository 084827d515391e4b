use crate::output::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate a report JSON file
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(file_path)
        .with_context(|| format!("Failed to read report {}", file_path.display()))?;

    if report.version != SCHEMA_VERSION {
        println!(
            "⚠ Report schema v{} differs from current v{}",
            report.version, SCHEMA_VERSION
        );
    }

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Source: {}", report.source);
    println!("  Events: {}", report.event_count);
    println!("  Bottlenecks: {}", report.bottlenecks.len());
    println!("  Analyzer Errors: {}", report.error_count());
    println!("  Generated: {}", report.generated_at);

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Perf Trace Analyzer Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string          - Schema version (e.g., '1.0.0')");
        println!("  source: string           - Analyzed trace file");
        println!("  eventCount: number       - Events loaded from the trace");
        println!("  options: object          - Options the engine ran with");
        println!("  bottlenecks: array       - Findings, in analyzer order");
        println!("    type: string           - long_tasks | layout_thrashing | javascript_execution |");
        println!("                             css_variables_impact | memory_dom_growth |");
        println!("                             large_resources | resource_loading | analysis_error");
        println!("    description: string    - Short human summary");
        println!("    details: object        - Analyzer-specific payload");
        println!("  generatedAt: string      - ISO 8601 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Perf Trace Analyzer v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Bottleneck analysis for browser performance traces.");
}
