//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Loads the trace file
//! 2. Runs the analysis engine
//! 3. Writes the JSON report (and optionally prints a summary)

use super::models::AnalyzeArgs;
use crate::analyzer::normalizer::TimeWindow;
use crate::analyzer::schema::{AnalysisReport, BottleneckType};
use crate::analyzer::analyze_trace_data;
use crate::output::{format_summary, write_report};
use crate::parser::load_trace_file;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Trace file missing or unreadable
/// * Report write errors
///
/// Analyzer failures are not errors here: they are recorded in the report.
pub fn execute_analyze(args: AnalyzeArgs) -> Result<AnalysisReport> {
    let start_time = Instant::now();

    info!("Starting analysis of: {}", args.trace_path.display());

    // Step 1: Load trace
    info!("Step 1/3: Loading trace events...");
    let events = load_trace_file(&args.trace_path)
        .with_context(|| format!("Failed to load trace file {}", args.trace_path.display()))?;

    debug!("Loaded {} events", events.len());

    // Step 2: Analyze
    info!("Step 2/3: Running analyzers...");
    let bottlenecks = analyze_trace_data(&events, &args.options);

    for bottleneck in &bottlenecks {
        if bottleneck.kind == BottleneckType::AnalysisError {
            warn!("{}", bottleneck.description);
        } else {
            debug!("  {}: {}", bottleneck.kind.as_str(), bottleneck.description);
        }
    }

    let report = AnalysisReport {
        version: SCHEMA_VERSION.to_string(),
        source: args.trace_path.display().to_string(),
        event_count: events.len(),
        options: args.options.clone(),
        bottlenecks,
        generated_at: chrono::Utc::now().to_rfc3339(),
    };

    // Step 3: Write outputs
    info!("Step 3/3: Writing report...");
    write_report(&report, &args.output_json).context("Failed to write report JSON")?;

    info!("✓ Report written to: {}", args.output_json.display());

    if args.print_summary {
        println!("\n{}", "=".repeat(88));
        println!("BOTTLENECK SUMMARY");
        println!("{}", "=".repeat(88));
        println!("{}", format_summary(&report));
        println!("{}", "=".repeat(88));
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.trace_path.as_os_str().is_empty() {
        anyhow::bail!("Trace path cannot be empty");
    }

    if !args.trace_path.is_file() {
        anyhow::bail!("Trace file not found: {}", args.trace_path.display());
    }

    let threshold = args.options.long_task_threshold_ms;
    if !threshold.is_finite() || threshold <= 0.0 {
        anyhow::bail!("Long task threshold must be a positive number of milliseconds");
    }

    if !args.options.memory_leak_threshold_kb.is_finite() {
        anyhow::bail!("Memory leak threshold must be a finite number");
    }

    if let Some(range) = &args.options.focus_time_range_ms {
        if TimeWindow::parse_ms(range).is_none() {
            anyhow::bail!("Focus range must look like 'start-end' in milliseconds, got '{}'", range);
        }
    }

    Ok(())
}
