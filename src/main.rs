//! Perf Trace Analyzer CLI
//!
//! Finds performance bottlenecks in browser trace files: long tasks,
//! layout thrashing, script-triggered layouts, style recalculation cost,
//! memory and DOM growth, and network waterfalls.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use perf_trace_analyzer::analyzer::{load_options, AnalysisOptions, DetailLevel};
use perf_trace_analyzer::commands::{
    display_schema, display_version, execute_analyze, validate_args, validate_report_file, AnalyzeArgs,
    Analyzer,
};

/// Perf Trace Analyzer - bottleneck analysis for browser traces
#[derive(Parser, Debug)]
#[command(name = "perf-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a trace file
    Analyze {
        /// Trace JSON file (event array or DevTools export)
        #[arg(short, long)]
        trace: PathBuf,

        /// Output path for JSON report
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// TOML options file (camelCase keys)
        #[arg(short, long, env = "PERF_TRACE_CONFIG")]
        config: Option<PathBuf>,

        /// Tasks at or above this many milliseconds are long tasks
        #[arg(long)]
        long_task_threshold: Option<f64>,

        /// Heap growth (KB/s) above which a leak is suspected
        #[arg(long)]
        memory_leak_threshold: Option<f64>,

        /// Only analyze events in this window, e.g. "1000-2500" (ms)
        #[arg(long)]
        focus_range: Option<String>,

        /// Flag DOM targets matching this selector in the mutation heatmap
        #[arg(long)]
        focus_selector: Option<String>,

        /// Amount of detail in long-task output
        #[arg(long, value_enum)]
        detail_level: Option<DetailLevel>,

        /// Omit recommendations from the report
        #[arg(long)]
        no_recommendations: bool,

        /// Analyzers to skip (repeatable)
        #[arg(long, value_enum)]
        skip: Vec<Analyzer>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            trace,
            output,
            config,
            long_task_threshold,
            memory_leak_threshold,
            focus_range,
            focus_selector,
            detail_level,
            no_recommendations,
            skip,
            summary,
        } => {
            // Config file first, flags override
            let mut options = match &config {
                Some(path) => load_options(path)
                    .with_context(|| format!("Failed to load options from {}", path.display()))?,
                None => AnalysisOptions::default(),
            };

            if let Some(threshold) = long_task_threshold {
                options.long_task_threshold_ms = threshold;
            }
            if let Some(threshold) = memory_leak_threshold {
                options.memory_leak_threshold_kb = threshold;
            }
            if let Some(level) = detail_level {
                options.detail_level = level;
            }
            if focus_range.is_some() {
                options.focus_time_range_ms = focus_range;
            }
            if focus_selector.is_some() {
                options.focus_selector = focus_selector;
            }
            if no_recommendations {
                options.include_recommendations = false;
            }
            for analyzer in &skip {
                analyzer.disable(&mut options);
            }

            let args = AnalyzeArgs {
                trace_path: trace,
                output_json: output,
                options,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Validate { file } => {
            validate_report_file(&file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
