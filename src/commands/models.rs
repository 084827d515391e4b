use crate::analyzer::options::AnalysisOptions;
use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Trace file to analyze
    pub trace_path: PathBuf,

    /// Output path for JSON report
    pub output_json: PathBuf,

    /// Engine options after config file and flag overrides
    pub options: AnalysisOptions,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            trace_path: PathBuf::from("trace.json"),
            output_json: PathBuf::from("report.json"),
            options: AnalysisOptions::default(),
            print_summary: false,
        }
    }
}

/// Analyzer names accepted by `--skip`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Analyzer {
    LongTasks,
    LayoutThrashing,
    JsExecution,
    CssVariables,
    MemoryDom,
    ResourceLoading,
}

impl Analyzer {
    /// Switch this analyzer off in `options`
    pub fn disable(&self, options: &mut AnalysisOptions) {
        let flag = match self {
            Self::LongTasks => &mut options.analyze_long_tasks,
            Self::LayoutThrashing => &mut options.analyze_layout_thrashing,
            Self::JsExecution => &mut options.analyze_js_execution,
            Self::CssVariables => &mut options.analyze_css_variables,
            Self::MemoryDom => &mut options.analyze_memory_and_dom,
            Self::ResourceLoading => &mut options.analyze_resource_loading,
        };
        *flag = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_only_touches_one_flag() {
        let mut options = AnalysisOptions::default();
        Analyzer::MemoryDom.disable(&mut options);

        assert!(!options.analyze_memory_and_dom);
        assert!(options.analyze_long_tasks);
        assert!(options.analyze_resource_loading);
    }
}
