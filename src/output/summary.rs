//! Plain-text report summary for the terminal.

use crate::analyzer::schema::AnalysisReport;

const DESCRIPTION_WIDTH: usize = 58;

/// Render a bottleneck table
///
/// **Public** - printed by `analyze --summary`
pub fn format_summary(report: &AnalysisReport) -> String {
    let mut lines = Vec::new();

    lines.push(format!("  Source: {} ({} events)", report.source, report.event_count));
    lines.push("  ┏━━━━━━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┓".to_string());
    lines.push(format!("  ┃ {:<22} ┃ {:<DESCRIPTION_WIDTH$} ┃", "BOTTLENECK", "DESCRIPTION"));
    lines.push("  ┣━━━━━━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┫".to_string());

    if report.bottlenecks.is_empty() {
        lines.push(format!("  ┃ {:<22} ┃ {:<DESCRIPTION_WIDTH$} ┃", "-", "No bottlenecks found"));
    }

    for bottleneck in &report.bottlenecks {
        lines.push(format!(
            "  ┃ {:<22} ┃ {:<DESCRIPTION_WIDTH$} ┃",
            bottleneck.kind.as_str(),
            truncate(&bottleneck.description, DESCRIPTION_WIDTH)
        ));
    }

    lines.push("  ┗━━━━━━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".to_string());

    let errors = report.error_count();
    if errors > 0 {
        lines.push(format!("  ⚠ {} analyzer error(s), see the JSON report for details", errors));
    }

    lines.join("\n")
}

/// Cut to `width` characters, marking the cut with "..."
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
