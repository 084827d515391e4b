//! Name-based guesses that stand in for real CSS analysis.
//!
//! Nothing here inspects stylesheets or the CSSOM. A script is treated as a
//! probable custom-property writer purely from its name, which produces both
//! false positives and false negatives.

use crate::parser::payload::ScriptData;
use crate::utils::config::STYLE_SCRIPT_HINTS;

/// Whether a script's function name (or URL when unnamed) hints at style work
pub fn looks_like_style_script(script: &ScriptData) -> bool {
    let name = script
        .function_name
        .as_deref()
        .filter(|f| !f.is_empty())
        .or(script.url.as_deref())
        .unwrap_or_default()
        .to_lowercase();

    STYLE_SCRIPT_HINTS.iter().any(|hint| name.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(function: Option<&str>, url: Option<&str>) -> ScriptData {
        ScriptData {
            url: url.map(String::from),
            function_name: function.map(String::from),
            line_number: None,
        }
    }

    #[test]
    fn test_function_name_hints() {
        assert!(looks_like_style_script(&script(Some("applyTheme"), None)));
        assert!(looks_like_style_script(&script(Some("setCSSVar"), None)));
        assert!(!looks_like_style_script(&script(Some("fetchUsers"), Some("theme.js"))));
    }

    #[test]
    fn test_falls_back_to_url() {
        assert!(looks_like_style_script(&script(None, Some("https://cdn.test/colors.js"))));
        assert!(looks_like_style_script(&script(Some(""), Some("/styles/main.js"))));
        assert!(!looks_like_style_script(&script(None, None)));
    }
}
