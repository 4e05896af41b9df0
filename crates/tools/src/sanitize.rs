//! Cleanup of generated code text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Opening or closing markdown fence, with an optional language tag.
static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z0-9_+\-]*").expect("fence pattern is valid"));

/// Strip markdown code fences and surrounding whitespace from model output.
///
/// Text without fences is only trimmed.
pub fn sanitize_code(raw: &str) -> String {
    FENCE.replace_all(raw, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tagged_fence() {
        let raw = "```rhai\nlet df_result = df_x.copy();\n```\n";
        assert_eq!(sanitize_code(raw), "let df_result = df_x.copy();");
    }

    #[test]
    fn test_strips_python_and_bare_fences() {
        assert_eq!(sanitize_code("```python\n1 + 1\n```"), "1 + 1");
        assert_eq!(sanitize_code("```\n1 + 1\n```"), "1 + 1");
    }

    #[test]
    fn test_no_fence_is_noop() {
        assert_eq!(sanitize_code("  40 + 2\n"), "40 + 2");
    }
}
