use crate::preprocess::Preprocessor;

/// Puts a fence delimiter that is glued to preceding text onto its own line.
///
/// Streamed model output often closes a block as `print(1)```` without the
/// line break the grammar needs.
pub struct CodeFenceBreak;

impl CodeFenceBreak {
    pub const FENCE: &'static str = "```";

    /// An odd number of backticks before the fence means it closes an inline
    /// code span rather than starting a block.
    fn closes_code_span(prefix: &str) -> bool {
        prefix.ends_with('`') || prefix.matches('`').count() % 2 == 1
    }

    /// Text before a fence on the same line that still lets it open a block:
    /// whitespace, quote markers, list bullets and ordinals.
    fn is_container_prefix(prefix: &str) -> bool {
        prefix.split_whitespace().all(|token| {
            token.chars().all(|c| c == '>')
                || matches!(token, "-" | "*" | "+")
                || token
                    .strip_suffix(['.', ')'])
                    .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        })
    }
}

impl Preprocessor for CodeFenceBreak {
    fn name(&self) -> &str {
        "code_fence"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn process(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        for (at, _) in text.match_indices(Self::FENCE) {
            let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
            let prefix = &text[line_start..at];
            if Self::closes_code_span(prefix) || Self::is_container_prefix(prefix) {
                continue;
            }
            out.push_str(&text[copied..at]);
            out.push('\n');
            copied = at;
        }
        out.push_str(&text[copied..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::glued_close("```py\nprint(1)```", "```py\nprint(1)\n```")]
    #[case::glued_open("Here:```py\nx\n```", "Here:\n```py\nx\n```")]
    #[case::already_fine("```\nx\n```\n", "```\nx\n```\n")]
    #[case::indented("  ```\nx\n  ```", "  ```\nx\n  ```")]
    #[case::quoted("> ```\n> x\n> ```", "> ```\n> x\n> ```")]
    #[case::list_item("- ```\n  x\n  ```", "- ```\n  x\n  ```")]
    #[case::four_backticks("````\nx\n````", "````\nx\n````")]
    #[case::closes_code_span("`$p$```", "`$p$```")]
    #[case::after_code_span("`a` text```py\nx", "`a` text\n```py\nx")]
    fn breaks_only_glued_fences(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(CodeFenceBreak.process(input), expected);
    }
}
