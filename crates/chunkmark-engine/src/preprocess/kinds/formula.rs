use std::sync::OnceLock;

use regex::Regex;

use crate::preprocess::{FORMULA_CLOSE, FORMULA_OPEN, Preprocessor};

/// Wraps formula spans in `<Formula>` markers.
pub struct FormulaMarker;

impl FormulaMarker {
    /// Matches of this many characters or more are left alone.
    pub const MAX_LEN: usize = 3000;

    fn pattern() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        // Leftmost alternative wins. The first four alternatives are regions
        // to skip: already-marked formulas, fenced code (an unclosed fence runs
        // to the end of the input), inline code.
        PATTERN.get_or_init(|| {
            Regex::new(
                r"(?s)<Formula>.*?</Formula>|```(?:.*?```|.*\z)|~~~(?:.*?~~~|.*\z)|`[^`\n]+`|\$\$.+?\$\$|\$.+?\$|\\\[.+?\\\]|\\\(.+?\\\)",
            )
            .expect("Invalid formula regex")
        })
    }

    fn is_skipped_region(m: &str) -> bool {
        m.starts_with(FORMULA_OPEN) || m.starts_with(['`', '~'])
    }

    fn wrap(m: &str) -> String {
        if m.contains('\n') {
            format!("\n\n{FORMULA_OPEN}{m}{FORMULA_CLOSE}\n\n")
        } else {
            format!("{FORMULA_OPEN}{m}{FORMULA_CLOSE}")
        }
    }
}

impl Preprocessor for FormulaMarker {
    fn name(&self) -> &str {
        "formula"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn process(&self, text: &str) -> String {
        let spans: Vec<_> = Self::pattern()
            .find_iter(text)
            .filter(|m| !Self::is_skipped_region(m.as_str()))
            .filter(|m| m.as_str().chars().count() < Self::MAX_LEN)
            .map(|m| (m.range(), Self::wrap(m.as_str())))
            .collect();

        let mut out = text.to_string();
        for (range, replacement) in spans.into_iter().rev() {
            out.replace_range(range, &replacement);
        }
        out
    }
}
