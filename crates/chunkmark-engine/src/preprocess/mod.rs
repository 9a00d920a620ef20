//! # Preprocessor
//!
//! Source-to-source rewrites that run before parsing so formula spans and a
//! few ambiguous constructs are unambiguously delimited.
//!
//! Processors run in ascending priority order:
//!
//! | priority | processor | effect |
//! |---|---|---|
//! | 10 | [`FormulaMarker`] | wraps `$..$`, `$$..$$`, `\(..\)`, `\[..\]` in `<Formula>` markers |
//! | 20 | [`CodeFenceBreak`] | moves a fence glued to trailing text onto its own line |
//! | 30 | [`ImageTag`] | turns `<img>src</img>` into a standalone `![](src)` paragraph |
//!
//! Every processor is total: malformed input passes through unchanged, and
//! running the chain twice gives the same text as running it once.

pub mod kinds;

use std::sync::OnceLock;

pub use kinds::{CodeFenceBreak, FormulaMarker, ImageTag};

pub const FORMULA_OPEN: &str = "<Formula>";
pub const FORMULA_CLOSE: &str = "</Formula>";

/// A single source rewrite step.
pub trait Preprocessor: Send + Sync {
    fn name(&self) -> &str;
    /// Lower runs first
    fn priority(&self) -> i32;
    fn process(&self, text: &str) -> String;
}

/// Priority-ordered list of processors.
pub struct PreprocessorChain {
    processors: Vec<Box<dyn Preprocessor>>,
}

impl PreprocessorChain {
    pub fn empty() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    /// Inserts a processor after any already registered with the same priority.
    pub fn register(&mut self, processor: Box<dyn Preprocessor>) {
        let at = self
            .processors
            .partition_point(|p| p.priority() <= processor.priority());
        self.processors.insert(at, processor);
    }

    pub fn with(mut self, processor: impl Preprocessor + 'static) -> Self {
        self.register(Box::new(processor));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    pub fn run(&self, text: &str) -> String {
        self.processors
            .iter()
            .fold(text.to_string(), |acc, p| p.process(&acc))
    }
}

impl Default for PreprocessorChain {
    fn default() -> Self {
        Self::empty()
            .with(FormulaMarker)
            .with(CodeFenceBreak)
            .with(ImageTag)
    }
}

/// Run the default chain.
pub fn preprocess(text: &str) -> String {
    static DEFAULT: OnceLock<PreprocessorChain> = OnceLock::new();
    DEFAULT.get_or_init(PreprocessorChain::default).run(text)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    struct Shout;

    impl Preprocessor for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn priority(&self) -> i32 {
            5
        }

        fn process(&self, text: &str) -> String {
            text.to_uppercase()
        }
    }

    #[test]
    fn default_chain_runs_in_priority_order() {
        let chain = PreprocessorChain::default().with(Shout);
        assert_eq!(chain.names(), vec!["shout", "formula", "code_fence", "image_tag"]);
    }

    #[rstest]
    #[case::plain("just text")]
    #[case::inline_formula("Hello $x^2$ world")]
    #[case::display_formula("before\n$$\na + b\n$$\nafter")]
    #[case::glued_fence("text```py\nprint(1)```")]
    #[case::image("see <img>a.png</img> here")]
    #[case::code_span("`$not$` and $yes$")]
    #[case::fence_closing_code_span("`$p$```")]
    #[case::unclosed_fence("```py\nprint($x$)")]
    fn preprocessing_is_idempotent(#[case] input: &str) {
        let once = preprocess(input);
        assert_eq!(preprocess(&once), once);
    }

    #[test]
    fn end_to_end_example() {
        let out = preprocess("Hello $x^2$ world\n\n```py\nprint(1)\n```");
        assert_eq!(out, "Hello <Formula>$x^2$</Formula> world\n\n```py\nprint(1)\n```");
    }
}
