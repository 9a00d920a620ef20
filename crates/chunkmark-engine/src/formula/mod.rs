//! # Formula Strategy Selector
//!
//! Picks, per formula, the cheapest rendering strategy that will not visibly
//! fail, and shares results through the formula [`RenderCache`](crate::cache::RenderCache).
//!
//! ## Strategies
//!
//! - **Fast**: a direct vector renderer ([`MathRenderer`]). Cheap, but only
//!   handles the common subset of TeX.
//! - **Fallback**: TeX to SVG ([`SvgConverter`]) then SVG to image
//!   ([`SvgRasterizer`]). Slower, handles environments, matrices and the like.
//!
//! Formulas carrying environment or annotation commands, or long formulas
//! dense in `{}\^_`, go straight to the fallback. Everything else tries the
//! fast renderer first and falls through on failure.
//!
//! The backends are collaborators: the engine ships [`Unavailable`] and the
//! dimension-probing [`SvgSizeProbe`]; hosts plug in real renderers.

mod backend;
mod strategy;

use std::sync::Arc;

use thiserror::Error;

pub use backend::{MathRenderer, SvgConverter, SvgRasterizer, SvgSizeProbe, Unavailable};
pub use strategy::{
    COMPLEX_MARKERS, FormulaRenderer, MAX_RASTER_DIMENSION, RenderMethod, RenderResult,
    select_method,
};

use crate::style::Size;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Bitmap,
    Svg,
    MathMl,
}

/// A rendered formula: encoded bytes plus the box it occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaImage {
    pub size: Size,
    pub data: Arc<[u8]>,
    pub format: ImageFormat,
}

impl FormulaImage {
    pub fn new(size: Size, data: impl Into<Arc<[u8]>>, format: ImageFormat) -> Self {
        Self {
            size,
            data: data.into(),
            format,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("empty formula")]
    Empty,
    #[error("fast renderer failed: {0}")]
    FastRenderFailed(String),
    #[error("TeX to SVG conversion failed: {0}")]
    ConversionFailed(String),
    #[error("SVG rasterization failed: {0}")]
    RasterizationFailed(String),
    #[error("rendered formula is {width}x{height}, over the {max} limit")]
    TooLarge { width: f32, height: f32, max: f32 },
    #[error("no formula renderer available")]
    RendererUnavailable,
}

/// Strips one wrapping delimiter layer (`\[..\]`, `\(..\)`, `[..]`, `$$..$$`
/// or `$..$`) and the whitespace around and inside it.
pub fn trim_delimiters(text: &str) -> &str {
    let text = text.trim();
    let pairs: [(&str, &str); 5] = [
        ("\\[", "\\]"),
        ("\\(", "\\)"),
        ("[", "]"),
        ("$$", "$$"),
        ("$", "$"),
    ];
    pairs
        .iter()
        .find_map(|(open, close)| {
            (text.len() >= open.len() + close.len())
                .then(|| text.strip_prefix(open)?.strip_suffix(close))
                .flatten()
        })
        .map_or(text, str::trim)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::dollar("$x^2$", "x^2")]
    #[case::double_dollar("$$ E = mc^2 $$", "E = mc^2")]
    #[case::display_multiline("$$\n\\frac{a}{b}\n$$", "\\frac{a}{b}")]
    #[case::brackets("[a+b]", "a+b")]
    #[case::escaped_brackets("\\[a+b\\]", "a+b")]
    #[case::escaped_parens("\\(a+b\\)", "a+b")]
    #[case::surrounding_whitespace("  $y$ \n", "y")]
    #[case::one_layer_only("$$$x$$$", "$x$")]
    #[case::bare("x+1", "x+1")]
    #[case::lone_dollar("$", "$")]
    #[case::empty_pair("$$", "")]
    fn trims_one_delimiter_layer(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(trim_delimiters(input), expected);
    }
}
