//! Code block highlighting on syntect's bundled grammars and themes.

use std::sync::OnceLock;

use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::cache::RenderCache;
use crate::fingerprint::hash_hex;
use crate::style::{SpanStyle, StyleConfig, StyledText, Tint};

const FALLBACK_THEME: &str = "InspiredGitHub";

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAXES: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAXES.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    static THEMES: OnceLock<ThemeSet> = OnceLock::new();
    THEMES.get_or_init(ThemeSet::load_defaults)
}

fn theme(name: &str) -> Option<&'static Theme> {
    let themes = &theme_set().themes;
    themes.get(name).or_else(|| {
        log::warn!("Unknown highlight theme {name:?}, using {FALLBACK_THEME}");
        themes.get(FALLBACK_THEME)
    })
}

/// Grammar for a fence info string; unknown or missing languages get plain text.
fn syntax_for(language: Option<&str>) -> &'static SyntaxReference {
    let syntaxes = syntax_set();
    language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .and_then(|l| syntaxes.find_syntax_by_token(l))
        .unwrap_or_else(|| syntaxes.find_syntax_plain_text())
}

fn span_style(style: Style) -> SpanStyle {
    let fg = style.foreground;
    SpanStyle {
        bold: style.font_style.contains(FontStyle::BOLD),
        italic: style.font_style.contains(FontStyle::ITALIC),
        ..SpanStyle::code().with_tint(Tint::rgb(fg.r, fg.g, fg.b))
    }
}

/// Tinted buffer for a code block. Plain monospace when highlighting is off.
pub fn highlight(code: &str, language: Option<&str>, style: &StyleConfig) -> StyledText {
    let base = SpanStyle::code();
    let mut out = StyledText::new();
    let theme = style.code.highlight.then(|| theme(&style.code.theme)).flatten();
    let Some(theme) = theme else {
        out.push_str(code, base);
        return out;
    };

    let syntax = syntax_for(language);
    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut offset = 0;
    for line in LinesWithEndings::from(code) {
        match highlighter.highlight_line(line, syntax_set()) {
            Ok(ranges) => {
                for (token_style, text) in ranges {
                    out.push_str(text, span_style(token_style));
                }
            }
            Err(err) => {
                log::warn!("Highlighting {} failed: {err}", syntax.name);
                out.push_str(&code[offset..], base);
                return out;
            }
        }
        offset += line.len();
    }
    out
}

/// Cache key for a highlighted buffer.
pub fn cache_key(code: &str, language: Option<&str>, style: &StyleConfig) -> String {
    format!(
        "code:{}:{}:{}",
        style.cache_tag(),
        language.unwrap_or_default(),
        hash_hex(code)
    )
}

/// [`highlight`] through a text cache.
pub fn highlight_cached(
    code: &str,
    language: Option<&str>,
    style: &StyleConfig,
    cache: &RenderCache<StyledText>,
) -> StyledText {
    let key = cache_key(code, language, style);
    if let Some(hit) = cache.get(&key) {
        return hit;
    }
    let text = highlight(code, language, style);
    cache.set(key, text.clone());
    text
}
