use log::trace;

use super::{Attachment, SpanStyle, StyleConfig, StyledText};
use crate::formula::{FormulaRenderer, trim_delimiters};
use crate::parsing::{BlockNode, Inline};

/// Turns parsed nodes into styled text.
pub trait Visitor {
    /// Styled text for one block; the result ends with a line break.
    fn visit(&self, node: &BlockNode, style: &StyleConfig) -> StyledText;

    /// Styled text for an inline run (a table cell, a heading body).
    fn visit_inlines(&self, inlines: &[Inline], style: &StyleConfig) -> StyledText;
}

/// Default visitor.
///
/// With a [`FormulaRenderer`] attached, inline formulas become attachment
/// spans sized from the rendered image; without one, or when rendering
/// fails, the formula source stays in the text.
#[derive(Debug, Clone, Default)]
pub struct StyledTextVisitor {
    formulas: Option<FormulaRenderer>,
}

#[derive(Clone, Default)]
struct Context {
    span: SpanStyle,
    indent: usize,
}

impl Context {
    fn with(&self, f: impl FnOnce(&mut SpanStyle)) -> Self {
        let mut next = self.clone();
        f(&mut next.span);
        next
    }
}

impl StyledTextVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formulas(formulas: FormulaRenderer) -> Self {
        Self {
            formulas: Some(formulas),
        }
    }

    pub fn formulas(&self) -> Option<&FormulaRenderer> {
        self.formulas.as_ref()
    }

    fn block(&self, node: &BlockNode, cx: &Context, style: &StyleConfig, out: &mut StyledText) {
        match node {
            BlockNode::Paragraph(inlines) => {
                self.indent(cx, out);
                self.inlines(inlines, cx, style, out);
            }
            BlockNode::Heading { level, content } => {
                self.indent(cx, out);
                let cx = cx.with(|s| {
                    s.heading = Some(*level);
                    s.bold = true;
                });
                self.inlines(content, &cx, style, out);
            }
            BlockNode::CodeBlock { code, .. } => {
                let cx = cx.with(|s| s.code = true);
                for line in code.lines() {
                    self.indent(&cx, out);
                    out.push_str(line, cx.span.clone());
                    out.end_line();
                }
            }
            BlockNode::Table(table) => {
                for row in std::iter::once(&table.header).chain(&table.rows) {
                    self.indent(cx, out);
                    for (i, cell) in row.iter().enumerate() {
                        if i > 0 {
                            out.push_str(" | ", cx.span.clone());
                        }
                        self.inlines(cell, cx, style, out);
                    }
                    out.end_line();
                }
            }
            BlockNode::BlockQuote(children) => {
                let cx = cx.with(|s| s.quote_depth = s.quote_depth.saturating_add(1));
                for child in children {
                    self.block(child, &cx, style, out);
                }
            }
            BlockNode::List { start, items } => {
                for (i, item) in items.iter().enumerate() {
                    let marker = match start {
                        Some(n) => format!("{}. ", n + i as u64),
                        None => "• ".to_string(),
                    };
                    self.indent(cx, out);
                    out.push_str(marker, cx.span.clone());
                    let nested = Context {
                        span: cx.span.clone(),
                        indent: cx.indent + 1,
                    };
                    for (j, child) in item.iter().enumerate() {
                        // The first paragraph sits on the marker line.
                        match child {
                            BlockNode::Paragraph(inlines) if j == 0 => {
                                self.inlines(inlines, cx, style, out);
                                out.end_line();
                            }
                            _ => self.block(child, &nested, style, out),
                        }
                    }
                    out.end_line();
                }
            }
            BlockNode::ThematicBreak => {
                self.indent(cx, out);
                out.push_str("---", cx.span.clone());
            }
            BlockNode::Html(html) => {
                let cx = cx.with(|s| s.code = true);
                out.push_str(html.trim_end(), cx.span);
            }
        }
        out.end_line();
    }

    fn indent(&self, cx: &Context, out: &mut StyledText) {
        if cx.indent > 0 {
            out.push_str("  ".repeat(cx.indent), cx.span.clone());
        }
    }

    fn inlines(&self, inlines: &[Inline], cx: &Context, style: &StyleConfig, out: &mut StyledText) {
        for inline in inlines {
            match inline {
                Inline::Text(text) | Inline::Html(text) => out.push_str(text.as_str(), cx.span.clone()),
                Inline::Code(code) => out.push_str(code.as_str(), cx.with(|s| s.code = true).span),
                Inline::Emphasis(children) => {
                    self.inlines(children, &cx.with(|s| s.italic = true), style, out)
                }
                Inline::Strong(children) => {
                    self.inlines(children, &cx.with(|s| s.bold = true), style, out)
                }
                Inline::Strikethrough(children) => {
                    self.inlines(children, &cx.with(|s| s.strikethrough = true), style, out)
                }
                Inline::Link { url, content } => {
                    let cx = cx.with(|s| s.link = Some(url.clone()));
                    self.inlines(content, &cx, style, out);
                }
                Inline::Image { alt, .. } => {
                    let label = if alt.is_empty() { "[image]" } else { alt.as_str() };
                    out.push_str(label, cx.span.clone());
                }
                Inline::Formula(source) => self.formula(source, cx, style, out),
                Inline::SoftBreak => out.push_str(" ", cx.span.clone()),
                Inline::HardBreak => out.push_str("\n", cx.span.clone()),
            }
        }
    }

    fn formula(&self, source: &str, cx: &Context, style: &StyleConfig, out: &mut StyledText) {
        let Some(renderer) = &self.formulas else {
            out.push_str(source, cx.span.clone());
            return;
        };
        let result = renderer.render(source, style);
        match result.artifact {
            Some(image) if result.success => {
                let attachment = Attachment {
                    key: trim_delimiters(source).to_string(),
                    size: image.size,
                };
                out.push_attachment(source, attachment, cx.span.clone());
            }
            _ => {
                trace!("inline formula {source:?} kept as text");
                out.push_str(source, cx.span.clone());
            }
        }
    }
}

impl Visitor for StyledTextVisitor {
    fn visit(&self, node: &BlockNode, style: &StyleConfig) -> StyledText {
        let mut out = StyledText::new();
        self.block(node, &Context::default(), style, &mut out);
        out
    }

    fn visit_inlines(&self, inlines: &[Inline], style: &StyleConfig) -> StyledText {
        let mut out = StyledText::new();
        self.inlines(inlines, &Context::default(), style, &mut out);
        out
    }
}
