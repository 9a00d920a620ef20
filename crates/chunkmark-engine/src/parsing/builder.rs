use std::ops::Range;

use log::trace;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Tag};

use super::types::{Alignment, BlockNode, Inline, TableNode};
use crate::preprocess::{FORMULA_CLOSE, FORMULA_OPEN};

/// One open container while walking the event stream.
enum Frame {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    BlockQuote(Vec<BlockNode>),
    List { start: Option<u64>, items: Vec<Vec<BlockNode>> },
    /// List item; tight items carry inline content without a paragraph
    Item { blocks: Vec<BlockNode>, pending: Vec<Inline> },
    CodeBlock { language: Option<String>, code: String },
    Html(String),
    Table(TableNode),
    TableRow { head: bool, cells: Vec<Vec<Inline>> },
    TableCell(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { url: String, content: Vec<Inline> },
    Image { url: String, title: String, alt: String },
    /// Containers we do not model (footnotes, metadata, definition lists,
    /// super/subscript); their content is spliced into the parent
    Transparent { blocks: Vec<BlockNode>, inlines: Vec<Inline> },
}

/// Formula currently being captured between `<Formula>` markers.
struct OpenFormula {
    body_start: usize,
    /// Start events seen inside the formula that are still unmatched
    nested: usize,
}

/// Folds a pulldown-cmark offset event stream into a [`BlockNode`] tree.
///
/// Formula bodies are sliced straight from the source between the
/// preprocessor markers, so Markdown punctuation inside a formula (`*`, `_`,
/// backslash escapes) never reaches the inline parser.
pub(crate) struct TreeBuilder<'s> {
    source: &'s str,
    blocks: Vec<BlockNode>,
    stack: Vec<Frame>,
    formula: Option<OpenFormula>,
    /// End events to drop because their Start was swallowed by a formula
    orphan_ends: usize,
}

impl<'s> TreeBuilder<'s> {
    pub(crate) fn new(source: &'s str) -> Self {
        Self {
            source,
            blocks: Vec::new(),
            stack: Vec::new(),
            formula: None,
            orphan_ends: 0,
        }
    }

    pub(crate) fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        if self.formula.is_some() {
            self.formula_event(event, range);
            return;
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => {
                if self.orphan_ends > 0 {
                    self.orphan_ends -= 1;
                } else {
                    self.close_top();
                }
            }
            Event::Text(text) => match self.stack.last_mut() {
                Some(Frame::CodeBlock { code, .. }) => code.push_str(&text),
                Some(Frame::Html(html)) => html.push_str(&text),
                _ => self.push_inline(Inline::Text(text.into_string())),
            },
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::InlineMath(math) => self.push_inline(Inline::Formula(format!("${math}$"))),
            Event::DisplayMath(math) => self.push_inline(Inline::Formula(format!("$${math}$$"))),
            Event::Html(html) => match self.stack.last_mut() {
                Some(Frame::Html(buf)) => buf.push_str(&html),
                _ => self.push_block(BlockNode::Html(html.into_string())),
            },
            Event::InlineHtml(html) => {
                if html.trim().eq_ignore_ascii_case(FORMULA_OPEN) {
                    self.formula = Some(OpenFormula {
                        body_start: range.end,
                        nested: 0,
                    });
                } else {
                    self.push_inline(Inline::Html(html.into_string()));
                }
            }
            Event::FootnoteReference(label) => {
                self.push_inline(Inline::Text(format!("[^{label}]")))
            }
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.push_block(BlockNode::ThematicBreak),
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_inline(Inline::Text(marker.to_string()));
            }
        }
    }

    fn formula_event(&mut self, event: Event<'_>, range: Range<usize>) {
        let Some(open) = self.formula.as_mut() else {
            return;
        };
        match event {
            Event::InlineHtml(html) if html.trim().eq_ignore_ascii_case(FORMULA_CLOSE) => {
                let body = self.source[open.body_start..range.start].to_string();
                self.orphan_ends += open.nested;
                self.formula = None;
                self.push_inline(Inline::Formula(body));
            }
            Event::Start(_) => open.nested += 1,
            Event::End(_) if open.nested > 0 => open.nested -= 1,
            Event::End(_) => {
                // Container closed before the marker did: keep what we have.
                let end = range.start.max(open.body_start);
                let body = self.source[open.body_start..end].trim_end().to_string();
                trace!("unterminated formula marker, keeping {} bytes", body.len());
                self.formula = None;
                if !body.is_empty() {
                    self.push_inline(Inline::Formula(body));
                }
                self.close_top();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph(Vec::new()),
            Tag::Heading { level, .. } => Frame::Heading {
                level: heading_level(level),
                content: Vec::new(),
            },
            Tag::BlockQuote(_) => Frame::BlockQuote(Vec::new()),
            Tag::CodeBlock(kind) => Frame::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                },
                code: String::new(),
            },
            Tag::HtmlBlock => Frame::Html(String::new()),
            Tag::List(start) => Frame::List {
                start,
                items: Vec::new(),
            },
            Tag::Item => Frame::Item {
                blocks: Vec::new(),
                pending: Vec::new(),
            },
            Tag::Table(alignments) => Frame::Table(TableNode {
                alignments: alignments.into_iter().map(alignment).collect(),
                header: Vec::new(),
                rows: Vec::new(),
            }),
            Tag::TableHead => Frame::TableRow {
                head: true,
                cells: Vec::new(),
            },
            Tag::TableRow => Frame::TableRow {
                head: false,
                cells: Vec::new(),
            },
            Tag::TableCell => Frame::TableCell(Vec::new()),
            Tag::Emphasis => Frame::Emphasis(Vec::new()),
            Tag::Strong => Frame::Strong(Vec::new()),
            Tag::Strikethrough => Frame::Strikethrough(Vec::new()),
            Tag::Link { dest_url, .. } => Frame::Link {
                url: dest_url.into_string(),
                content: Vec::new(),
            },
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                url: dest_url.into_string(),
                title: title.into_string(),
                alt: String::new(),
            },
            _ => Frame::Transparent {
                blocks: Vec::new(),
                inlines: Vec::new(),
            },
        };
        self.stack.push(frame);
    }

    fn close_top(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Paragraph(content) => self.push_block(BlockNode::Paragraph(content)),
            Frame::Heading { level, content } => {
                self.push_block(BlockNode::Heading { level, content })
            }
            Frame::BlockQuote(blocks) => self.push_block(BlockNode::BlockQuote(blocks)),
            Frame::List { start, items } => self.push_block(BlockNode::List { start, items }),
            Frame::Item {
                mut blocks,
                pending,
            } => {
                if !pending.is_empty() {
                    blocks.push(BlockNode::Paragraph(pending));
                }
                if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                    items.push(blocks);
                }
            }
            Frame::CodeBlock { language, mut code } => {
                if code.ends_with('\n') {
                    code.pop();
                }
                self.push_block(BlockNode::CodeBlock { language, code });
            }
            Frame::Html(html) => self.push_block(BlockNode::Html(html)),
            Frame::Table(table) => self.push_block(BlockNode::Table(table)),
            Frame::TableRow { head, cells } => {
                if let Some(Frame::Table(table)) = self.stack.last_mut() {
                    if head {
                        table.header = cells;
                    } else {
                        table.rows.push(cells);
                    }
                }
            }
            Frame::TableCell(content) => {
                if let Some(Frame::TableRow { cells, .. }) = self.stack.last_mut() {
                    cells.push(content);
                }
            }
            Frame::Emphasis(content) => self.push_inline(Inline::Emphasis(content)),
            Frame::Strong(content) => self.push_inline(Inline::Strong(content)),
            Frame::Strikethrough(content) => self.push_inline(Inline::Strikethrough(content)),
            Frame::Link { url, content } => self.push_inline(Inline::Link { url, content }),
            Frame::Image { url, title, alt } => self.push_inline(Inline::Image { url, title, alt }),
            Frame::Transparent { blocks, inlines } => {
                for block in blocks {
                    self.push_block(block);
                }
                for inline in inlines {
                    self.push_inline(inline);
                }
            }
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.stack.last_mut() {
            Some(
                Frame::Paragraph(content)
                | Frame::Heading { content, .. }
                | Frame::TableCell(content)
                | Frame::Emphasis(content)
                | Frame::Strong(content)
                | Frame::Strikethrough(content)
                | Frame::Link { content, .. },
            ) => push_merged(content, inline),
            Some(Frame::Item { pending, .. }) => push_merged(pending, inline),
            Some(Frame::Transparent { inlines, .. }) => push_merged(inlines, inline),
            Some(Frame::Image { alt, .. }) => alt.push_str(&super::inline_plain_text(&[inline])),
            Some(Frame::CodeBlock { code, .. }) => code.push_str(&super::inline_plain_text(&[inline])),
            Some(Frame::Html(html)) => html.push_str(&super::inline_plain_text(&[inline])),
            Some(Frame::BlockQuote(_) | Frame::List { .. } | Frame::Table(_) | Frame::TableRow { .. })
            | None => self.push_block(BlockNode::Paragraph(vec![inline])),
        }
    }

    fn push_block(&mut self, block: BlockNode) {
        match self.stack.last_mut() {
            Some(Frame::BlockQuote(blocks) | Frame::Transparent { blocks, .. }) => blocks.push(block),
            Some(Frame::Item { blocks, pending }) => {
                if !pending.is_empty() {
                    blocks.push(BlockNode::Paragraph(std::mem::take(pending)));
                }
                blocks.push(block);
            }
            _ => self.blocks.push(block),
        }
    }

    pub(crate) fn finish(mut self) -> Vec<BlockNode> {
        if let Some(open) = self.formula.take() {
            let body = self.source[open.body_start..].trim_end().to_string();
            if !body.is_empty() {
                self.push_inline(Inline::Formula(body));
            }
        }
        while !self.stack.is_empty() {
            self.close_top();
        }
        self.blocks
    }
}

/// pulldown-cmark may split one text run into several events.
fn push_merged(content: &mut Vec<Inline>, inline: Inline) {
    if let Inline::Text(next) = &inline
        && let Some(Inline::Text(prev)) = content.last_mut()
    {
        prev.push_str(next);
        return;
    }
    content.push(inline);
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alignment(a: pulldown_cmark::Alignment) -> Alignment {
    match a {
        pulldown_cmark::Alignment::None => Alignment::None,
        pulldown_cmark::Alignment::Left => Alignment::Left,
        pulldown_cmark::Alignment::Center => Alignment::Center,
        pulldown_cmark::Alignment::Right => Alignment::Right,
    }
}
