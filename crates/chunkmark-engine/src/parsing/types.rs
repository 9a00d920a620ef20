/// Column alignment of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableNode {
    pub alignments: Vec<Alignment>,
    pub header: Vec<Vec<Inline>>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

/// A top-level (or nested) block produced by the parser. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockNode {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    CodeBlock { language: Option<String>, code: String },
    Table(TableNode),
    BlockQuote(Vec<BlockNode>),
    List { start: Option<u64>, items: Vec<Vec<BlockNode>> },
    ThematicBreak,
    Html(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { url: String, content: Vec<Inline> },
    Image { url: String, title: String, alt: String },
    /// Formula source exactly as written between the preprocessor markers,
    /// delimiters included (e.g. `$x^2$`)
    Formula(String),
    Html(String),
    SoftBreak,
    HardBreak,
}

/// Coarse node discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Paragraph,
    Heading,
    CodeBlock,
    Table,
    BlockQuote,
    List,
    ThematicBreak,
    Html,
}

impl BlockNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            BlockNode::Paragraph(_) => NodeKind::Paragraph,
            BlockNode::Heading { .. } => NodeKind::Heading,
            BlockNode::CodeBlock { .. } => NodeKind::CodeBlock,
            BlockNode::Table(_) => NodeKind::Table,
            BlockNode::BlockQuote(_) => NodeKind::BlockQuote,
            BlockNode::List { .. } => NodeKind::List,
            BlockNode::ThematicBreak => NodeKind::ThematicBreak,
            BlockNode::Html(_) => NodeKind::Html,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, BlockNode::Table(_))
    }

    pub fn is_code_block(&self) -> bool {
        matches!(self, BlockNode::CodeBlock { .. })
    }

    pub fn is_thematic_break(&self) -> bool {
        matches!(self, BlockNode::ThematicBreak)
    }

    pub fn is_block_quote(&self) -> bool {
        matches!(self, BlockNode::BlockQuote(_))
    }

    pub fn is_html(&self) -> bool {
        matches!(self, BlockNode::Html(_))
    }

    /// A paragraph whose only content is an image.
    pub fn is_image(&self) -> bool {
        self.image().is_some()
    }

    /// A paragraph whose only content is a formula span.
    pub fn is_formula(&self) -> bool {
        self.formula_source().is_some()
    }

    pub fn formula_source(&self) -> Option<&str> {
        match self.sole_inline()? {
            Inline::Formula(source) => Some(source),
            _ => None,
        }
    }

    /// `(url, alt)` of a paragraph holding a single image.
    pub fn image(&self) -> Option<(&str, &str)> {
        match self.sole_inline()? {
            Inline::Image { url, alt, .. } => Some((url, alt)),
            _ => None,
        }
    }

    fn sole_inline(&self) -> Option<&Inline> {
        let BlockNode::Paragraph(inlines) = self else {
            return None;
        };
        let mut significant = inlines.iter().filter(|i| !i.is_blank());
        let first = significant.next()?;
        significant.next().is_none().then_some(first)
    }
}

impl Inline {
    fn is_blank(&self) -> bool {
        match self {
            Inline::Text(t) => t.trim().is_empty(),
            Inline::SoftBreak | Inline::HardBreak => true,
            _ => false,
        }
    }
}

/// Unstyled text of an inline sequence.
pub fn inline_plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect_plain(inlines, &mut out);
    out
}

fn collect_plain(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) | Inline::Formula(t) | Inline::Html(t) => {
                out.push_str(t)
            }
            Inline::Emphasis(c) | Inline::Strong(c) | Inline::Strikethrough(c) => {
                collect_plain(c, out)
            }
            Inline::Link { content, .. } => collect_plain(content, out),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::SoftBreak => out.push(' '),
            Inline::HardBreak => out.push('\n'),
        }
    }
}
