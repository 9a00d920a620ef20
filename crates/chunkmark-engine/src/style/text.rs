use super::Size;

/// Length, in text units, of an attachment span (one object-replacement slot).
pub const ATTACHMENT_LEN: usize = 1;

/// Foreground colour a highlighting theme assigns to a span of code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tint {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Tint {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Presentation attributes carried by a span.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub heading: Option<u8>,
    pub quote_depth: u8,
    pub link: Option<String>,
    pub tint: Option<Tint>,
}

impl SpanStyle {
    pub fn code() -> Self {
        Self {
            code: true,
            ..Self::default()
        }
    }

    pub fn with_tint(mut self, tint: Tint) -> Self {
        self.tint = Some(tint);
        self
    }
}

/// An inline object (e.g. a rendered formula) occupying a box in the text flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Key of the rendered artifact in the render cache
    pub key: String,
    pub size: Size,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// Visible text, or the source text an attachment stands in for
    pub text: String,
    pub style: SpanStyle,
    pub attachment: Option<Attachment>,
}

impl Span {
    /// Length in text units: characters for text, one slot for attachments.
    pub fn len(&self) -> usize {
        if self.attachment.is_some() {
            ATTACHMENT_LEN
        } else {
            self.text.chars().count()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attachment.is_none() && self.text.is_empty()
    }
}

/// Style-annotated text produced by a [`Visitor`](super::Visitor).
///
/// Adjacent text spans with identical styles are merged on push, so two
/// buffers holding the same styled content compare equal regardless of how
/// they were assembled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledText {
    spans: Vec<Span>,
    len: usize,
}

impl StyledText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        let mut out = Self::new();
        out.push_str(text, SpanStyle::default());
        out
    }

    pub fn push_str(&mut self, text: impl Into<String>, style: SpanStyle) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.len += text.chars().count();
        if let Some(last) = self.spans.last_mut()
            && last.attachment.is_none()
            && last.style == style
        {
            last.text.push_str(&text);
            return;
        }
        self.spans.push(Span {
            text,
            style,
            attachment: None,
        });
    }

    pub fn push_attachment(&mut self, source: impl Into<String>, attachment: Attachment, style: SpanStyle) {
        self.len += ATTACHMENT_LEN;
        self.spans.push(Span {
            text: source.into(),
            style,
            attachment: Some(attachment),
        });
    }

    pub fn append(&mut self, other: &StyledText) {
        for span in &other.spans {
            match &span.attachment {
                Some(attachment) => {
                    self.push_attachment(span.text.clone(), attachment.clone(), span.style.clone())
                }
                None => self.push_str(span.text.clone(), span.style.clone()),
            }
        }
    }

    /// Ensures the buffer ends with a line break (no-op when empty).
    pub fn end_line(&mut self) {
        if !self.is_empty() && !self.ends_with_newline() {
            self.push_str("\n", SpanStyle::default());
        }
    }

    fn ends_with_newline(&self) -> bool {
        self.spans
            .last()
            .is_some_and(|s| s.attachment.is_none() && s.text.ends_with('\n'))
    }

    /// Length in text units (see [`Span::len`]).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Plain text; attachments contribute the source text they stand in for.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// First non-empty line of plain text, for summaries.
    pub fn first_line(&self) -> String {
        self.plain_text()
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}
