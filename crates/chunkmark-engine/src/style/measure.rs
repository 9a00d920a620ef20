use unicode_width::UnicodeWidthChar;

use super::{Size, StyleConfig, StyledText};

/// Sizes a styled buffer against a maximum width.
pub trait Measurer {
    fn measure(&self, text: &StyledText, max_width: f32) -> Size;
}

/// Fixed-advance measurer: every terminal column is `char_width` wide (wide
/// glyphs take two, zero-width marks none), lines wrap at `max_width`, code
/// spans use the code metrics.
///
/// Good enough for terminals and for tests; GUI hosts plug in a real text
/// layout engine instead.
#[derive(Debug, Clone, PartialEq)]
pub struct MonospaceMeasurer {
    pub char_width: f32,
    pub line_height: f32,
    pub code_char_width: f32,
    pub code_line_height: f32,
}

impl MonospaceMeasurer {
    pub fn new(style: &StyleConfig) -> Self {
        Self {
            char_width: style.char_width,
            line_height: style.line_height,
            code_char_width: style.code.char_width,
            code_line_height: style.code.line_height,
        }
    }
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self::new(&StyleConfig::default())
    }
}

#[derive(Default)]
struct Line {
    width: f32,
    height: f32,
    used: bool,
}

impl Measurer for MonospaceMeasurer {
    fn measure(&self, text: &StyledText, max_width: f32) -> Size {
        let mut total_height = 0.0f32;
        let mut widest = 0.0f32;
        let mut line = Line::default();

        let mut close = |line: &mut Line, fallback: f32| {
            total_height += if line.used { line.height } else { fallback };
            widest = widest.max(line.width);
            *line = Line::default();
        };

        for span in text.spans() {
            let (advance, height) = if span.style.code {
                (self.code_char_width, self.code_line_height)
            } else {
                (self.char_width, self.line_height)
            };

            if let Some(attachment) = &span.attachment {
                if max_width > 0.0 && line.used && line.width + attachment.size.width > max_width {
                    close(&mut line, height);
                }
                line.width += attachment.size.width;
                line.height = line.height.max(attachment.size.height).max(height);
                line.used = true;
                continue;
            }

            for ch in span.text.chars() {
                if ch == '\n' {
                    close(&mut line, height);
                    continue;
                }
                let columns = ch.width().unwrap_or(1) as f32;
                let glyph = advance * columns;
                if max_width > 0.0 && line.used && line.width + glyph > max_width {
                    close(&mut line, height);
                }
                line.width += glyph;
                line.height = line.height.max(height);
                line.used = true;
            }
        }
        if line.used {
            close(&mut line, 0.0);
        }

        let width = if max_width > 0.0 {
            widest.min(max_width)
        } else {
            widest
        };
        Size::new(width, total_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Attachment, SpanStyle};

    fn measurer() -> MonospaceMeasurer {
        MonospaceMeasurer {
            char_width: 10.0,
            line_height: 20.0,
            code_char_width: 5.0,
            code_line_height: 10.0,
        }
    }

    #[test]
    fn empty_buffer_measures_zero() {
        assert_eq!(measurer().measure(&StyledText::new(), 100.0), Size::ZERO);
    }

    #[test]
    fn trailing_newline_adds_no_line() {
        let size = measurer().measure(&StyledText::plain("abc\n"), 100.0);
        assert_eq!(size, Size::new(30.0, 20.0));
    }

    #[test]
    fn blank_lines_take_the_span_line_height() {
        let size = measurer().measure(&StyledText::plain("a\n\nb"), 100.0);
        assert_eq!(size.height, 60.0);
    }

    #[test]
    fn long_lines_wrap_at_max_width() {
        let size = measurer().measure(&StyledText::plain("a".repeat(25)), 100.0);
        assert_eq!(size, Size::new(100.0, 60.0));
    }

    #[test]
    fn wide_glyphs_take_two_columns() {
        assert_eq!(
            MonospaceMeasurer::default().measure(&StyledText::plain("世界"), 0.0),
            Size::new(32.0, 24.0)
        );
        let size = measurer().measure(&StyledText::plain("世界世界世界"), 100.0);
        assert_eq!(size, Size::new(100.0, 40.0));
    }

    #[test]
    fn combining_marks_add_no_width() {
        let size = measurer().measure(&StyledText::plain("e\u{301}"), 0.0);
        assert_eq!(size.width, 10.0);
    }

    #[test]
    fn code_spans_use_code_metrics() {
        let mut text = StyledText::new();
        text.push_str("fn main() {}", SpanStyle::code());
        let size = measurer().measure(&text, 0.0);
        assert_eq!(size, Size::new(60.0, 10.0));
    }

    #[test]
    fn attachments_raise_line_height() {
        let mut text = StyledText::plain("x ");
        text.push_attachment(
            "$y$",
            Attachment {
                key: "y".into(),
                size: Size::new(30.0, 45.0),
            },
            SpanStyle::default(),
        );
        let size = measurer().measure(&text, 100.0);
        assert_eq!(size, Size::new(50.0, 45.0));
    }
}
