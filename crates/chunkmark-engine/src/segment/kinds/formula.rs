use crate::chunk::{ChunkBuilder, ChunkKind, ChunkPayload, FormulaRender};
use crate::formula::trim_delimiters;
use crate::segment::Segmenter;
use crate::style::{Attachment, Measurer, Size, SpanStyle, StyledText, Visitor};

/// Standalone formula. A rendered image is boxed with the code padding above
/// and below; anything else keeps the source as placeholder text.
pub fn build<V: Visitor, M: Measurer>(seg: &Segmenter<V, M>, source: &str) -> ChunkBuilder {
    let style = seg.style();
    let width = style.max_container_width;
    let result = seg.formulas().map(|r| r.render(source, style));

    let mut builder = ChunkBuilder::new(ChunkKind::Formula);
    match result.as_ref().and_then(|r| r.artifact.as_ref()) {
        Some(image) => {
            let mut text = StyledText::new();
            text.push_attachment(
                source,
                Attachment {
                    key: trim_delimiters(source).to_string(),
                    size: image.size,
                },
                SpanStyle::default(),
            );
            let padding = &style.code.padding;
            builder.set_text(text);
            builder.set_size(Size::new(
                width,
                image.size.height + padding.top + padding.bottom,
            ));
        }
        None => {
            let mut text = StyledText::plain(source);
            text.end_line();
            let measured = seg.measurer().measure(&text, width);
            builder.set_text(text);
            builder.set_size(Size::new(width, measured.height));
        }
    }
    builder.set_payload(ChunkPayload::Formula(FormulaRender {
        source: source.to_string(),
        result,
    }));
    builder
}
