use super::CODE_GAP;
use crate::chunk::{ChunkBuilder, ChunkKind, ChunkPayload, CodeRender};
use crate::segment::{Segmenter, highlight_cached};
use crate::style::{Measurer, Size, Visitor};

/// Code is laid out unwrapped up to twice the container width; the box
/// stacks padding, header, gap, code, gap, padding.
pub fn build<V: Visitor, M: Measurer>(
    seg: &Segmenter<V, M>,
    language: Option<&str>,
    code: &str,
) -> ChunkBuilder {
    let style = seg.style();
    let highlighted = highlight_cached(code, language, style, seg.text_cache());
    let code_size = seg
        .measurer()
        .measure(&highlighted, style.max_container_width * 2.0);

    let padding = &style.code.padding;
    let height = padding.top
        + style.code.header_height
        + CODE_GAP
        + code_size.height
        + CODE_GAP
        + padding.bottom;

    let mut builder = ChunkBuilder::new(ChunkKind::Code);
    builder.set_text(highlighted.clone());
    builder.set_size(Size::new(style.max_container_width, height));
    builder.set_payload(ChunkPayload::Code(CodeRender {
        language: language.map(str::to_string),
        code: code.to_string(),
        highlighted,
        code_size,
    }));
    builder
}
