use crate::chunk::{ChunkBuilder, ChunkKind};
use crate::parsing::BlockNode;
use crate::segment::Segmenter;
use crate::style::{Measurer, Size, Visitor};

/// Block quotes and raw HTML split out on their own: visitor text measured
/// at the container width.
pub fn build<V: Visitor, M: Measurer>(
    seg: &Segmenter<V, M>,
    kind: ChunkKind,
    node: &BlockNode,
) -> ChunkBuilder {
    let style = seg.style();
    let text = seg.visitor().visit(node, style);
    let measured = seg.measurer().measure(&text, style.max_container_width);

    let mut builder = ChunkBuilder::new(kind);
    builder.set_text(text);
    builder.set_size(Size::new(style.max_container_width, measured.height));
    builder
}
