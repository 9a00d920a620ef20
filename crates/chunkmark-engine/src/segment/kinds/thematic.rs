use crate::chunk::{ChunkBuilder, ChunkKind};
use crate::parsing::BlockNode;
use crate::segment::Segmenter;
use crate::style::{Measurer, Size, Visitor};

/// Fixed-height rule.
pub fn build<V: Visitor, M: Measurer>(seg: &Segmenter<V, M>, node: &BlockNode) -> ChunkBuilder {
    let style = seg.style();
    let mut builder = ChunkBuilder::new(ChunkKind::ThematicBreak);
    builder.set_text(seg.visitor().visit(node, style));
    builder.set_size(Size::new(
        style.max_container_width,
        style.thematic_break_height,
    ));
    builder
}
