use crate::chunk::{ChunkBuilder, ChunkKind, ChunkPayload, ImageSource};
use crate::parsing::BlockNode;
use crate::segment::Segmenter;
use crate::style::{Measurer, Size, Visitor};

/// Fixed-height image box; loading the image is the consumer's job.
pub fn build<V: Visitor, M: Measurer>(
    seg: &Segmenter<V, M>,
    node: &BlockNode,
    url: &str,
) -> ChunkBuilder {
    let style = seg.style();
    let mut builder = ChunkBuilder::new(ChunkKind::Image);
    builder.set_text(seg.visitor().visit(node, style));
    builder.set_size(Size::new(style.max_container_width, style.image_height));
    builder.set_payload(ChunkPayload::Image(ImageSource::parse(url)));
    builder
}
