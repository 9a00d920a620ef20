use crate::chunk::{ChunkBuilder, ChunkKind, ChunkPayload, TableRender};
use crate::parsing::{BlockNode, TableNode};
use crate::segment::Segmenter;
use crate::style::{Measurer, Size, StyleConfig, StyledText, Visitor};

/// Height of one cell at the table's cell width, truncated to `max_lines`.
fn cell_height<M: Measurer>(measurer: &M, text: &StyledText, style: &StyleConfig) -> f32 {
    let table = &style.table;
    let height = measurer.measure(text, table.cell_max_width).height;
    let height = if table.max_lines > 0 {
        height.min(table.max_lines as f32 * style.line_height)
    } else {
        height
    };
    height + table.cell_padding.vertical()
}

/// Tallest cell of a row, never below the default cell height.
fn row_height<M: Measurer>(measurer: &M, cells: &[StyledText], style: &StyleConfig) -> f32 {
    cells
        .iter()
        .map(|cell| cell_height(measurer, cell, style))
        .fold(style.table.cell_height, f32::max)
}

pub fn build<V: Visitor, M: Measurer>(
    seg: &Segmenter<V, M>,
    node: &BlockNode,
    table: &TableNode,
) -> ChunkBuilder {
    let style = seg.style();
    let cell = |inlines: &Vec<_>| seg.visitor().visit_inlines(inlines, style);
    let header: Vec<StyledText> = table.header.iter().map(cell).collect();
    let rows: Vec<Vec<StyledText>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(cell).collect())
        .collect();

    let measurer = seg.measurer();
    let height = row_height(measurer, &header, style)
        + rows
            .iter()
            .map(|row| row_height(measurer, row, style))
            .sum::<f32>()
        + style.table.padding.vertical();

    let mut builder = ChunkBuilder::new(ChunkKind::Table);
    builder.set_text(seg.visitor().visit(node, style));
    builder.set_size(Size::new(style.max_container_width, height));
    builder.set_payload(ChunkPayload::Table(TableRender {
        alignments: table.alignments.clone(),
        header,
        rows,
        height,
    }));
    builder
}
