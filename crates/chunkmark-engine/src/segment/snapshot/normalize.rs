use serde::Serialize;

use crate::chunk::{Chunk, ChunkKind, ChunkPayload};

#[derive(Debug, Serialize)]
pub struct Snap {
    pub chunks: Vec<ChunkSnap>,
}

#[derive(Debug, Serialize)]
pub struct ChunkSnap {
    pub index: usize,
    pub kind: String,
    pub nodes: Vec<String>,
    pub size: (f32, f32),
    pub text: String,
    /// Kind-specific detail: code language, table shape, image template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn detail(chunk: &Chunk) -> Option<String> {
    match chunk.payload() {
        ChunkPayload::None => None,
        ChunkPayload::Code(code) => Some(code.language.clone().unwrap_or_default()),
        ChunkPayload::Table(table) => Some(format!("{}x{}", table.header.len(), table.rows.len())),
        ChunkPayload::Formula(formula) => Some(match &formula.result {
            Some(result) if result.success => "rendered".to_string(),
            _ => "placeholder".to_string(),
        }),
        ChunkPayload::Image(image) => Some(image.template.clone()),
    }
}

pub fn normalize(chunks: &[Chunk]) -> Snap {
    let chunks = chunks
        .iter()
        .map(|c| ChunkSnap {
            index: c.index(),
            kind: c.kind().name().to_string(),
            nodes: c
                .source_nodes()
                .iter()
                .map(|n| format!("{:?}", n.kind()))
                .collect(),
            size: (c.measured_size().width, c.measured_size().height),
            text: c.rendered_text().first_line(),
            detail: detail(c),
        })
        .collect();
    Snap { chunks }
}

/// One line per chunk: `index kind[detail] nodes=n h=height | first line`.
pub fn summary(chunks: &[Chunk]) -> String {
    normalize(chunks)
        .chunks
        .iter()
        .map(|c| {
            let detail = c
                .detail
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| format!("[{d}]"))
                .unwrap_or_default();
            format!(
                "{} {}{} nodes={} h={} | {}",
                c.index,
                c.kind,
                detail,
                c.nodes.len(),
                c.size.1.ceil(),
                c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Kind counts in output order, handy for coarse assertions.
pub fn kinds(chunks: &[Chunk]) -> Vec<ChunkKind> {
    chunks.iter().map(Chunk::kind).collect()
}
