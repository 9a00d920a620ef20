//! # Chunks
//!
//! A chunk is one independently sized, independently cacheable display unit:
//! a run of inline blocks folded into styled text, or a single code block,
//! table, thematic break, formula or image.
//!
//! Chunks are produced fresh on every segmentation pass through a
//! [`ChunkBuilder`] and never change afterwards. The fingerprint is computed
//! once, in [`ChunkBuilder::build`]. Two chunks are equal when their
//! identity and fingerprint match; the consumer uses that (via
//! [`ChunkDiff`]) to re-render only what changed.

mod builder;
mod diff;
mod identity;
mod payload;

pub use builder::ChunkBuilder;
pub use diff::ChunkDiff;
pub use identity::IdentityPolicy;
pub use payload::{ChunkPayload, CodeRender, FormulaRender, ImageSource, TableRender};

use crate::parsing::BlockNode;
use crate::style::{Size, StyledText};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    Text,
    Code,
    Table,
    BlockQuote,
    ThematicBreak,
    Image,
    Formula,
    RawHtml,
}

impl ChunkKind {
    pub const ALL: [ChunkKind; 8] = [
        ChunkKind::Text,
        ChunkKind::Code,
        ChunkKind::Table,
        ChunkKind::BlockQuote,
        ChunkKind::ThematicBreak,
        ChunkKind::Image,
        ChunkKind::Formula,
        ChunkKind::RawHtml,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            ChunkKind::Text => "text",
            ChunkKind::Code => "code",
            ChunkKind::Table => "table",
            ChunkKind::BlockQuote => "block_quote",
            ChunkKind::ThematicBreak => "thematic_break",
            ChunkKind::Image => "image",
            ChunkKind::Formula => "formula",
            ChunkKind::RawHtml => "raw_html",
        }
    }

    /// Kinds that always fold exactly one block node.
    pub fn is_single_node(self) -> bool {
        !matches!(self, ChunkKind::Text)
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct Chunk {
    index: usize,
    kind: ChunkKind,
    identity: String,
    source_nodes: Vec<BlockNode>,
    rendered_text: StyledText,
    measured_size: Size,
    payload: ChunkPayload,
    fingerprint: String,
}

impl Chunk {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn source_nodes(&self) -> &[BlockNode] {
        &self.source_nodes
    }

    pub fn rendered_text(&self) -> &StyledText {
        &self.rendered_text
    }

    pub fn measured_size(&self) -> Size {
        self.measured_size
    }

    pub fn payload(&self) -> &ChunkPayload {
        &self.payload
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity && self.fingerprint == other.fingerprint
    }
}

impl Eq for Chunk {}
