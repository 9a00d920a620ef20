use super::{Chunk, ChunkKind, ChunkPayload, IdentityPolicy};
use crate::fingerprint::fingerprint;
use crate::parsing::BlockNode;
use crate::style::{Size, StyledText};

/// Collects the parts of a chunk; [`build`](Self::build) freezes them.
#[derive(Debug, Clone)]
pub struct ChunkBuilder {
    kind: ChunkKind,
    first_position: Option<usize>,
    nodes: Vec<BlockNode>,
    text: StyledText,
    size: Size,
    payload: ChunkPayload,
}

impl ChunkBuilder {
    pub fn new(kind: ChunkKind) -> Self {
        Self {
            kind,
            first_position: None,
            nodes: Vec::new(),
            text: StyledText::new(),
            size: Size::ZERO,
            payload: ChunkPayload::None,
        }
    }

    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    /// Folds a node; `position` is its index in the segmented sequence.
    pub fn push_node(&mut self, position: usize, node: BlockNode) {
        self.first_position.get_or_insert(position);
        self.nodes.push(node);
    }

    pub fn append_text(&mut self, text: &StyledText) {
        self.text.append(text);
    }

    pub fn set_text(&mut self, text: StyledText) {
        self.text = text;
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn set_payload(&mut self, payload: ChunkPayload) {
        self.payload = payload;
    }

    pub fn text(&self) -> &StyledText {
        &self.text
    }

    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    /// No folded nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn build(self, index: usize, policy: IdentityPolicy) -> Chunk {
        let identity = policy.identity(self.kind, self.first_position.unwrap_or(index));
        let mut chunk = Chunk {
            index,
            kind: self.kind,
            identity,
            source_nodes: self.nodes,
            rendered_text: self.text,
            measured_size: self.size,
            payload: self.payload,
            fingerprint: String::new(),
        };
        chunk.fingerprint = fingerprint(&chunk);
        chunk
    }
}
