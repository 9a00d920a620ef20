use crate::chunk::{Chunk, ChunkKind};
use crate::parsing::BlockNode;
use crate::segment::SegmenterConfig;

pub fn check(nodes: &[BlockNode], chunks: &[Chunk], config: &SegmenterConfig) {
    let covered: Vec<&BlockNode> = chunks.iter().flat_map(|c| c.source_nodes()).collect();
    assert_eq!(
        covered.len(),
        nodes.len(),
        "chunks cover {} nodes, input has {}",
        covered.len(),
        nodes.len()
    );
    for (position, (got, want)) in covered.iter().zip(nodes).enumerate() {
        assert!(*got == want, "node {position} out of order or altered");
    }

    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index(), i, "chunk indices must be dense and ordered");
        assert!(
            !chunk.source_nodes().is_empty(),
            "chunk {i} ({}) holds no nodes",
            chunk.kind()
        );
        assert!(
            !chunk.fingerprint().is_empty(),
            "chunk {i} has no fingerprint"
        );

        if chunk.kind().is_single_node() {
            assert_eq!(
                chunk.source_nodes().len(),
                1,
                "{} chunk {i} must hold exactly one node",
                chunk.kind()
            );
        }

        if chunk.kind() == ChunkKind::Text && chunk.source_nodes().len() > 1 {
            assert!(
                chunk.rendered_text().len() <= config.soft_cap,
                "text chunk {i} holds {} units over soft cap {}",
                chunk.rendered_text().len(),
                config.soft_cap
            );
        }
    }
}
