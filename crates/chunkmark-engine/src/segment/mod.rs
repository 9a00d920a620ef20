//! # Segmenter
//!
//! Partitions a block-node sequence into [`Chunk`]s.
//!
//! ## Rules
//!
//! One Text accumulator is open at a time. Each node is routed through
//! [`Route`]:
//!
//! 1. **Hard split** (tables, code blocks, thematic breaks, plus block
//!    quotes, standalone formulas, standalone images and raw HTML blocks when
//!    their policy flag is on): seal the accumulator if it holds anything,
//!    then emit a dedicated single-node chunk built by the kind's sub-render
//!    in [`kinds`].
//! 2. **Inline**: render the node through the [`Visitor`]. If the
//!    accumulator is non-empty and its length plus the node's length would
//!    exceed the soft cap, seal it first. Fold the node in.
//! 3. After the last node, seal the accumulator if non-empty.
//!
//! So the concatenated `source_nodes` of the output always equal the input,
//! and a Text chunk is either within the soft cap or holds a single node.
//!
//! Sub-renders are pure functions of node content and style; the only
//! shared state they touch is the render cache.

mod highlight;
pub mod kinds;
pub mod snapshot;

use std::sync::Arc;

use log::trace;
use serde::{Deserialize, Serialize};

pub use highlight::{highlight, highlight_cached};

use crate::cache::{RenderCache, text_cache};
use crate::chunk::{Chunk, ChunkBuilder, ChunkKind, IdentityPolicy};
use crate::formula::FormulaRenderer;
use crate::parsing::{BlockNode, TableNode};
use crate::style::{
    Measurer, MonospaceMeasurer, Size, StyleConfig, StyledText, StyledTextVisitor, Visitor,
};

pub const DEFAULT_SOFT_CAP: usize = 2000;

/// Segmentation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Text units a Text chunk may hold before the next node starts a new one
    pub soft_cap: usize,
    pub split_block_quotes: bool,
    /// Paragraphs holding only a formula become Formula chunks
    pub formula_blocks: bool,
    /// Paragraphs holding only an image become Image chunks
    pub image_blocks: bool,
    pub html_blocks: bool,
    pub identity: IdentityPolicy,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            soft_cap: DEFAULT_SOFT_CAP,
            split_block_quotes: false,
            formula_blocks: false,
            image_blocks: false,
            html_blocks: false,
            identity: IdentityPolicy::Structural,
        }
    }
}

/// Where a node goes.
#[derive(Debug, Clone, Copy)]
pub enum Route<'n> {
    Table(&'n TableNode),
    Code {
        language: Option<&'n str>,
        code: &'n str,
    },
    ThematicBreak,
    BlockQuote,
    Formula(&'n str),
    Image(&'n str),
    RawHtml,
    Inline,
}

pub struct Segmenter<V = StyledTextVisitor, M = MonospaceMeasurer> {
    style: StyleConfig,
    config: SegmenterConfig,
    visitor: V,
    measurer: M,
    formulas: Option<FormulaRenderer>,
    text_cache: Arc<RenderCache<StyledText>>,
}

impl Segmenter {
    /// Default visitor and monospace measurer derived from `style`.
    pub fn new(style: StyleConfig, config: SegmenterConfig) -> Self {
        let measurer = MonospaceMeasurer::new(&style);
        Self::with_collaborators(style, config, StyledTextVisitor::new(), measurer)
    }

    /// Renders formulas both inline (through the visitor) and as blocks.
    pub fn with_formulas(mut self, formulas: FormulaRenderer) -> Self {
        self.visitor = StyledTextVisitor::with_formulas(formulas.clone());
        self.with_block_formulas(formulas)
    }
}

impl<V: Visitor, M: Measurer> Segmenter<V, M> {
    pub fn with_collaborators(style: StyleConfig, config: SegmenterConfig, visitor: V, measurer: M) -> Self {
        Self {
            style,
            config,
            visitor,
            measurer,
            formulas: None,
            text_cache: text_cache(),
        }
    }

    /// Renderer for standalone formula chunks only; the visitor is left as is.
    pub fn with_block_formulas(mut self, formulas: FormulaRenderer) -> Self {
        self.formulas = Some(formulas);
        self
    }

    pub fn with_text_cache(mut self, cache: Arc<RenderCache<StyledText>>) -> Self {
        self.text_cache = cache;
        self
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    pub fn measurer(&self) -> &M {
        &self.measurer
    }

    pub fn formulas(&self) -> Option<&FormulaRenderer> {
        self.formulas.as_ref()
    }

    pub fn text_cache(&self) -> &Arc<RenderCache<StyledText>> {
        &self.text_cache
    }

    pub fn route<'n>(&self, node: &'n BlockNode) -> Route<'n> {
        match node {
            BlockNode::Table(table) => Route::Table(table),
            BlockNode::CodeBlock { language, code } => Route::Code {
                language: language.as_deref(),
                code,
            },
            BlockNode::ThematicBreak => Route::ThematicBreak,
            BlockNode::BlockQuote(_) if self.config.split_block_quotes => Route::BlockQuote,
            BlockNode::Html(_) if self.config.html_blocks => Route::RawHtml,
            _ => {
                if self.config.formula_blocks
                    && let Some(source) = node.formula_source()
                {
                    return Route::Formula(source);
                }
                if self.config.image_blocks
                    && let Some((url, _)) = node.image()
                {
                    return Route::Image(url);
                }
                Route::Inline
            }
        }
    }

    pub fn segment(&self, nodes: &[BlockNode]) -> Vec<Chunk> {
        self.segment_until(nodes, || false).unwrap_or_default()
    }

    /// Like [`segment`](Self::segment), checking `is_cancelled` before each
    /// node; `None` once it returns true.
    pub fn segment_until(&self, nodes: &[BlockNode], is_cancelled: impl Fn() -> bool) -> Option<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut acc = ChunkBuilder::new(ChunkKind::Text);

        for (position, node) in nodes.iter().enumerate() {
            if is_cancelled() {
                trace!("segmentation cancelled at node {position}");
                return None;
            }

            let route = self.route(node);
            trace!("node {position} ({:?}) -> {route:?}", node.kind());
            let mut single = match route {
                Route::Table(table) => kinds::table::build(self, node, table),
                Route::Code { language, code } => kinds::code::build(self, language, code),
                Route::ThematicBreak => kinds::thematic::build(self, node),
                Route::BlockQuote => kinds::flow::build(self, ChunkKind::BlockQuote, node),
                Route::RawHtml => kinds::flow::build(self, ChunkKind::RawHtml, node),
                Route::Formula(source) => kinds::formula::build(self, source),
                Route::Image(url) => kinds::image::build(self, node, url),
                Route::Inline => {
                    let text = self.visitor.visit(node, &self.style);
                    if !acc.is_empty() && acc.text_len() + text.len() > self.config.soft_cap {
                        self.seal(&mut acc, &mut chunks);
                    }
                    acc.push_node(position, node.clone());
                    acc.append_text(&text);
                    continue;
                }
            };

            self.seal(&mut acc, &mut chunks);
            single.push_node(position, node.clone());
            chunks.push(single.build(chunks.len(), self.config.identity));
        }

        self.seal(&mut acc, &mut chunks);
        Some(chunks)
    }

    fn seal(&self, acc: &mut ChunkBuilder, chunks: &mut Vec<Chunk>) {
        if acc.is_empty() {
            return;
        }
        let mut builder = std::mem::replace(acc, ChunkBuilder::new(ChunkKind::Text));
        let width = self.style.max_container_width;
        let measured = self.measurer.measure(builder.text(), width);
        builder.set_size(Size::new(width, measured.height));
        chunks.push(builder.build(chunks.len(), self.config.identity));
    }
}

/// Segments with the default collaborators and policy.
pub fn segment(nodes: &[BlockNode], style: &StyleConfig) -> Vec<Chunk> {
    Segmenter::new(style.clone(), SegmenterConfig::default()).segment(nodes)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parsing::{Inline, parse};
    use crate::preprocess::preprocess;

    fn kinds(chunks: &[Chunk]) -> Vec<ChunkKind> {
        chunks.iter().map(Chunk::kind).collect()
    }

    fn isolated() -> Segmenter {
        Segmenter::new(StyleConfig::default(), SegmenterConfig::default())
            .with_text_cache(Arc::new(RenderCache::new("test", 8)))
    }

    fn paragraph(len: usize) -> BlockNode {
        BlockNode::Paragraph(vec![Inline::Text("x".repeat(len))])
    }

    #[test]
    fn no_nodes_no_chunks() {
        assert!(isolated().segment(&[]).is_empty());
    }

    #[test]
    fn hard_splits_isolate_their_node() {
        let nodes = parse("intro\n\n```\ncode\n```\n\nmiddle\n\n---\n\n| a |\n|---|\n| 1 |\n\noutro");
        let chunks = isolated().segment(&nodes);

        assert_eq!(
            kinds(&chunks),
            vec![
                ChunkKind::Text,
                ChunkKind::Code,
                ChunkKind::Text,
                ChunkKind::ThematicBreak,
                ChunkKind::Table,
                ChunkKind::Text,
            ]
        );
        assert!(
            chunks
                .iter()
                .filter(|c| c.kind() != ChunkKind::Text)
                .all(|c| c.source_nodes().len() == 1)
        );
    }

    #[test]
    fn adjacent_inline_nodes_share_a_chunk() {
        let nodes = parse("# Title\n\nOne\n\n- a\n- b\n\n> quote");
        let chunks = isolated().segment(&nodes);

        assert_eq!(kinds(&chunks), vec![ChunkKind::Text]);
        assert_eq!(chunks[0].source_nodes(), nodes.as_slice());
    }

    #[test]
    fn soft_cap_seals_before_overflow() {
        let config = SegmenterConfig {
            soft_cap: 10,
            ..SegmenterConfig::default()
        };
        let segmenter = Segmenter::new(StyleConfig::default(), config);
        // Each paragraph renders to 5 units (4 chars + line break).
        let nodes = vec![paragraph(4), paragraph(4), paragraph(4)];
        let chunks = segmenter.segment(&nodes);

        let lens: Vec<usize> = chunks.iter().map(|c| c.rendered_text().len()).collect();
        assert_eq!(lens, vec![10, 5]);
    }

    #[test]
    fn oversized_node_stays_whole() {
        let config = SegmenterConfig {
            soft_cap: 10,
            ..SegmenterConfig::default()
        };
        let segmenter = Segmenter::new(StyleConfig::default(), config);
        let nodes = vec![paragraph(50), paragraph(2)];
        let chunks = segmenter.segment(&nodes);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source_nodes().len(), 1);
        assert_eq!(chunks[0].rendered_text().len(), 51);
    }

    #[test]
    fn block_quote_split_is_a_policy() {
        let nodes = parse("a\n\n> quoted\n\nb");
        assert_eq!(kinds(&isolated().segment(&nodes)), vec![ChunkKind::Text]);

        let config = SegmenterConfig {
            split_block_quotes: true,
            ..SegmenterConfig::default()
        };
        let chunks = Segmenter::new(StyleConfig::default(), config).segment(&nodes);
        assert_eq!(
            kinds(&chunks),
            vec![ChunkKind::Text, ChunkKind::BlockQuote, ChunkKind::Text]
        );
    }

    #[test]
    fn standalone_formula_and_image_split_when_enabled() {
        let nodes = parse(&preprocess("a\n\n$$\nx\n$$\n\n<img>pie;1,2</img>\n\nb"));
        assert_eq!(kinds(&isolated().segment(&nodes)), vec![ChunkKind::Text]);

        let config = SegmenterConfig {
            formula_blocks: true,
            image_blocks: true,
            ..SegmenterConfig::default()
        };
        let chunks = Segmenter::new(StyleConfig::default(), config).segment(&nodes);
        assert_eq!(
            kinds(&chunks),
            vec![
                ChunkKind::Text,
                ChunkKind::Formula,
                ChunkKind::Image,
                ChunkKind::Text
            ]
        );
    }

    #[test]
    fn indices_follow_output_order() {
        let nodes = parse("a\n\n---\n\nb\n\n---");
        let chunks = isolated().segment(&nodes);
        let indices: Vec<usize> = chunks.iter().map(Chunk::index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn text_chunk_spans_container_width() {
        let style = StyleConfig::default();
        let chunks = segment(&parse("Hello"), &style);
        assert_eq!(chunks[0].measured_size(), Size::new(720.0, 24.0));
    }

    #[test]
    fn cancelled_run_yields_nothing() {
        let nodes = parse("a\n\nb");
        assert!(isolated().segment_until(&nodes, || true).is_none());
    }
}
