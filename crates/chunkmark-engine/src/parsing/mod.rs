//! # Parser Collaborator
//!
//! `parse(text) -> Vec<BlockNode>` over pulldown-cmark. The grammar itself is
//! not ours: this module only folds the event stream into an owned, immutable
//! node tree the segmenter can route on.
//!
//! Formula spans arrive already wrapped in `<Formula>…</Formula>` by the
//! preprocessor; the builder lifts them into [`Inline::Formula`] nodes with
//! their source text untouched.

mod builder;
pub mod types;

use pulldown_cmark::{Options, Parser};

pub use types::{Alignment, BlockNode, Inline, NodeKind, TableNode, inline_plain_text};

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Parse preprocessed Markdown into top-level block nodes.
pub fn parse(text: &str) -> Vec<BlockNode> {
    let mut builder = builder::TreeBuilder::new(text);
    for (event, range) in Parser::new_ext(text, options()).into_offset_iter() {
        builder.event(event, range);
    }
    builder.finish()
}
