//! # Fingerprint Model
//!
//! A content-derived string per chunk, cheap enough to recompute on every
//! token:
//!
//! ```text
//! {index}-{kind ordinal}-{identity}-{content signature}-{ceil(height)}-{ceil(width)}
//! ```
//!
//! The content signature depends on the kind:
//!
//! | kind | signature |
//! |---|---|
//! | Text, Formula, BlockQuote, RawHtml | hash of the rendered plain text |
//! | Code | hash of the rendered plain text, then the language tag |
//! | Table | hash of all cell texts; a random token when every cell is empty |
//! | Image | template, then the full source |
//! | ThematicBreak | a random token |
//!
//! Random tokens mean those chunks never compare equal across passes and are
//! always re-rendered.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

use crate::chunk::{Chunk, ChunkKind, ChunkPayload};

pub fn fingerprint(chunk: &Chunk) -> String {
    let size = chunk.measured_size();
    format!(
        "{}-{}-{}-{}-{}-{}",
        chunk.index(),
        chunk.kind().ordinal(),
        chunk.identity(),
        content_signature(chunk),
        size.height.ceil() as i64,
        size.width.ceil() as i64,
    )
}

/// The kind-specific middle part of a [`fingerprint`].
pub fn content_signature(chunk: &Chunk) -> String {
    match chunk.kind() {
        ChunkKind::Text | ChunkKind::Formula | ChunkKind::BlockQuote | ChunkKind::RawHtml => {
            hash_hex(&chunk.rendered_text().plain_text())
        }
        ChunkKind::Code => {
            let language = match chunk.payload() {
                ChunkPayload::Code(code) => code.language.as_deref().unwrap_or_default(),
                _ => "",
            };
            format!("{}{language}", hash_hex(&chunk.rendered_text().plain_text()))
        }
        ChunkKind::Table => match chunk.payload() {
            ChunkPayload::Table(table) => {
                let contents = table.contents();
                if contents.is_empty() {
                    random_token()
                } else {
                    hash_hex(&contents)
                }
            }
            _ => random_token(),
        },
        ChunkKind::Image => match chunk.payload() {
            ChunkPayload::Image(image) => format!("{}{}", image.template, image.source),
            _ => random_token(),
        },
        ChunkKind::ThematicBreak => random_token(),
    }
}

pub fn hash_hex(text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn random_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::chunk::{ChunkBuilder, CodeRender, IdentityPolicy, ImageSource, TableRender};
    use crate::parsing::{BlockNode, Inline};
    use crate::style::{Size, StyledText};

    fn chunk(kind: ChunkKind, index: usize, text: &str, size: Size) -> Chunk {
        let mut builder = ChunkBuilder::new(kind);
        builder.push_node(index, BlockNode::Paragraph(vec![Inline::Text(text.into())]));
        builder.set_text(StyledText::plain(text));
        builder.set_size(size);
        builder.build(index, IdentityPolicy::Structural)
    }

    /// Text chunk identical to `chunk(Text, 0, "same", 10x10)` apart from
    /// its identity.
    fn identified(first_node: usize, policy: IdentityPolicy) -> Chunk {
        let mut builder = ChunkBuilder::new(ChunkKind::Text);
        builder.push_node(first_node, BlockNode::Paragraph(vec![Inline::Text("same".into())]));
        builder.set_text(StyledText::plain("same"));
        builder.set_size(Size::new(10.0, 10.0));
        builder.build(0, policy)
    }

    fn code_chunk(language: Option<&str>) -> Chunk {
        let mut builder = ChunkBuilder::new(ChunkKind::Code);
        builder.push_node(0, BlockNode::CodeBlock {
            language: language.map(str::to_string),
            code: "x = 1".into(),
        });
        builder.set_text(StyledText::plain("x = 1"));
        builder.set_payload(ChunkPayload::Code(CodeRender {
            language: language.map(str::to_string),
            code: "x = 1".into(),
            highlighted: StyledText::plain("x = 1"),
            code_size: Size::ZERO,
        }));
        builder.build(0, IdentityPolicy::Structural)
    }

    fn table_chunk(cell: &str) -> Chunk {
        let mut builder = ChunkBuilder::new(ChunkKind::Table);
        builder.push_node(0, BlockNode::ThematicBreak);
        builder.set_payload(ChunkPayload::Table(TableRender {
            alignments: vec![],
            header: vec![StyledText::plain(cell)],
            rows: vec![],
            height: 44.0,
        }));
        builder.build(0, IdentityPolicy::Structural)
    }

    #[test]
    fn layout_matches_documented_format() {
        let c = chunk(ChunkKind::Text, 2, "hello", Size::new(719.2, 23.1));
        let expected = format!("2-0-text@2-{}-24-720", hash_hex("hello"));
        assert_eq!(fingerprint(&c), expected);
        assert_eq!(c.fingerprint(), expected);
    }

    #[test]
    fn deterministic_for_identical_content() {
        let a = chunk(ChunkKind::Text, 0, "same", Size::new(10.0, 10.0));
        let b = chunk(ChunkKind::Text, 0, "same", Size::new(10.0, 10.0));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[rstest]
    #[case::kind(chunk(ChunkKind::Formula, 0, "same", Size::new(10.0, 10.0)))]
    #[case::index(chunk(ChunkKind::Text, 1, "same", Size::new(10.0, 10.0)))]
    #[case::text(chunk(ChunkKind::Text, 0, "other", Size::new(10.0, 10.0)))]
    #[case::height(chunk(ChunkKind::Text, 0, "same", Size::new(10.0, 11.0)))]
    #[case::width(chunk(ChunkKind::Text, 0, "same", Size::new(12.0, 10.0)))]
    #[case::structural_identity(identified(3, IdentityPolicy::Structural))]
    #[case::random_identity(identified(0, IdentityPolicy::Random))]
    fn sensitive_to_every_component(#[case] other: Chunk) {
        let base = chunk(ChunkKind::Text, 0, "same", Size::new(10.0, 10.0));
        assert_ne!(base.fingerprint(), other.fingerprint());
    }

    #[test]
    fn identity_alone_changes_the_fingerprint() {
        let a = identified(0, IdentityPolicy::Random);
        let b = identified(0, IdentityPolicy::Random);
        assert_eq!(content_signature(&a), content_signature(&b));
        assert_ne!(a.identity(), b.identity());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn code_signature_includes_language() {
        assert_ne!(
            code_chunk(Some("py")).fingerprint(),
            code_chunk(Some("rs")).fingerprint()
        );
        assert!(content_signature(&code_chunk(Some("py"))).ends_with("py"));
        assert_eq!(
            code_chunk(None).fingerprint(),
            code_chunk(None).fingerprint()
        );
    }

    #[test]
    fn table_signature_hashes_cells() {
        assert_eq!(table_chunk("a").fingerprint(), table_chunk("a").fingerprint());
        assert_ne!(table_chunk("a").fingerprint(), table_chunk("b").fingerprint());
    }

    #[test]
    fn empty_table_and_thematic_break_never_repeat() {
        assert_ne!(table_chunk("").fingerprint(), table_chunk("").fingerprint());

        let rule = || {
            let mut builder = ChunkBuilder::new(ChunkKind::ThematicBreak);
            builder.push_node(0, BlockNode::ThematicBreak);
            builder.build(0, IdentityPolicy::Structural)
        };
        assert_ne!(rule().fingerprint(), rule().fingerprint());
    }

    #[test]
    fn image_signature_is_template_then_source() {
        let mut builder = ChunkBuilder::new(ChunkKind::Image);
        builder.push_node(0, BlockNode::ThematicBreak);
        builder.set_payload(ChunkPayload::Image(ImageSource::parse("pie;1,2")));
        let c = builder.build(0, IdentityPolicy::Structural);
        assert_eq!(content_signature(&c), "piepie;1,2");
    }
}
