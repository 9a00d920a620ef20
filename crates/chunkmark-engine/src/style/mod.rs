//! # Style & Visitor Collaborators
//!
//! The segmenter does not lay out text itself. It asks two collaborators:
//!
//! - a [`Visitor`] turning a block node into a [`StyledText`] buffer, and
//! - a [`Measurer`] sizing a buffer against a maximum width.
//!
//! Both read the current [`StyleConfig`]; every sub-render is a pure function
//! of node content and style, so a style change means a fresh segmentation
//! pass (and a cache clear, since cached artifacts were laid out with the old
//! style).

pub mod measure;
pub mod text;
pub mod visitor;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use measure::{Measurer, MonospaceMeasurer};
pub use text::{Attachment, Span, SpanStyle, StyledText, Tint};
pub use visitor::{StyledTextVisitor, Visitor};

/// Width × height of a laid-out box, in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeInsets {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

impl EdgeInsets {
    pub const fn new(top: f32, left: f32, bottom: f32, right: f32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeBlockStyle {
    pub padding: EdgeInsets,
    /// Height of the language/header bar above the code
    pub header_height: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub char_width: f32,
    /// Apply syntax tints; when off, code renders as untinted monospace
    pub highlight: bool,
    /// Name of a bundled highlighting theme
    pub theme: String,
}

impl Default for CodeBlockStyle {
    fn default() -> Self {
        Self {
            padding: EdgeInsets::new(12.0, 16.0, 12.0, 16.0),
            header_height: 32.0,
            font_size: 14.0,
            line_height: 20.0,
            char_width: 8.4,
            highlight: true,
            theme: "InspiredGitHub".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableStyle {
    pub padding: EdgeInsets,
    pub cell_padding: EdgeInsets,
    /// Minimum height of any row
    pub cell_height: f32,
    pub cell_max_width: f32,
    /// Lines shown per cell before truncation
    pub max_lines: usize,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            padding: EdgeInsets::new(12.0, 16.0, 12.0, 16.0),
            cell_padding: EdgeInsets::new(8.0, 12.0, 8.0, 12.0),
            cell_height: 44.0,
            cell_max_width: 300.0,
            max_lines: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaStyle {
    pub font_size: f32,
    /// Foreground colour as `#rrggbb`
    pub color: String,
}

impl Default for FormulaStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            color: "#1f2328".to_string(),
        }
    }
}

/// Everything the visitor, measurer and sub-renders read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub max_container_width: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub char_width: f32,
    pub thematic_break_height: f32,
    pub image_height: f32,
    pub code: CodeBlockStyle,
    pub table: TableStyle,
    pub formula: FormulaStyle,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            max_container_width: 720.0,
            font_size: 16.0,
            line_height: 24.0,
            char_width: 8.0,
            thematic_break_height: 30.0,
            image_height: 100.0,
            code: CodeBlockStyle::default(),
            table: TableStyle::default(),
            formula: FormulaStyle::default(),
        }
    }
}

impl StyleConfig {
    /// Short tag identifying this style, used to scope cache keys for
    /// style-dependent artifacts.
    pub fn cache_tag(&self) -> String {
        let mut hasher = DefaultHasher::new();
        format!("{self:?}").hash(&mut hasher);
        format!("{:08x}", hasher.finish() as u32)
    }
}
