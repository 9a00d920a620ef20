use crate::formula::RenderResult;
use crate::parsing::Alignment;
use crate::style::{Size, StyledText};

/// Kind-specific data produced by a chunk's sub-render.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ChunkPayload {
    #[default]
    None,
    Code(CodeRender),
    Table(TableRender),
    Formula(FormulaRender),
    Image(ImageSource),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeRender {
    pub language: Option<String>,
    pub code: String,
    /// Syntax-tinted buffer
    pub highlighted: StyledText,
    /// Box of the code body alone, before padding and header
    pub code_size: Size,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRender {
    pub alignments: Vec<Alignment>,
    pub header: Vec<StyledText>,
    pub rows: Vec<Vec<StyledText>>,
    pub height: f32,
}

impl TableRender {
    /// Plain text of every header and body cell, concatenated.
    pub fn contents(&self) -> String {
        self.header
            .iter()
            .chain(self.rows.iter().flatten())
            .map(StyledText::plain_text)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormulaRender {
    /// Formula source with its delimiters
    pub source: String,
    /// `None` when no renderer is configured
    pub result: Option<RenderResult>,
}

/// Image reference of the form `template;p1,p2,...` (or a plain source).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub source: String,
    pub template: String,
    pub params: Vec<f64>,
}

impl ImageSource {
    /// Parameters come from the last segment. Empty segments are dropped;
    /// parameters that are not numbers are ignored.
    pub fn parse(source: &str) -> Self {
        let parts: Vec<&str> = source
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let template = parts.first().copied().unwrap_or_default().to_string();
        let params = parts
            .get(1..)
            .and_then(<[&str]>::last)
            .map(|nums| {
                nums.split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .filter_map(|n| n.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            source: source.to_string(),
            template,
            params,
        }
    }
}
