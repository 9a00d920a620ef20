//! Formula backends for the terminal: TeX to MathML in process, and an
//! optional external TeX to SVG command for the fallback path.

use std::io::Write;
use std::process::{Command, Stdio};

use chunkmark_engine::formula::{
    FormulaError, FormulaImage, ImageFormat, MathRenderer, SvgConverter,
};
use chunkmark_engine::style::{FormulaStyle, Size};
use pulldown_latex::config::DisplayMode;
use pulldown_latex::mathml::push_mathml;
use pulldown_latex::{Parser, RenderConfig, Storage};

/// Renders TeX to a MathML document. The size is an estimate from the
/// source: half an em per character, one line per `\\` row.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathMlRenderer;

impl MathMlRenderer {
    fn estimate(tex: &str, style: &FormulaStyle) -> Size {
        let rows = tex.split(r"\\").collect::<Vec<_>>();
        let widest = rows.iter().map(|r| r.trim().chars().count()).max().unwrap_or(0);
        Size::new(
            widest as f32 * style.font_size * 0.5,
            rows.len() as f32 * style.font_size * 1.2,
        )
    }
}

impl MathRenderer for MathMlRenderer {
    fn render(&self, tex: &str, style: &FormulaStyle) -> Result<FormulaImage, FormulaError> {
        let storage = Storage::new();
        let parser = Parser::new(tex, &storage);
        let mut config: RenderConfig = Default::default();
        config.display_mode = if tex.contains('\n') {
            DisplayMode::Block
        } else {
            DisplayMode::Inline
        };

        let mut mathml = String::new();
        push_mathml(&mut mathml, parser, config)
            .map_err(|e| FormulaError::FastRenderFailed(e.to_string()))?;
        // Some parse errors are rendered into the output instead of returned
        if mathml.contains("parsing error") {
            return Err(FormulaError::FastRenderFailed(
                "unsupported TeX for MathML".into(),
            ));
        }

        Ok(FormulaImage::new(
            Self::estimate(tex, style),
            mathml.into_bytes(),
            ImageFormat::MathMl,
        ))
    }
}

/// Pipes TeX into an external command and reads an SVG document back.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    /// Splits a command line on whitespace; `None` when it is blank.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl SvgConverter for CommandConverter {
    fn convert(&self, tex: &str, _style: &FormulaStyle) -> Result<String, FormulaError> {
        let failed = |e: std::io::Error| FormulaError::ConversionFailed(format!("{}: {e}", self.program));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(failed)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(tex.as_bytes()).map_err(failed)?;
        }
        let output = child.wait_with_output().map_err(failed)?;

        if !output.status.success() {
            return Err(FormulaError::ConversionFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| FormulaError::ConversionFailed(e.to_string()))
    }
}
