use std::sync::OnceLock;

use regex::Regex;

use super::{FormulaError, FormulaImage, ImageFormat};
use crate::style::{FormulaStyle, Size};

/// Fast path: TeX straight to an image.
pub trait MathRenderer: Send + Sync {
    fn render(&self, tex: &str, style: &FormulaStyle) -> Result<FormulaImage, FormulaError>;
}

/// First half of the fallback path: TeX to an SVG document.
pub trait SvgConverter: Send + Sync {
    fn convert(&self, tex: &str, style: &FormulaStyle) -> Result<String, FormulaError>;
}

/// Second half of the fallback path: SVG to an image.
pub trait SvgRasterizer: Send + Sync {
    fn rasterize(&self, svg: &str, style: &FormulaStyle) -> Result<FormulaImage, FormulaError>;
}

/// Backend for hosts without a renderer; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl MathRenderer for Unavailable {
    fn render(&self, _: &str, _: &FormulaStyle) -> Result<FormulaImage, FormulaError> {
        Err(FormulaError::RendererUnavailable)
    }
}

impl SvgConverter for Unavailable {
    fn convert(&self, _: &str, _: &FormulaStyle) -> Result<String, FormulaError> {
        Err(FormulaError::RendererUnavailable)
    }
}

impl SvgRasterizer for Unavailable {
    fn rasterize(&self, _: &str, _: &FormulaStyle) -> Result<FormulaImage, FormulaError> {
        Err(FormulaError::RendererUnavailable)
    }
}

/// Keeps the SVG as the artifact and sizes it from the root element's
/// `width`/`height` attributes (or its `viewBox`).
///
/// Units: `ex` is half the formula font size, `em` the full font size,
/// `pt`/`px`/none are taken as points.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgSizeProbe;

impl SvgSizeProbe {
    fn root_tag(svg: &str) -> Option<&str> {
        let start = svg.find("<svg")?;
        let end = svg[start..].find('>')? + start;
        Some(&svg[start..end])
    }

    fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
        static ATTR: OnceLock<Regex> = OnceLock::new();
        let attr = ATTR.get_or_init(|| {
            Regex::new(r#"\s([\w:-]+)\s*=\s*["']([^"']*)["']"#).expect("Invalid attribute regex")
        });
        attr.captures_iter(tag)
            .find(|c| &c[1] == name)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str())
    }

    fn length(value: &str, font_size: f32) -> Option<f32> {
        let value = value.trim();
        let split = value
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
            .unwrap_or(value.len());
        let (number, unit) = value.split_at(split);
        let number: f32 = number.parse().ok()?;
        let scale = match unit.trim() {
            "" | "px" | "pt" => 1.0,
            "ex" => font_size / 2.0,
            "em" => font_size,
            _ => return None,
        };
        Some(number * scale)
    }

    fn view_box(tag: &str) -> Option<Size> {
        let parts: Vec<f32> = Self::attribute(tag, "viewBox")?
            .split([' ', ','])
            .filter(|p| !p.is_empty())
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [_, _, w, h] => Some(Size::new(*w, *h)),
            _ => None,
        }
    }
}

impl SvgRasterizer for SvgSizeProbe {
    fn rasterize(&self, svg: &str, style: &FormulaStyle) -> Result<FormulaImage, FormulaError> {
        let tag = Self::root_tag(svg)
            .ok_or_else(|| FormulaError::RasterizationFailed("no <svg> root element".into()))?;

        let width = Self::attribute(tag, "width").and_then(|v| Self::length(v, style.font_size));
        let height = Self::attribute(tag, "height").and_then(|v| Self::length(v, style.font_size));
        let size = match (width, height) {
            (Some(w), Some(h)) => Size::new(w, h),
            _ => Self::view_box(tag).ok_or_else(|| {
                FormulaError::RasterizationFailed("svg has no usable width/height".into())
            })?,
        };

        Ok(FormulaImage::new(
            size,
            svg.as_bytes().to_vec(),
            ImageFormat::Svg,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> FormulaStyle {
        FormulaStyle {
            font_size: 20.0,
            ..FormulaStyle::default()
        }
    }

    #[test]
    fn unavailable_backend_always_fails() {
        assert_eq!(
            Unavailable.render("x", &style()),
            Err(FormulaError::RendererUnavailable)
        );
        assert_eq!(
            Unavailable.convert("x", &style()),
            Err(FormulaError::RendererUnavailable)
        );
    }

    #[test]
    fn probe_reads_ex_units() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="4.5ex" height="2ex"><g/></svg>"#;
        let image = SvgSizeProbe.rasterize(svg, &style()).unwrap();
        assert_eq!(image.size, Size::new(45.0, 20.0));
        assert_eq!(image.format, ImageFormat::Svg);
        assert_eq!(&*image.data, svg.as_bytes());
    }

    #[test]
    fn probe_falls_back_to_view_box() {
        let svg = r#"<?xml version="1.0"?><svg viewBox="0 -750 1200 900"></svg>"#;
        let image = SvgSizeProbe.rasterize(svg, &style()).unwrap();
        assert_eq!(image.size, Size::new(1200.0, 900.0));
    }

    #[test]
    fn probe_rejects_non_svg() {
        assert!(matches!(
            SvgSizeProbe.rasterize("<html></html>", &style()),
            Err(FormulaError::RasterizationFailed(_))
        ));
    }
}
