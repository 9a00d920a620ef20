use std::sync::Arc;

use log::{debug, warn};

use super::backend::{MathRenderer, SvgConverter, SvgRasterizer, Unavailable};
use super::{FormulaError, FormulaImage, trim_delimiters};
use crate::cache::{RenderCache, formula_cache};
use crate::style::{FormulaStyle, Size, StyleConfig};

/// Fallback rasters wider or taller than this are rejected.
pub const MAX_RASTER_DIMENSION: f32 = 1000.0;

/// Commands the fast renderer is known not to handle well.
pub const COMPLEX_MARKERS: &[&str] = &[
    "\\begin{",
    "\\end{",
    "\\matrix",
    "\\pmatrix",
    "\\cases",
    "\\align",
    "\\eqnarray",
    "\\stackrel",
    "\\overset",
    "\\underset",
    "\\underbrace",
    "\\overbrace",
    "\\xymatrix",
    "\\tikz",
];

const LONG_FORMULA: usize = 100;
const DENSE_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMethod {
    Fast,
    Fallback,
}

/// Strategy for an already-trimmed formula.
pub fn select_method(tex: &str) -> RenderMethod {
    if COMPLEX_MARKERS.iter().any(|marker| tex.contains(marker)) {
        return RenderMethod::Fallback;
    }

    let len = tex.chars().count();
    if len > LONG_FORMULA {
        let special = tex.chars().filter(|c| "{}\\^_".contains(*c)).count();
        if special as f64 / len as f64 > DENSE_RATIO {
            return RenderMethod::Fallback;
        }
    }
    RenderMethod::Fast
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub artifact: Option<FormulaImage>,
    pub size: Size,
    pub success: bool,
    pub error: Option<FormulaError>,
    /// Strategy that produced the result; `None` for cache hits
    pub method: Option<RenderMethod>,
    pub cached: bool,
}

impl RenderResult {
    fn hit(image: FormulaImage) -> Self {
        Self {
            size: image.size,
            artifact: Some(image),
            success: true,
            error: None,
            method: None,
            cached: true,
        }
    }

    fn rendered(image: FormulaImage, method: RenderMethod) -> Self {
        Self {
            size: image.size,
            artifact: Some(image),
            success: true,
            error: None,
            method: Some(method),
            cached: false,
        }
    }

    fn failed(error: FormulaError, method: RenderMethod) -> Self {
        Self {
            artifact: None,
            size: Size::ZERO,
            success: false,
            error: Some(error),
            method: Some(method),
            cached: false,
        }
    }

    pub fn into_result(self) -> Result<FormulaImage, FormulaError> {
        match (self.artifact, self.error) {
            (Some(image), _) => Ok(image),
            (None, Some(error)) => Err(error),
            (None, None) => Err(FormulaError::RendererUnavailable),
        }
    }
}

/// Renders formulas through the fast or fallback strategy, sharing results
/// through a [`RenderCache`] keyed by the trimmed formula text.
#[derive(Clone)]
pub struct FormulaRenderer {
    fast: Arc<dyn MathRenderer>,
    converter: Arc<dyn SvgConverter>,
    rasterizer: Arc<dyn SvgRasterizer>,
    cache: Arc<RenderCache<FormulaImage>>,
    max_dimension: f32,
}

impl FormulaRenderer {
    /// Uses the process-wide formula cache.
    pub fn new(
        fast: Arc<dyn MathRenderer>,
        converter: Arc<dyn SvgConverter>,
        rasterizer: Arc<dyn SvgRasterizer>,
    ) -> Self {
        Self {
            fast,
            converter,
            rasterizer,
            cache: formula_cache(),
            max_dimension: MAX_RASTER_DIMENSION,
        }
    }

    /// Every strategy fails; formulas stay as source text.
    pub fn unavailable() -> Self {
        Self::new(
            Arc::new(Unavailable),
            Arc::new(Unavailable),
            Arc::new(Unavailable),
        )
    }

    pub fn with_cache(mut self, cache: Arc<RenderCache<FormulaImage>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_max_dimension(mut self, max: f32) -> Self {
        self.max_dimension = max;
        self
    }

    pub fn cache(&self) -> &Arc<RenderCache<FormulaImage>> {
        &self.cache
    }

    /// Smart rendering: the strategy is picked from the formula's content.
    pub fn render(&self, text: &str, style: &StyleConfig) -> RenderResult {
        let tex = trim_delimiters(text);
        self.render_trimmed(tex, style, select_method(tex))
    }

    /// Rendering with a forced starting strategy. `Fast` still falls through
    /// to the fallback on failure.
    pub fn render_with(&self, text: &str, style: &StyleConfig, method: RenderMethod) -> RenderResult {
        self.render_trimmed(trim_delimiters(text), style, method)
    }

    fn render_trimmed(&self, tex: &str, style: &StyleConfig, method: RenderMethod) -> RenderResult {
        if let Some(image) = self.cache.get(tex) {
            debug!("formula cache hit for {tex:?}");
            return RenderResult::hit(image);
        }
        if tex.is_empty() {
            return RenderResult::failed(FormulaError::Empty, method);
        }

        if method == RenderMethod::Fast {
            match self.fast.render(tex, &style.formula) {
                Ok(image) => {
                    debug!("rendered {tex:?} with the fast renderer");
                    self.cache.set(tex, image.clone());
                    return RenderResult::rendered(image, RenderMethod::Fast);
                }
                Err(err) => debug!("fast render of {tex:?} failed ({err}), trying fallback"),
            }
        }

        match self.fallback(tex, &style.formula) {
            Ok(image) => {
                debug!("rendered {tex:?} through the SVG fallback");
                self.cache.set(tex, image.clone());
                RenderResult::rendered(image, RenderMethod::Fallback)
            }
            Err(err) => {
                warn!("formula {tex:?} could not be rendered: {err}");
                RenderResult::failed(err, RenderMethod::Fallback)
            }
        }
    }

    fn fallback(&self, tex: &str, style: &FormulaStyle) -> Result<FormulaImage, FormulaError> {
        let svg = self.converter.convert(tex, style)?;
        let image = self.rasterizer.rasterize(&svg, style)?;
        let Size { width, height } = image.size;
        if width > self.max_dimension || height > self.max_dimension {
            return Err(FormulaError::TooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }
        Ok(image)
    }
}

impl std::fmt::Debug for FormulaRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaRenderer")
            .field("cache", &self.cache)
            .field("max_dimension", &self.max_dimension)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::formula::ImageFormat;

    /// Records every call and fails on formulas containing `fail`.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fallback_size: Option<Size>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, what: &str, tex: &str) {
            self.calls.lock().unwrap().push(format!("{what}:{tex}"));
        }
    }

    impl MathRenderer for Recorder {
        fn render(&self, tex: &str, _: &FormulaStyle) -> Result<FormulaImage, FormulaError> {
            self.record("fast", tex);
            if tex.contains("fail") {
                return Err(FormulaError::FastRenderFailed("unsupported".into()));
            }
            Ok(FormulaImage::new(Size::new(10.0, 10.0), vec![1], ImageFormat::Bitmap))
        }
    }

    impl SvgConverter for Recorder {
        fn convert(&self, tex: &str, _: &FormulaStyle) -> Result<String, FormulaError> {
            self.record("svg", tex);
            if tex.contains("failsvg") {
                return Err(FormulaError::ConversionFailed("bad tex".into()));
            }
            Ok(format!("<svg>{tex}</svg>"))
        }
    }

    impl SvgRasterizer for Recorder {
        fn rasterize(&self, svg: &str, _: &FormulaStyle) -> Result<FormulaImage, FormulaError> {
            self.record("raster", svg);
            let size = self.fallback_size.unwrap_or(Size::new(20.0, 20.0));
            Ok(FormulaImage::new(size, vec![2], ImageFormat::Bitmap))
        }
    }

    fn renderer(recorder: &Arc<Recorder>) -> FormulaRenderer {
        FormulaRenderer::new(recorder.clone(), recorder.clone(), recorder.clone())
            .with_cache(Arc::new(RenderCache::new("test", 8)))
    }

    #[rstest]
    #[case::simple("x^2 + y^2", RenderMethod::Fast)]
    #[case::environment("\\begin{pmatrix} a \\end{pmatrix}", RenderMethod::Fallback)]
    #[case::overbrace("\\overbrace{a+b}", RenderMethod::Fallback)]
    #[case::long_plain(&"a+b".repeat(40), RenderMethod::Fast)]
    #[case::long_dense(&"{x^2}_".repeat(30), RenderMethod::Fallback)]
    #[case::short_dense("{^_}", RenderMethod::Fast)]
    fn selects_strategy_from_content(#[case] tex: &str, #[case] expected: RenderMethod) {
        assert_eq!(select_method(tex), expected);
    }

    #[test]
    fn simple_formula_uses_fast_renderer_and_caches() {
        let recorder = Arc::new(Recorder::default());
        let renderer = renderer(&recorder);
        let style = StyleConfig::default();

        let first = renderer.render("$x^2$", &style);
        assert!(first.success);
        assert_eq!(first.method, Some(RenderMethod::Fast));
        assert_eq!(first.size, Size::new(10.0, 10.0));

        let second = renderer.render("$$ x^2 $$", &style);
        assert!(second.success && second.cached);
        assert_eq!(recorder.calls(), vec!["fast:x^2"]);
    }

    #[test]
    fn fast_failure_falls_through_to_fallback() {
        let recorder = Arc::new(Recorder::default());
        let result = renderer(&recorder).render("$fail$", &StyleConfig::default());

        assert!(result.success);
        assert_eq!(result.method, Some(RenderMethod::Fallback));
        assert_eq!(
            recorder.calls(),
            vec!["fast:fail", "svg:fail", "raster:<svg>fail</svg>"]
        );
    }

    #[test]
    fn complex_formula_skips_fast_renderer() {
        let recorder = Arc::new(Recorder::default());
        let tex = "\\begin{cases} 1 \\end{cases}";
        let result = renderer(&recorder).render(tex, &StyleConfig::default());

        assert!(result.success);
        assert!(recorder.calls().iter().all(|c| !c.starts_with("fast:")));
    }

    #[test]
    fn forced_fallback_never_calls_fast_renderer() {
        let recorder = Arc::new(Recorder::default());
        let result =
            renderer(&recorder).render_with("$x$", &StyleConfig::default(), RenderMethod::Fallback);

        assert!(result.success);
        assert_eq!(recorder.calls(), vec!["svg:x", "raster:<svg>x</svg>"]);
    }

    #[test]
    fn both_strategies_failing_reports_the_error() {
        let recorder = Arc::new(Recorder::default());
        let renderer = renderer(&recorder);
        let result = renderer.render("$failsvg$", &StyleConfig::default());

        assert!(!result.success);
        assert_eq!(result.artifact, None);
        assert_eq!(result.error, Some(FormulaError::ConversionFailed("bad tex".into())));
        assert!(renderer.cache().is_empty());
    }

    #[test]
    fn oversized_fallback_raster_is_a_failure() {
        let recorder = Arc::new(Recorder {
            fallback_size: Some(Size::new(1200.0, 40.0)),
            ..Recorder::default()
        });
        let result = renderer(&recorder).render("$fail$", &StyleConfig::default());

        assert!(!result.success);
        assert!(matches!(result.error, Some(FormulaError::TooLarge { .. })));
    }

    #[test]
    fn empty_formula_fails_without_calling_backends() {
        let recorder = Arc::new(Recorder::default());
        let result = renderer(&recorder).render("$$", &StyleConfig::default());

        assert_eq!(result.clone().into_result(), Err(FormulaError::Empty));
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn unavailable_renderer_fails_every_formula() {
        let renderer =
            FormulaRenderer::unavailable().with_cache(Arc::new(RenderCache::new("test", 2)));
        let result = renderer.render("$x$", &StyleConfig::default());
        assert_eq!(result.error, Some(FormulaError::RendererUnavailable));
    }
}
