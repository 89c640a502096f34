//! Collaborator seams: where pages and outlines come from.

use image::RgbaImage;

use crate::cancellation::CancellationToken;
use crate::error::Result;
use crate::geometry::{PageGeometry, TextRun, WordExtractor};
use crate::toc::OutlineNode;

/// What to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// 0-based page index
    pub page: usize,
    /// Pixels per PDF point
    pub scale: f32,
    /// Also rasterize the page; text runs are always returned
    pub with_bitmap: bool,
}

impl RenderRequest {
    pub const fn new(page: usize, scale: f32) -> Self {
        Self {
            page,
            scale,
            with_bitmap: false,
        }
    }

    #[must_use]
    pub const fn with_bitmap(mut self) -> Self {
        self.with_bitmap = true;
        self
    }
}

/// Result of rendering one page at one scale
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page: usize,
    /// Page width in pixels at `scale`
    pub width: f32,
    /// Page height in pixels at `scale`
    pub height: f32,
    pub scale: f32,
    /// Text runs in native (bottom-left origin) coordinates
    pub runs: Vec<TextRun>,
    pub bitmap: Option<RgbaImage>,
}

impl RenderedPage {
    /// Word geometry for this render
    pub fn geometry(&self, line_tolerance: f32) -> PageGeometry {
        let words = WordExtractor::new(self.scale, self.height)
            .with_line_tolerance(line_tolerance)
            .extract(&self.runs);
        PageGeometry::new(self.page, self.width, self.height, self.scale, words)
    }
}

/// Supplies page renders and page text for one document
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Render a page, checking `cancel` between stages
    fn render(&self, request: &RenderRequest, cancel: &CancellationToken) -> Result<RenderedPage>;

    /// Text runs of a page in native coordinates, without rasterizing
    fn page_runs(&self, page: usize) -> Result<Vec<TextRun>>;

    /// Plain text of a page with paragraphs separated by blank lines
    fn page_text(&self, page: usize) -> Result<String>;
}

/// Supplies a document's bookmark tree
pub trait OutlineSource: Send + Sync {
    /// Possibly empty; entries may lack a page target
    fn outline(&self) -> Result<Vec<OutlineNode>>;
}
