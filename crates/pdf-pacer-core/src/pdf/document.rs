use std::path::Path;
use std::sync::Arc;

use mupdf::{Document as MuDocument, MetadataName, Page};
use tracing::debug;

use super::outline;
use super::render::PageRenderer;
use super::text::TextExtractor;
use crate::cancellation::CancellationToken;
use crate::error::{Error, Result};
use crate::geometry::TextRun;
use crate::source::{OutlineSource, PageSource, RenderRequest, RenderedPage};
use crate::toc::OutlineNode;

/// Thread-safe handle on a PDF's bytes
///
/// mupdf documents are not `Send`, so every operation opens a short-lived
/// handle from the shared bytes.
pub struct PdfDocument {
    bytes: Arc<Vec<u8>>,
    metadata: DocumentMetadata,
    page_count: usize,
    /// MD5 of the bytes, computed once on load
    content_id: String,
}

/// Document metadata
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

impl PdfDocument {
    /// Open a PDF from bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let doc = MuDocument::from_bytes(&bytes, "")
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        let page_count = doc
            .page_count()
            .map_err(|e| Error::PdfOpen(format!("Failed to get page count: {e}")))?;

        // mupdf returns an empty string for missing entries
        let get_meta = |name| -> Option<String> { doc.metadata(name).ok().filter(|s| !s.is_empty()) };

        let metadata = DocumentMetadata {
            title: get_meta(MetadataName::Title),
            author: get_meta(MetadataName::Author),
            subject: get_meta(MetadataName::Subject),
            creator: get_meta(MetadataName::Creator),
            producer: get_meta(MetadataName::Producer),
        };

        let content_id = format!("{:x}", md5::compute(&bytes));
        debug!("Opened PDF {} with {} pages", content_id, page_count);

        Ok(Self {
            bytes: Arc::new(bytes),
            metadata,
            page_count: usize::try_from(page_count).unwrap_or(0),
            content_id,
        })
    }

    /// Open a PDF from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::PdfOpen(format!("Failed to read file {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    pub const fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// Identifier derived from the document content
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub(crate) fn open_document(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.bytes, "")
            .map_err(|e| Error::PdfOpen(format!("Failed to open document: {e}")))
    }

    /// Load one page of an open handle, validating the index
    pub(crate) fn load_page(&self, doc: &MuDocument, page_num: usize) -> Result<Page> {
        let index = i32::try_from(page_num)
            .ok()
            .filter(|_| page_num < self.page_count)
            .ok_or(Error::PdfInvalidPage {
                page: page_num,
                total: self.page_count,
            })?;

        doc.load_page(index).map_err(|e| Error::PdfRender {
            page: page_num,
            reason: format!("Failed to load page: {e}"),
        })
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn render(&self, request: &RenderRequest, cancel: &CancellationToken) -> Result<RenderedPage> {
        cancel.check_cancelled(request.page, "open")?;
        let doc = self.open_document()?;
        let page = self.load_page(&doc, request.page)?;

        let (page_width, page_height) = super::page_dimensions(&page, request.page)?;
        let runs = TextExtractor::runs_from_page(&page, request.page)?;
        cancel.check_cancelled(request.page, "text")?;

        let bitmap = if request.with_bitmap {
            let renderer = PageRenderer::with_scale(self, request.scale);
            Some(renderer.rasterize(&page, request.page, cancel)?)
        } else {
            None
        };

        debug!(
            "Rendered page {} at {:.2}x: {} runs",
            request.page + 1,
            request.scale,
            runs.len()
        );

        Ok(RenderedPage {
            page: request.page,
            width: page_width * request.scale,
            height: page_height * request.scale,
            scale: request.scale,
            runs,
            bitmap,
        })
    }

    fn page_runs(&self, page: usize) -> Result<Vec<TextRun>> {
        TextExtractor::new(self).page_runs(page)
    }

    fn page_text(&self, page: usize) -> Result<String> {
        TextExtractor::new(self).page_text(page)
    }
}

impl OutlineSource for PdfDocument {
    fn outline(&self) -> Result<Vec<OutlineNode>> {
        let doc = self.open_document()?;
        outline::read_outline(&doc, self.page_count)
    }
}

impl Clone for PdfDocument {
    /// Shares the bytes; only the metadata is copied
    fn clone(&self) -> Self {
        Self {
            bytes: Arc::clone(&self.bytes),
            metadata: self.metadata.clone(),
            page_count: self.page_count,
            content_id: self.content_id.clone(),
        }
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("metadata", &self.metadata)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}
