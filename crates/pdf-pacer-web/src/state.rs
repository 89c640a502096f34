use moka::future::Cache;
use pdf_pacer_core::{
    AppConfig, CancellationToken, DocumentIndex, Error, OutlineSource, PageGeometry, PageSource,
    PdfDocument, ProgressStore, RenderRequest, SessionLog, TableOfContents, TocBuilder, ZoomLevel,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::helpers::{OptionExt, ResultExt, RouteResult, core_error, validate_page};
use crate::library::Library;

/// Documents kept open at once
const DOCUMENT_CACHE_CAPACITY: u64 = 32;
/// Page geometries kept across all documents and zoom levels
const GEOMETRY_CACHE_CAPACITY: u64 = 2048;
/// Idle time before an open document is dropped
const DOCUMENT_IDLE: Duration = Duration::from_secs(30 * 60);

/// A document with everything computed once on open
pub struct OpenDocument {
    pub pdf: Arc<PdfDocument>,
    pub index: DocumentIndex,
    pub toc: TableOfContents,
}

impl OpenDocument {
    /// Parse, index and build the table of contents (blocking)
    pub fn load(path: &Path, config: &AppConfig) -> pdf_pacer_core::Result<Self> {
        let pdf = PdfDocument::from_file(path)?;
        let index = DocumentIndex::build(&pdf);
        let outline = pdf.outline().unwrap_or_else(|e| {
            warn!("Failed to read outline of {}: {}", path.display(), e);
            Vec::new()
        });
        let toc = TocBuilder::new(&config.toc).build(&outline, &index);

        info!(
            "Opened {} ({} pages, {} words, {} ToC entries)",
            path.display(),
            pdf.page_count(),
            index.total_words,
            toc.len()
        );
        Ok(Self {
            pdf: Arc::new(pdf),
            index,
            toc,
        })
    }
}

/// Cache key for one page's geometry
type GeometryKey = (String, usize, ZoomLevel);

/// Global application state
pub struct AppState {
    pub config: AppConfig,
    pub library: Library,
    pub progress: Arc<dyn ProgressStore>,
    pub journal: Arc<dyn SessionLog>,
    documents: Cache<String, Arc<OpenDocument>>,
    geometry: Cache<GeometryKey, Arc<PageGeometry>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        library: Library,
        progress: Arc<dyn ProgressStore>,
        journal: Arc<dyn SessionLog>,
    ) -> Self {
        Self {
            config,
            library,
            progress,
            journal,
            documents: Cache::builder()
                .max_capacity(DOCUMENT_CACHE_CAPACITY)
                .time_to_idle(DOCUMENT_IDLE)
                .build(),
            geometry: Cache::new(GEOMETRY_CACHE_CAPACITY),
        }
    }

    /// Open (or reuse) the document with this id.
    ///
    /// Loading runs on the blocking pool; concurrent requests for the same
    /// id share one load.
    pub async fn document(&self, id: &str) -> RouteResult<Arc<OpenDocument>> {
        let entry = self
            .library
            .find(id)
            .await
            .or_internal_error()?
            .or_not_found("Document not found")?;

        let config = self.config.clone();
        self.documents
            .try_get_with(id.to_string(), async move {
                tokio::task::spawn_blocking(move || OpenDocument::load(&entry.path, &config))
                    .await
                    .map_err(|e| Error::PdfOpen(format!("Load task panicked: {e}")))?
                    .map(Arc::new)
            })
            .await
            .map_err(|e| core_error(&e))
    }

    /// Word geometry of one page at one zoom level, cached per (document, page, zoom)
    pub async fn page_geometry(
        &self,
        id: &str,
        page: usize,
        zoom: ZoomLevel,
    ) -> RouteResult<Arc<PageGeometry>> {
        let doc = self.document(id).await?;
        validate_page(page, doc.pdf.page_count())?;

        let request = RenderRequest::new(page, self.config.scale_for(zoom));
        let tolerance = self.config.animator.line_tolerance;
        let pdf = Arc::clone(&doc.pdf);

        self.geometry
            .try_get_with((id.to_string(), page, zoom), async move {
                debug!("Extracting geometry for page {} at {}", page, zoom);
                tokio::task::spawn_blocking(move || {
                    pdf.render(&request, &CancellationToken::new())
                        .map(|rendered| Arc::new(rendered.geometry(tolerance)))
                })
                .await
                .map_err(|e| Error::PdfRender {
                    page,
                    reason: format!("Render task panicked: {e}"),
                })?
            })
            .await
            .map_err(|e| core_error(&e))
    }
}
