//! PDF Pacer Core Library
//!
//! Paced reading of PDF documents: a shadow sweeps across each page's
//! words at a chosen speed, turning pages and remembering the position.
//! - Word geometry extraction and document-wide word numbering
//! - Table of contents from bookmarks or text heuristics
//! - Paced reveal animator and shadow mask
//! - Reading session controller with progress and session persistence

pub mod animator;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod journal;
pub mod overlay;
pub mod pdf;
pub mod progress;
pub mod session;
pub mod source;
pub mod toc;
pub mod util;

pub use animator::{Animator, FrameOutcome, MaskRect, RevealPolicy, RevealState, SeekAnchor, ShadowMask};
pub use cancellation::CancellationToken;
pub use config::{AnimatorConfig, AppConfig, ReaderConfig, StorageConfig, TocConfig, ZoomLevel};
pub use error::{Error, Result};
pub use events::{EventBus, ReaderEvent};
pub use geometry::{DocumentIndex, PageGeometry, TextRun, WordBox, extract_words, page_for_word};
pub use journal::{CompletedSession, JsonLinesSessionLog, MemorySessionLog, SessionLog};
pub use pdf::{PageRenderer, PdfDocument};
pub use progress::{MemoryProgressStore, ProgressKey, ProgressStore, ReadingProgress, SledProgressStore};
pub use session::{FrameReport, Playback, ReadingSession, RenderTicket, Screen};
pub use source::{OutlineSource, PageSource, RenderRequest, RenderedPage};
pub use toc::{OutlineNode, SectionStats, TableOfContents, TocBuilder, TocEntry, TocStrategy};

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Process-wide entry point: configuration plus the shared stores
pub struct PdfPacer {
    config: AppConfig,
    progress: Option<Arc<dyn ProgressStore>>,
    journal: Arc<dyn SessionLog>,
    events: EventBus,
}

impl PdfPacer {
    /// Open the on-disk stores named by the storage configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        let progress: Option<Arc<dyn ProgressStore>> = if config.storage.progress_enabled {
            let store = SledProgressStore::open(config.storage.progress_path())?;
            Some(Arc::new(store))
        } else {
            debug!("Progress persistence disabled");
            None
        };
        let journal = Arc::new(JsonLinesSessionLog::new(config.storage.session_log_path()));

        Ok(Self {
            config,
            progress,
            journal,
            events: EventBus::new(),
        })
    }

    /// Custom stores, e.g. in-memory ones for tests or stateless hosts
    pub fn with_stores(
        config: AppConfig,
        progress: Option<Arc<dyn ProgressStore>>,
        journal: Arc<dyn SessionLog>,
    ) -> Self {
        Self {
            config,
            progress,
            journal,
            events: EventBus::new(),
        }
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn progress_store(&self) -> Option<&Arc<dyn ProgressStore>> {
        self.progress.as_ref()
    }

    pub const fn session_log(&self) -> &Arc<dyn SessionLog> {
        &self.journal
    }

    /// Bus every session created here publishes on
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Open a PDF and prepare a session for `user`; the document id is the file stem
    pub fn open(&self, path: impl AsRef<Path>, user: &str) -> Result<ReadingSession> {
        let path = path.as_ref();
        let document = Arc::new(PdfDocument::from_file(path)?);
        let id = document_id(path);
        info!(
            "Opened {} ({} pages) for {}",
            path.display(),
            document.page_count(),
            user
        );
        Ok(self.session(document, &id, user))
    }

    /// Prepare a session over an already opened document
    pub fn session(&self, document: Arc<PdfDocument>, document_id: &str, user: &str) -> ReadingSession {
        let outline = Arc::clone(&document);
        let mut session = ReadingSession::new(
            self.config.clone(),
            ProgressKey::new(user, document_id),
            document,
        )
        .with_outline(outline.as_ref())
        .with_session_log(Arc::clone(&self.journal))
        .with_events(self.events.clone());

        if let Some(store) = &self.progress {
            session = session.with_progress_store(Arc::clone(store));
        }
        session
    }
}

/// Stable document id for a file: its stem, or the whole name when there is none
pub fn document_id(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_is_file_stem() {
        assert_eq!(document_id(Path::new("/books/war-and-peace.pdf")), "war-and-peace");
        assert_eq!(document_id(Path::new("notes")), "notes");
    }
}
