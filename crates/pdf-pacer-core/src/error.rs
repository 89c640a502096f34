use thiserror::Error;

/// Unified error type for pdf-pacer-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - PDF operations (opening, reading text runs, rendering, outlines)
/// - Render cancellation (a newer render superseded this one)
/// - Progress store operations (initialization, reading, writing)
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to extract text runs from a PDF page
    #[error("failed to extract text from page {page}: {reason}")]
    PdfTextExtraction { page: usize, reason: String },

    /// Failed to render a PDF page
    #[error("failed to render page {page}: {reason}")]
    PdfRender { page: usize, reason: String },

    /// Failed to read the document outline
    #[error("failed to read outline: {0}")]
    PdfOutline(String),

    /// The render was cancelled before it finished
    #[error("render of page {page} was cancelled at {stage}")]
    RenderCancelled { page: usize, stage: &'static str },

    // ==========================================================================
    // Progress Store Errors
    // ==========================================================================
    /// Failed to initialize the progress store
    #[error("failed to initialize progress store: {0}")]
    StoreInit(String),

    /// Failed to read from the progress store
    #[error("failed to read progress: {0}")]
    StoreRead(String),

    /// Failed to write to the progress store
    #[error("failed to write progress: {0}")]
    StoreWrite(String),

    // ==========================================================================
    // Session Log Errors
    // ==========================================================================
    /// Failed to append a completed session
    #[error("failed to write session log: {0}")]
    SessionLog(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
