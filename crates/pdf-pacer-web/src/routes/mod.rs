//! HTTP route handlers for the PDF pacer web service.
//!
//! All routes return JSON except page images (WebP or PNG).

mod documents;
mod progress;
mod sessions;

pub use documents::{get_page_image, get_toc, get_words, list_documents};
pub use progress::{delete_progress, get_progress, put_progress};
pub use sessions::record_session;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::state::AppState;

/// Query params for geometry and image routes.
#[derive(Deserialize, Default)]
pub struct ZoomQuery {
    /// "75", "100", "125", "150" (a trailing % is accepted)
    #[serde(default)]
    pub zoom: Option<String>,
}

/// Query params for the table of contents.
#[derive(Deserialize, Default)]
pub struct TocQuery {
    /// Global word index of the reader's position
    #[serde(default)]
    pub word: Option<usize>,
}

/// API routes without middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/documents", get(list_documents))
        .route("/api/documents/{id}/toc", get(get_toc))
        .route("/api/documents/{id}/pages/{page}/words", get(get_words))
        .route("/api/documents/{id}/pages/{page}/image", get(get_page_image))
        .route(
            "/api/progress/{user}/{document}",
            get(get_progress).put(put_progress).delete(delete_progress),
        )
        .route("/api/sessions", post(record_session))
        .with_state(state)
}
