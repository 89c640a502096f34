//! Progress routes - saved reading position per (user, document).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pdf_pacer_core::{ProgressKey, ReadingProgress};
use std::sync::Arc;
use tracing::debug;

use crate::helpers::{OptionExt, RouteResult, core_error};
use crate::state::AppState;

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((user, document)): Path<(String, String)>,
) -> RouteResult<Json<ReadingProgress>> {
    let key = ProgressKey::new(user, document);
    let progress = state
        .progress
        .load(&key)
        .map_err(|e| core_error(&e))?
        .or_not_found("No saved progress")?;
    Ok(Json(progress))
}

/// Save a position; the speed is clamped to the configured range.
pub async fn put_progress(
    State(state): State<Arc<AppState>>,
    Path((user, document)): Path<(String, String)>,
    Json(mut progress): Json<ReadingProgress>,
) -> RouteResult<Json<ReadingProgress>> {
    let key = ProgressKey::new(user, document);
    progress.wpm = state.config.reader.clamp_wpm(progress.wpm);

    state
        .progress
        .save(&key, &progress)
        .map_err(|e| core_error(&e))?;
    debug!(
        "Saved progress for {}: page {}, word {}",
        key, progress.current_page, progress.word_index
    );
    Ok(Json(progress))
}

pub async fn delete_progress(
    State(state): State<Arc<AppState>>,
    Path((user, document)): Path<(String, String)>,
) -> RouteResult<StatusCode> {
    let key = ProgressKey::new(user, document);
    state.progress.delete(&key).map_err(|e| core_error(&e))?;
    debug!("Cleared progress for {}", key);
    Ok(StatusCode::NO_CONTENT)
}
