//! Session routes - completed readings reported by clients.

use axum::{Json, extract::State, http::StatusCode};
use pdf_pacer_core::{CompletedSession, ProgressKey, journal::SESSION_KIND};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::helpers::{ResultExt, RouteResult, core_error};
use crate::state::AppState;

/// A finished reading as reported by the client
#[derive(Debug, Deserialize)]
pub struct SessionReport {
    pub user: String,
    pub document: String,
    /// Time spent playing, pauses excluded
    pub duration_secs: u64,
    pub word_count: usize,
    pub wpm: u32,
    pub pages: usize,
}

impl SessionReport {
    fn validate(&self) -> Result<(), &'static str> {
        if self.user.is_empty() || self.document.is_empty() {
            return Err("user and document are required");
        }
        Ok(())
    }
}

/// Record a completed reading and forget the saved position.
pub async fn record_session(
    State(state): State<Arc<AppState>>,
    Json(report): Json<SessionReport>,
) -> RouteResult<(StatusCode, Json<CompletedSession>)> {
    report.validate().or_bad_request()?;

    let session = CompletedSession {
        kind: SESSION_KIND.to_string(),
        user: report.user,
        document: report.document,
        duration_secs: report.duration_secs,
        word_count: report.word_count,
        wpm: state.config.reader.clamp_wpm(report.wpm),
        pages: report.pages,
        finished_at: CompletedSession::now_timestamp(),
    };

    // Appending to the log is file I/O
    let journal = Arc::clone(&state.journal);
    let recorded = session.clone();
    tokio::task::spawn_blocking(move || journal.record(&recorded))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Session log task panicked: {e}"),
            )
        })?
        .map_err(|e| core_error(&e))?;

    let key = ProgressKey::new(session.user.as_str(), session.document.as_str());
    if let Err(e) = state.progress.delete(&key) {
        warn!("Failed to clear progress for {}: {}", key, e);
    }

    info!(
        "{} finished {} ({} words in {} s)",
        session.user, session.document, session.word_count, session.duration_secs
    );
    Ok((StatusCode::CREATED, Json(session)))
}
