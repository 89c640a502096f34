//! Document routes - library listing, table of contents, page geometry and images.

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use pdf_pacer_core::{PageRenderer, SectionStats, TocStrategy};
use serde::Serialize;
use std::sync::Arc;

use super::{TocQuery, ZoomQuery};
use crate::helpers::{ResultExt, RouteResult, core_error, parse_zoom, validate_page};
use crate::library::LibraryEntry;
use crate::state::AppState;

/// List the PDFs in the library.
pub async fn list_documents(State(state): State<Arc<AppState>>) -> RouteResult<Json<Vec<LibraryEntry>>> {
    let entries = state.library.list().await.or_internal_error()?;
    Ok(Json(entries))
}

#[derive(Serialize)]
pub struct TocRow {
    title: String,
    level: usize,
    word_start: usize,
    /// 0-based page holding `word_start`
    page: usize,
    #[serde(flatten)]
    stats: SectionStats,
}

#[derive(Serialize)]
pub struct TocResponse {
    document: String,
    title: Option<String>,
    strategy: TocStrategy,
    page_count: usize,
    total_words: usize,
    page_word_offsets: Vec<usize>,
    entries: Vec<TocRow>,
    /// Entry holding `?word=`, when given
    active: Option<usize>,
    overall_progress: Option<u8>,
}

/// Table of contents with per-section statistics.
///
/// `?word=` (global word index) fills in the reading position fields.
pub async fn get_toc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TocQuery>,
) -> RouteResult<Json<TocResponse>> {
    let doc = state.document(&id).await?;
    let toc = &doc.toc;
    let word = query.word.unwrap_or(0);

    let entries = toc
        .entries
        .iter()
        .zip(toc.section_stats(word))
        .map(|(entry, stats)| TocRow {
            title: entry.title.clone(),
            level: entry.level,
            word_start: entry.word_start,
            page: doc.index.page_for_word(entry.word_start),
            stats,
        })
        .collect();

    Ok(Json(TocResponse {
        document: id,
        title: doc.pdf.metadata().title.clone(),
        strategy: toc.strategy,
        page_count: doc.pdf.page_count(),
        total_words: toc.total_words,
        page_word_offsets: doc.index.page_word_offsets.clone(),
        entries,
        active: query.word.map(|word| toc.active_index(word)),
        overall_progress: query.word.map(|word| toc.overall_progress(word)),
    }))
}

/// Word boxes of one page in top-left pixel space at the requested zoom.
pub async fn get_words(
    State(state): State<Arc<AppState>>,
    Path((id, page)): Path<(String, usize)>,
    Query(query): Query<ZoomQuery>,
) -> RouteResult<Response> {
    let zoom = parse_zoom(query.zoom.as_deref(), state.config.reader.default_zoom)?;
    let geometry = state.page_geometry(&id, page, zoom).await?;
    Ok(Json(geometry.as_ref()).into_response())
}

/// Page image as WebP or PNG (based on Accept header).
///
/// Rendered pages never change for a given file, so the ETag is derived
/// from the document content, page, zoom and format.
pub async fn get_page_image(
    State(state): State<Arc<AppState>>,
    Path((id, page)): Path<(String, usize)>,
    Query(query): Query<ZoomQuery>,
    headers: HeaderMap,
) -> RouteResult<Response> {
    let zoom = parse_zoom(query.zoom.as_deref(), state.config.reader.default_zoom)?;
    let doc = state.document(&id).await?;
    validate_page(page, doc.pdf.page_count())?;

    // Check if browser supports WebP
    let use_webp = headers
        .get(header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|s| s.contains("image/webp"));
    let (content_type, format_tag) = if use_webp {
        ("image/webp", "webp")
    } else {
        ("image/png", "png")
    };

    let etag = format!(
        "\"{}-{}-{}-{}\"",
        doc.pdf.content_id(),
        page,
        zoom.label().trim_end_matches('%'),
        format_tag
    );

    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && if_none_match.to_str().ok() == Some(etag.as_str())
    {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())
            .or_internal_error();
    }

    let pdf = Arc::clone(&doc.pdf);
    let scale = state.config.scale_for(zoom);

    // Render in blocking task to avoid blocking async runtime
    let image_data = tokio::task::spawn_blocking(move || {
        let renderer = PageRenderer::with_scale(&pdf, scale);
        if use_webp {
            renderer.render_page_webp(page)
        } else {
            renderer.render_page_png(page)
        }
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Render task panicked: {e}"),
        )
    })?
    .map_err(|e| core_error(&e))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, "private, max-age=3600, immutable")
        .header(header::VARY, "Accept")
        .body(Body::from(image_data))
        .or_internal_error()
}
