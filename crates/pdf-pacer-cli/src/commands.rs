//! Subcommand implementations.

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_pacer_core::{
    Animator, AppConfig, CancellationToken, DocumentIndex, FrameOutcome, OutlineSource, PageSource,
    PdfDocument, PdfPacer, Playback, ProgressKey, ProgressStore, ReaderEvent, ReadingSession,
    RenderRequest, SeekAnchor, SledProgressStore, TocBuilder, document_id, overlay, pdf,
};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::Receiver;
use tracing::{info, warn};

use crate::{ReadArgs, SnapshotArgs, TocArgs, WordsArgs};

fn open_pdf(path: &Path) -> Result<PdfDocument> {
    info!("Loading PDF: {}", path.display());
    PdfDocument::from_file(path).context(format!("Failed to load PDF: {}", path.display()))
}

/// 1-based page flag to a 0-based index
fn page_index(page: usize, total: usize) -> Result<usize> {
    if page == 0 || page > total {
        bail!("Page {page} is out of range (document has {total} pages)");
    }
    Ok(page - 1)
}

// =============================================================================
// words
// =============================================================================

pub fn words(config: &AppConfig, args: &WordsArgs) -> Result<()> {
    let doc = open_pdf(&args.pdf)?;
    let page = page_index(args.page, doc.page_count())?;
    let zoom = args.zoom.unwrap_or(config.reader.default_zoom);

    let rendered = doc
        .render(
            &RenderRequest::new(page, config.scale_for(zoom)),
            &CancellationToken::new(),
        )
        .context(format!("Failed to read page {}", args.page))?;
    let geometry = rendered.geometry(config.animator.line_tolerance);

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&geometry)?);
            return Ok(());
        }
        if args.text {
            println!("{}", geometry.text(config.animator.line_tolerance));
            return Ok(());
        }

        println!(
            "Page {} at {}: {:.0}x{:.0}px, {} words",
            args.page,
            zoom,
            geometry.width,
            geometry.height,
            geometry.len()
        );
        println!("{:>5}  {:>8}  {:>8}  {:>7}  {:>7}  text", "#", "x", "y", "w", "h");
        for (i, word) in geometry.words.iter().enumerate() {
            println!(
                "{:>5}  {:>8.1}  {:>8.1}  {:>7.1}  {:>7.1}  {}",
                i, word.x, word.y, word.width, word.height, word.text
            );
        }
    }
    Ok(())
}

// =============================================================================
// toc
// =============================================================================

#[derive(Serialize)]
struct TocRow<'a> {
    title: &'a str,
    level: usize,
    word_start: usize,
    page: usize,
    word_count: usize,
    reading_minutes: usize,
}

pub fn toc(config: &AppConfig, args: &TocArgs) -> Result<()> {
    let doc = open_pdf(&args.pdf)?;
    let index = DocumentIndex::build(&doc);
    let outline = doc.outline().unwrap_or_else(|e| {
        warn!("Failed to read outline: {}", e);
        Vec::new()
    });
    let toc = TocBuilder::new(&config.toc).build(&outline, &index);
    let stats = toc.section_stats(0);

    let rows: Vec<TocRow<'_>> = toc
        .entries
        .iter()
        .zip(&stats)
        .map(|(entry, stats)| TocRow {
            title: &entry.title,
            level: entry.level,
            word_start: entry.word_start,
            page: index.page_for_word(entry.word_start) + 1,
            word_count: stats.word_count,
            reading_minutes: stats.reading_minutes,
        })
        .collect();

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        if let Some(title) = &doc.metadata().title {
            println!("{title}");
        }
        println!(
            "{} entries ({:?}), {} words",
            rows.len(),
            toc.strategy,
            index.total_words
        );
        for row in &rows {
            println!(
                "{}{}  (p. {}, {} words, ~{} min)",
                "  ".repeat(row.level),
                row.title,
                row.page,
                row.word_count,
                row.reading_minutes
            );
        }
    }
    Ok(())
}

// =============================================================================
// read
// =============================================================================

fn progress_bar(total_words: usize) -> ProgressBar {
    let pb = ProgressBar::new(total_words as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} words {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

/// Mirror engine events onto the progress bar
fn report_events(events: &mut Receiver<ReaderEvent>, pb: &ProgressBar) {
    while let Ok(event) = events.try_recv() {
        match event {
            ReaderEvent::PageTurned { to, .. } => pb.set_message(format!("page {}", to + 1)),
            ReaderEvent::RenderFailed { page, reason } => {
                pb.println(format!("Page {} could not be rendered: {}", page + 1, reason));
            }
            ReaderEvent::ProgressSaveFailed { reason } => {
                pb.println(format!("Progress not saved: {reason}"));
            }
            ReaderEvent::SpeedChanged { wpm } => pb.println(format!("Speed {wpm} wpm")),
            _ => {}
        }
    }
}

pub async fn read(config: AppConfig, user: &str, args: &ReadArgs) -> Result<()> {
    if args.fps == 0 {
        bail!("--fps must be at least 1");
    }

    let pacer = PdfPacer::new(config).context("Failed to open progress store")?;
    let mut events = pacer.events().subscribe();
    let mut session = pacer
        .open(&args.pdf, user)
        .context(format!("Failed to load PDF: {}", args.pdf.display()))?;

    if args.restart {
        session.reset_progress().context("Failed to clear saved progress")?;
    }

    session.open_settings();
    if let Some(wpm) = args.wpm {
        session.set_wpm(wpm);
    }
    if let Some(zoom) = args.zoom {
        session.set_zoom(zoom);
    }

    let mut clock = Instant::now();
    session.start_reading(clock);
    info!(
        "Reading {} at {} wpm from page {}",
        session.key(),
        session.state().wpm,
        session.state().page + 1
    );

    let pb = progress_bar(session.index().total_words);
    pb.set_position(session.global_word_index() as u64);
    pb.set_message(format!("page {}", session.state().page + 1));
    session.play();

    let frame = Duration::from_secs(1) / args.fps;
    let limit = args.max_seconds.map(Duration::from_secs);
    let mut interval = tokio::time::interval(frame);
    let mut elapsed = Duration::ZERO;

    loop {
        if session.state().completed.is_some() {
            break;
        }
        if limit.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        if session.state().playback == Playback::Paused {
            pb.println("Playback stopped");
            break;
        }

        if args.realtime {
            interval.tick().await;
            clock = Instant::now();
        } else {
            clock += frame;
        }
        elapsed += frame;

        session.tick(clock);
        pb.set_position(session.global_word_index() as u64);
        report_events(&mut events, &pb);
    }
    report_events(&mut events, &pb);

    match session.state().completed.clone() {
        Some(completed) => {
            pb.set_position(completed.word_count as u64);
            pb.finish_with_message("done");

            // CLI output is intentional
            #[allow(clippy::print_stdout)]
            {
                println!(
                    "Finished {} words across {} pages in {}s at {} wpm",
                    completed.word_count, completed.pages, completed.duration_secs, completed.wpm
                );
            }
        }
        None => {
            session.leave(clock);
            pb.abandon_with_message(format!(
                "stopped on page {}, word {}",
                session.state().page + 1,
                session.word_index()
            ));
            summarize_position(&session);
        }
    }
    Ok(())
}

fn summarize_position(session: &ReadingSession) {
    let word = session.global_word_index();
    let toc = session.toc();

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if let Some(entry) = toc.entry(toc.active_index(word)) {
            println!("In section: {}", entry.title);
        }
        println!("Overall progress: {}%", toc.overall_progress(word));
    }
}

// =============================================================================
// snapshot
// =============================================================================

pub fn snapshot(config: &AppConfig, args: &SnapshotArgs) -> Result<()> {
    let doc = open_pdf(&args.pdf)?;
    let page = page_index(args.page, doc.page_count())?;
    let zoom = args.zoom.unwrap_or(config.reader.default_zoom);
    let wpm = config.reader.clamp_wpm(args.wpm.unwrap_or(config.reader.default_wpm));

    let rendered = doc
        .render(
            &RenderRequest::new(page, config.scale_for(zoom)).with_bitmap(),
            &CancellationToken::new(),
        )
        .context(format!("Failed to render page {}", args.page))?;
    let mut bitmap = rendered
        .bitmap
        .clone()
        .context("Renderer returned no bitmap")?;

    let mut animator = Animator::new(config.animator.clone(), config.reader.reveal_policy);
    animator.load_page(
        rendered.geometry(config.animator.line_tolerance),
        0,
        SeekAnchor::Start,
    );
    animator.set_playing(true);

    // Step in frame-sized slices so the frame cap never swallows time
    let step = config.animator.max_frame_dt();
    let mut remaining = Duration::from_secs_f32(args.seconds.max(0.0));
    while !remaining.is_zero() {
        let dt = remaining.min(step);
        remaining -= dt;
        if animator.tick(dt, wpm) == FrameOutcome::PageComplete {
            break;
        }
    }

    overlay::paint_shadow(&mut bitmap, &animator.shadow(), overlay::SHADOW_COLOR);
    let png = pdf::encode_png(&bitmap, page)?;
    std::fs::write(&args.out, png).context(format!("Failed to write output: {}", args.out.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!(
            "Snapshot saved to: {} (word {} of {})",
            args.out.display(),
            animator.current_word_index() + 1,
            animator.geometry().len()
        );
    }
    Ok(())
}

// =============================================================================
// progress
// =============================================================================

fn open_store(config: &AppConfig) -> Result<SledProgressStore> {
    let path = config.storage.progress_path();
    SledProgressStore::open(&path).context(format!("Failed to open progress store at {}", path.display()))
}

pub fn progress_show(config: &AppConfig, user: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    let records: Vec<_> = store
        .list()?
        .into_iter()
        .filter(|(key, _)| user.is_none_or(|user| key.user == user))
        .collect();

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if records.is_empty() {
            println!("No saved progress");
        }
        for (key, progress) in records {
            println!(
                "{}: page {}, word {}, {} wpm, zoom {}",
                key,
                progress.current_page + 1,
                progress.word_index,
                progress.wpm,
                progress.zoom
            );
        }
    }
    Ok(())
}

pub fn progress_reset(config: &AppConfig, user: &str, document: &Path) -> Result<()> {
    let store = open_store(config)?;
    let key = ProgressKey::new(user, document_id(document));
    let existed = clear_progress(&store, &key)?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if existed {
            println!("Cleared progress for {key}");
        } else {
            println!("No saved progress for {key}");
        }
    }
    Ok(())
}

/// Delete one record, reporting whether there was anything to delete
fn clear_progress(store: &dyn ProgressStore, key: &ProgressKey) -> Result<bool> {
    let existed = store.load(key)?.is_some();
    store.delete(key)?;
    Ok(existed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pdf_pacer_core::{MemoryProgressStore, ReadingProgress, ZoomLevel};

    #[test]
    fn test_page_flag_bounds() {
        assert_eq!(page_index(1, 3).unwrap(), 0);
        assert_eq!(page_index(3, 3).unwrap(), 2);
        assert!(page_index(0, 3).is_err());
        assert!(page_index(4, 3).is_err());
    }

    #[test]
    fn test_clear_progress_by_file_stem() {
        let store = MemoryProgressStore::new();
        let key = ProgressKey::new("olena", document_id(Path::new("books/war-and-peace.pdf")));
        assert_eq!(key.document, "war-and-peace");

        let saved = ReadingProgress {
            current_page: 3,
            word_index: 10,
            wpm: 200,
            zoom: ZoomLevel::Percent100,
        };
        store.save(&key, &saved).unwrap();

        assert!(clear_progress(&store, &key).unwrap());
        assert_eq!(store.load(&key).unwrap(), None);
        assert!(!clear_progress(&store, &key).unwrap());
    }
}
