use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{FrameReport, Playback, Screen, SessionState, adjust_wpm};
use crate::animator::{Animator, FrameOutcome, SeekAnchor};
use crate::cancellation::CancellationToken;
use crate::config::{AppConfig, ZoomLevel};
use crate::error::Result;
use crate::events::{EventBus, ReaderEvent};
use crate::geometry::DocumentIndex;
use crate::journal::{CompletedSession, SESSION_KIND, SessionLog};
use crate::progress::{ProgressKey, ProgressStore, ReadingProgress};
use crate::source::{OutlineSource, PageSource, RenderRequest, RenderedPage};
use crate::toc::{TableOfContents, TocBuilder};

/// A render the controller is waiting on
#[derive(Debug, Clone)]
pub struct RenderTicket {
    pub generation: u64,
    pub request: RenderRequest,
    pub cancel: CancellationToken,
}

/// Drives paced reading of one document for one reader
///
/// All time-dependent calls take `now` so the frame loop can be driven by a
/// display clock or a simulated one.
pub struct ReadingSession {
    config: AppConfig,
    key: ProgressKey,
    pages: Arc<dyn PageSource>,
    progress: Option<Arc<dyn ProgressStore>>,
    journal: Option<Arc<dyn SessionLog>>,
    events: EventBus,
    index: DocumentIndex,
    toc: TableOfContents,
    animator: Animator,
    state: SessionState,
    in_flight: Option<RenderTicket>,
    generation: u64,
    deferred_rendering: bool,
}

impl ReadingSession {
    /// Index the document and derive a page-based or heuristic table of contents
    pub fn new(config: AppConfig, key: ProgressKey, pages: Arc<dyn PageSource>) -> Self {
        let index = DocumentIndex::build(pages.as_ref());
        let toc = TocBuilder::new(&config.toc).build(&[], &index);
        let animator = Animator::new(config.animator.clone(), config.reader.reveal_policy);
        let state = SessionState {
            screen: Screen::Library,
            playback: Playback::Paused,
            page: 0,
            wpm: config.reader.default_wpm,
            zoom: config.reader.default_zoom,
            played: Duration::ZERO,
            last_frame: None,
            last_save: None,
            save_due: false,
            landing: (0, SeekAnchor::Start),
            completed: None,
        };

        Self {
            config,
            key,
            pages,
            progress: None,
            journal: None,
            events: EventBus::new(),
            index,
            toc,
            animator,
            state,
            in_flight: None,
            generation: 0,
            deferred_rendering: false,
        }
    }

    /// Prefer the document's bookmarks for the table of contents
    #[must_use]
    pub fn with_outline(mut self, outline: &dyn OutlineSource) -> Self {
        let nodes = outline.outline().unwrap_or_else(|e| {
            warn!("Failed to read outline, falling back to heuristics: {}", e);
            Vec::new()
        });
        self.toc = TocBuilder::new(&self.config.toc).build(&nodes, &self.index);
        self
    }

    #[must_use]
    pub fn with_progress_store(mut self, store: Arc<dyn ProgressStore>) -> Self {
        self.progress = Some(store);
        self
    }

    #[must_use]
    pub fn with_session_log(mut self, log: Arc<dyn SessionLog>) -> Self {
        self.journal = Some(log);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Leave render requests for the host to fulfil through [`Self::complete_render`]
    #[must_use]
    pub const fn with_deferred_rendering(mut self) -> Self {
        self.deferred_rendering = true;
        self
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    pub const fn animator(&self) -> &Animator {
        &self.animator
    }

    pub const fn toc(&self) -> &TableOfContents {
        &self.toc
    }

    pub const fn index(&self) -> &DocumentIndex {
        &self.index
    }

    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    pub const fn key(&self) -> &ProgressKey {
        &self.key
    }

    pub fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    pub const fn is_playing(&self) -> bool {
        self.state.playback.is_playing()
    }

    /// Word under the cursor on the current page
    pub const fn word_index(&self) -> usize {
        self.animator.current_word_index()
    }

    /// Word under the cursor, counted from the start of the document
    pub fn global_word_index(&self) -> usize {
        self.index.global_index(self.state.page, self.word_index())
    }

    pub const fn pending_render(&self) -> Option<&RenderTicket> {
        self.in_flight.as_ref()
    }

    pub const fn progress(&self) -> ReadingProgress {
        ReadingProgress {
            current_page: self.state.page,
            word_index: self.animator.current_word_index(),
            wpm: self.state.wpm,
            zoom: self.state.zoom,
        }
    }

    fn saved_progress(&self) -> Option<ReadingProgress> {
        let store = self.progress.as_ref()?;
        match store.load(&self.key) {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Failed to load progress for {}: {}", self.key, e);
                None
            }
        }
    }

    // ==========================================================================
    // Screens
    // ==========================================================================

    /// Library → settings; saved speed and zoom become the defaults offered
    pub fn open_settings(&mut self) {
        let (wpm, zoom) = self.saved_progress().map_or(
            (self.config.reader.default_wpm, self.config.reader.default_zoom),
            |saved| (saved.wpm, saved.zoom),
        );
        self.state.wpm = self.config.reader.clamp_wpm(wpm);
        self.state.zoom = zoom;
        self.state.screen = Screen::Settings;
    }

    /// Enter the reading screen at the saved position, or at the first word
    pub fn start_reading(&mut self, now: Instant) {
        if self.state.screen == Screen::Library {
            self.open_settings();
        }

        let (page, word) = match self.saved_progress() {
            Some(saved) => {
                info!(
                    "Resuming {} at page {} word {}",
                    self.key,
                    saved.current_page + 1,
                    saved.word_index
                );
                (saved.current_page, saved.word_index)
            }
            None => (0, 0),
        };
        let page = page.min(self.page_count().saturating_sub(1));
        let anchor = if word > 0 {
            SeekAnchor::End
        } else {
            SeekAnchor::Start
        };

        self.state.screen = Screen::Reading;
        self.state.playback = Playback::Paused;
        self.state.page = page;
        self.state.played = Duration::ZERO;
        self.state.last_frame = Some(now);
        self.state.last_save = Some(now);
        self.state.completed = None;
        self.animator.set_playing(false);
        self.navigate(page, word, anchor);
    }

    /// Back out of reading, keeping the position
    pub fn leave(&mut self, now: Instant) {
        if self.state.screen != Screen::Reading {
            self.state.screen = Screen::Library;
            return;
        }
        self.set_playback(Playback::Paused);
        if self.state.completed.is_none() {
            self.save_progress(now);
        }
        if let Some(ticket) = self.in_flight.take() {
            ticket.cancel.cancel();
        }
        self.state.screen = Screen::Library;
        self.state.last_frame = None;
    }

    // ==========================================================================
    // Rendering
    // ==========================================================================

    /// Start a render of `page`, cancelling whichever render is in flight
    pub fn request_render(&mut self, page: usize) -> RenderTicket {
        if let Some(previous) = self.in_flight.take() {
            debug!("Cancelling render of page {}", previous.request.page);
            previous.cancel.cancel();
        }
        self.generation += 1;
        let ticket = RenderTicket {
            generation: self.generation,
            request: RenderRequest::new(page, self.config.scale_for(self.state.zoom)),
            cancel: CancellationToken::new(),
        };
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// Accept a finished render; stale, cancelled or failed renders leave the page as it was
    pub fn complete_render(&mut self, ticket: &RenderTicket, result: Result<RenderedPage>) -> bool {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|t| t.generation == ticket.generation);
        if !current || ticket.cancel.is_cancelled() {
            debug!("Dropping stale render of page {}", ticket.request.page);
            return false;
        }
        self.in_flight = None;

        let rendered = match result {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("Render of page {} failed: {}", ticket.request.page + 1, e);
                self.events.publish(ReaderEvent::RenderFailed {
                    page: ticket.request.page,
                    reason: e.to_string(),
                });
                if matches!(self.state.playback, Playback::PageTurnPause { .. }) {
                    self.set_playback(Playback::Paused);
                }
                return false;
            }
        };

        let geometry = rendered.geometry(self.config.animator.line_tolerance);
        let words = geometry.len();
        let (word, anchor) = self.state.landing;
        self.state.page = ticket.request.page;
        self.animator.load_page(geometry, word, anchor);
        self.state.landing = (0, SeekAnchor::Start);

        debug!("Page {} ready with {} words", self.state.page + 1, words);
        self.events.publish(ReaderEvent::PageRendered {
            page: self.state.page,
            words,
        });

        if self.state.save_due
            && let Some(now) = self.state.last_frame
        {
            self.save_progress(now);
        }
        true
    }

    /// Fulfil the in-flight render with the page source
    pub fn render_pending(&mut self) -> bool {
        let Some(ticket) = self.in_flight.clone() else {
            return false;
        };
        let result = self.pages.render(&ticket.request, &ticket.cancel);
        self.complete_render(&ticket, result)
    }

    /// Request and fulfil a render of `page` in one step, for synchronous hosts
    pub fn render_now(&mut self, page: usize) -> bool {
        self.request_render(page);
        self.render_pending()
    }

    fn navigate(&mut self, page: usize, word: usize, anchor: SeekAnchor) {
        let geometry = self.animator.geometry();
        let loaded = self.in_flight.is_none()
            && !geometry.is_empty()
            && geometry.page == page
            && (geometry.scale - self.config.scale_for(self.state.zoom)).abs() < f32::EPSILON;
        if loaded && page == self.state.page {
            self.animator.seek(word, anchor);
            return;
        }

        self.state.landing = (word, anchor);
        self.request_render(page);
        if !self.deferred_rendering {
            self.render_pending();
        }
    }

    // ==========================================================================
    // Frame loop
    // ==========================================================================

    /// Advance one display frame
    pub fn tick(&mut self, now: Instant) -> FrameReport {
        let dt = self
            .state
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.state.last_frame = Some(now);

        let mut outcome = FrameOutcome::Idle;
        if self.state.screen == Screen::Reading {
            if let Playback::PageTurnPause { resume_at } = self.state.playback
                && now >= resume_at
                && self.in_flight.is_none()
            {
                debug!("Page-turn pause over, resuming");
                self.set_playback(Playback::Playing);
            }

            if self.state.playback.is_playing() {
                self.state.played += dt;
            }

            outcome = self.animator.tick(dt, self.state.wpm);
            if outcome == FrameOutcome::PageComplete {
                self.page_complete(now);
            }

            let save_after = self.config.reader.save_interval();
            if self.state.playback.is_playing()
                && self
                    .state
                    .last_save
                    .is_none_or(|last| now.saturating_duration_since(last) >= save_after)
            {
                self.save_progress(now);
            }
        }

        FrameReport {
            outcome,
            state: *self.animator.state(),
            mask: self.animator.shadow(),
            page: self.state.page,
            word_index: self.animator.current_word_index(),
            playback: self.state.playback,
        }
    }

    fn page_complete(&mut self, now: Instant) {
        let next = self.state.page + 1;
        if next >= self.page_count() {
            self.finish(now);
            return;
        }

        info!("Turning to page {}", next + 1);
        self.events.publish(ReaderEvent::PageTurned {
            from: self.state.page,
            to: next,
        });
        self.set_playback(Playback::PageTurnPause {
            resume_at: now + self.config.reader.page_turn_pause(),
        });
        self.navigate(next, 0, SeekAnchor::Start);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // whole seconds of playing time
    fn finish(&mut self, now: Instant) {
        self.set_playback(Playback::Paused);
        self.state.last_save = Some(now);

        if let Some(store) = &self.progress
            && let Err(e) = store.delete(&self.key)
        {
            warn!("Failed to clear progress for {}: {}", self.key, e);
        }

        let session = CompletedSession {
            kind: SESSION_KIND.to_string(),
            user: self.key.user.clone(),
            document: self.key.document.clone(),
            duration_secs: self.state.played.as_secs_f64().round() as u64,
            word_count: self.index.total_words,
            wpm: self.state.wpm,
            pages: self.page_count(),
            finished_at: CompletedSession::now_timestamp(),
        };
        info!(
            "Finished {} in {}s at {} wpm",
            self.key, session.duration_secs, session.wpm
        );

        if let Some(journal) = &self.journal
            && let Err(e) = journal.record(&session)
        {
            warn!("Failed to record completed session: {}", e);
        }
        self.events.publish(ReaderEvent::SessionCompleted {
            duration_secs: session.duration_secs,
            word_count: session.word_count,
            wpm: session.wpm,
        });
        self.state.completed = Some(session);
    }

    // ==========================================================================
    // Controls
    // ==========================================================================

    fn set_playback(&mut self, playback: Playback) {
        let was_playing = self.state.playback.is_playing();
        self.state.playback = playback;
        self.animator.set_playing(playback.is_playing());
        if was_playing != playback.is_playing() {
            self.events.publish(ReaderEvent::PlaybackChanged {
                playing: playback.is_playing(),
            });
        }
    }

    pub fn play(&mut self) {
        if self.state.screen != Screen::Reading || self.state.completed.is_some() {
            return;
        }
        self.set_playback(Playback::Playing);

        // A page turn whose render failed left the cursor at the end of the old page
        let next = self.state.page + 1;
        if self.animator.is_exhausted() && self.in_flight.is_none() && next < self.page_count() {
            self.navigate(next, 0, SeekAnchor::Start);
        }
    }

    /// Explicit pause; cancels a pending auto-resume and saves the position
    pub fn pause(&mut self, now: Instant) {
        if self.state.screen != Screen::Reading {
            return;
        }
        self.set_playback(Playback::Paused);
        if self.state.completed.is_none() {
            self.save_progress(now);
        }
    }

    pub fn toggle_play(&mut self, now: Instant) {
        if self.state.playback.is_playing() {
            self.pause(now);
        } else {
            self.play();
        }
    }

    /// Step the speed up or down by `delta` notches
    pub fn adjust_speed(&mut self, delta: i32) -> u32 {
        let wpm = adjust_wpm(self.state.wpm, delta, &self.config.reader);
        self.set_wpm(wpm)
    }

    pub fn set_wpm(&mut self, wpm: u32) -> u32 {
        let wpm = self.config.reader.clamp_wpm(wpm);
        if wpm != self.state.wpm {
            self.state.wpm = wpm;
            self.events.publish(ReaderEvent::SpeedChanged { wpm });
        }
        wpm
    }

    /// Re-render the current page at a new zoom, staying on the same word
    pub fn set_zoom(&mut self, zoom: ZoomLevel) {
        if zoom == self.state.zoom {
            return;
        }
        self.state.zoom = zoom;
        if self.state.screen == Screen::Reading {
            self.cancel_auto_resume();
            let word = self.animator.current_word_index();
            self.state.landing = (word, SeekAnchor::Start);
            self.request_render(self.state.page);
            if !self.deferred_rendering {
                self.render_pending();
            }
        }
    }

    /// Jump to a table-of-contents entry
    pub fn jump_to_entry(&mut self, entry: usize) -> bool {
        let Some(word_start) = self.toc.entry(entry).map(|e| e.word_start) else {
            return false;
        };
        self.jump_to_word(word_start);
        true
    }

    /// Jump to a document-wide word index
    pub fn jump_to_word(&mut self, word: usize) {
        if self.state.screen != Screen::Reading {
            return;
        }
        let (page, local) = self.index.locate(word);
        self.cancel_auto_resume();
        self.navigate(page, local, SeekAnchor::Start);
    }

    /// Go to the start of a page, e.g. from a scrubber
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if self.state.screen != Screen::Reading || page >= self.page_count() {
            return false;
        }
        self.cancel_auto_resume();
        self.navigate(page, 0, SeekAnchor::Start);
        true
    }

    /// Seek to the word nearest a point on the current page
    ///
    /// Playing stays playing; a pending page-turn resume is dropped.
    pub fn click(&mut self, x: f32, y: f32) -> Option<usize> {
        if self.state.screen != Screen::Reading {
            return None;
        }
        self.cancel_auto_resume();
        self.animator.click(x, y)
    }

    /// Forget the saved position for this reader and document
    pub fn reset_progress(&self) -> Result<()> {
        match &self.progress {
            Some(store) => store.delete(&self.key),
            None => Ok(()),
        }
    }

    fn cancel_auto_resume(&mut self) {
        if matches!(self.state.playback, Playback::PageTurnPause { .. }) {
            self.set_playback(Playback::Paused);
        }
    }

    /// Persist the position unless a page change is still in flight
    ///
    /// Failures are reported and retried at the next save point.
    pub fn save_progress(&mut self, now: Instant) {
        self.state.last_save = Some(now);
        let Some(store) = self.progress.clone() else {
            return;
        };
        if !self.config.storage.progress_enabled {
            return;
        }
        if self.in_flight.is_some() {
            debug!("Render in flight, deferring progress save");
            self.state.save_due = true;
            return;
        }

        self.state.save_due = false;
        let progress = self.progress();
        match store.save(&self.key, &progress) {
            Ok(()) => {
                debug!(
                    "Saved progress for {}: page {} word {}",
                    self.key,
                    progress.current_page + 1,
                    progress.word_index
                );
                self.events.publish(ReaderEvent::ProgressSaved {
                    page: progress.current_page,
                    word_index: progress.word_index,
                });
            }
            Err(e) => {
                warn!("Failed to save progress for {}: {}", self.key, e);
                self.events.publish(ReaderEvent::ProgressSaveFailed {
                    reason: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use crate::error::Error;
    use crate::geometry::TextRun;
    use crate::journal::MemorySessionLog;
    use crate::progress::MemoryProgressStore;
    use crate::toc::{OutlineNode, TocStrategy};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::collections::HashSet;
    use std::sync::Mutex;

    const FRAME: Duration = Duration::from_millis(50);
    const PAGE_WIDTH: f32 = 300.0;
    const PAGE_HEIGHT: f32 = 400.0;

    struct StubPages {
        pages: Vec<Vec<TextRun>>,
        failing: Mutex<HashSet<usize>>,
    }

    impl StubPages {
        /// `lines[p]` lines of "one two three" on page `p`
        fn new(lines: &[usize]) -> Arc<Self> {
            let pages = lines
                .iter()
                .map(|&count| {
                    (0..count)
                        .map(|line| {
                            #[allow(clippy::cast_precision_loss)]
                            let y = 350.0 - 30.0 * line as f32;
                            TextRun::new("one two three", 20.0, y, 130.0, 20.0)
                        })
                        .collect()
                })
                .collect();
            Arc::new(Self {
                pages,
                failing: Mutex::new(HashSet::new()),
            })
        }

        fn fail(&self, page: usize, failing: bool) {
            let mut set = self.failing.lock().unwrap();
            if failing {
                set.insert(page);
            } else {
                set.remove(&page);
            }
        }
    }

    impl PageSource for StubPages {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn render(&self, request: &RenderRequest, cancel: &CancellationToken) -> Result<RenderedPage> {
            cancel.check_cancelled(request.page, "layout")?;
            if self.failing.lock().unwrap().contains(&request.page) {
                return Err(Error::PdfRender {
                    page: request.page,
                    reason: "damaged content stream".to_string(),
                });
            }
            Ok(RenderedPage {
                page: request.page,
                width: PAGE_WIDTH * request.scale,
                height: PAGE_HEIGHT * request.scale,
                scale: request.scale,
                runs: self.page_runs(request.page)?,
                bitmap: None,
            })
        }

        fn page_runs(&self, page: usize) -> Result<Vec<TextRun>> {
            self.pages.get(page).cloned().ok_or(Error::PdfInvalidPage {
                page,
                total: self.pages.len(),
            })
        }

        fn page_text(&self, page: usize) -> Result<String> {
            Ok(self
                .page_runs(page)?
                .iter()
                .map(|run| run.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }

    struct StubOutline(Vec<OutlineNode>);

    impl OutlineSource for StubOutline {
        fn outline(&self) -> Result<Vec<OutlineNode>> {
            Ok(self.0.clone())
        }
    }

    /// Store whose writes always fail, counting the attempts
    #[derive(Default)]
    struct FailingStore {
        saves: AtomicUsize,
    }

    impl FailingStore {
        fn attempts(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    impl ProgressStore for FailingStore {
        fn load(&self, _key: &ProgressKey) -> Result<Option<ReadingProgress>> {
            Ok(None)
        }

        fn save(&self, _key: &ProgressKey, _progress: &ReadingProgress) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Err(Error::StoreWrite("disk full".to_string()))
        }

        fn delete(&self, _key: &ProgressKey) -> Result<()> {
            Ok(())
        }

        fn list(&self) -> Result<Vec<(ProgressKey, ReadingProgress)>> {
            Ok(Vec::new())
        }
    }

    fn key() -> ProgressKey {
        ProgressKey::new("reader", "book")
    }

    fn session(pages: &Arc<StubPages>) -> ReadingSession {
        ReadingSession::new(AppConfig::default(), key(), pages.clone())
    }

    fn run_until(
        session: &mut ReadingSession,
        clock: &mut Instant,
        done: impl Fn(&ReadingSession) -> bool,
    ) {
        for _ in 0..100_000 {
            if done(session) {
                return;
            }
            *clock += FRAME;
            session.tick(*clock);
        }
        panic!("condition never reached");
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<ReaderEvent>) -> Vec<ReaderEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn in_page_turn_pause(session: &ReadingSession) -> bool {
        matches!(session.state().playback, Playback::PageTurnPause { .. })
    }

    #[test]
    fn test_screens_flow() {
        let pages = StubPages::new(&[1]);
        let mut reader = session(&pages);
        assert_eq!(reader.state().screen, Screen::Library);

        reader.open_settings();
        assert_eq!(reader.state().screen, Screen::Settings);

        let now = Instant::now();
        reader.start_reading(now);
        assert_eq!(reader.state().screen, Screen::Reading);
        assert_eq!(reader.state().playback, Playback::Paused);
        assert_eq!(reader.animator().geometry().len(), 3);

        reader.leave(now);
        assert_eq!(reader.state().screen, Screen::Library);
    }

    #[test]
    fn test_page_turn_pause_resumes_after_two_seconds() {
        let pages = StubPages::new(&[1, 1]);
        let mut reader = session(&pages);
        let mut rx = reader.events().subscribe();
        let mut clock = Instant::now();

        reader.start_reading(clock);
        reader.play();
        run_until(&mut reader, &mut clock, in_page_turn_pause);

        let turned_at = clock;
        assert_eq!(reader.state().page, 1);
        assert_eq!(reader.word_index(), 0);
        assert!(drain(&mut rx).contains(&ReaderEvent::PageTurned { from: 0, to: 1 }));

        reader.tick(turned_at + Duration::from_millis(1999));
        assert!(!reader.is_playing());
        reader.tick(turned_at + Duration::from_millis(2000));
        assert!(reader.is_playing());
        assert_eq!(reader.state().playback, Playback::Playing);
    }

    #[test]
    fn test_pause_cancels_auto_resume() {
        let pages = StubPages::new(&[1, 1]);
        let mut reader = session(&pages);
        let mut clock = Instant::now();

        reader.start_reading(clock);
        reader.play();
        run_until(&mut reader, &mut clock, in_page_turn_pause);

        reader.pause(clock);
        reader.tick(clock + Duration::from_secs(3));
        assert_eq!(reader.state().playback, Playback::Paused);
    }

    #[test]
    fn test_click_cancels_auto_resume() {
        let pages = StubPages::new(&[1, 1]);
        let mut reader = session(&pages);
        let mut clock = Instant::now();

        reader.start_reading(clock);
        reader.play();
        run_until(&mut reader, &mut clock, in_page_turn_pause);

        let target = reader.animator().geometry().word(1).unwrap().clone();
        let (cx, cy) = target.center();
        reader.click(cx, cy);
        assert_eq!(reader.state().playback, Playback::Paused);

        reader.tick(clock + Duration::from_secs(3));
        assert_eq!(reader.state().playback, Playback::Paused);
        assert_eq!(reader.state().page, 1);
    }

    #[test]
    fn test_zoom_cancels_auto_resume() {
        let pages = StubPages::new(&[1, 1]);
        let mut reader = session(&pages);
        let mut clock = Instant::now();

        reader.start_reading(clock);
        reader.play();
        run_until(&mut reader, &mut clock, in_page_turn_pause);

        reader.set_zoom(ZoomLevel::Percent150);
        reader.tick(clock + Duration::from_secs(3));
        assert_eq!(reader.state().playback, Playback::Paused);
    }

    #[test]
    fn test_toggle_during_page_turn_pause_plays_now() {
        let pages = StubPages::new(&[1, 1]);
        let mut reader = session(&pages);
        let mut clock = Instant::now();

        reader.start_reading(clock);
        reader.play();
        run_until(&mut reader, &mut clock, in_page_turn_pause);

        reader.toggle_play(clock);
        assert_eq!(reader.state().playback, Playback::Playing);
    }

    #[test]
    fn test_stale_render_is_discarded() {
        let pages = StubPages::new(&[1, 2, 3]);
        let mut reader = session(&pages).with_deferred_rendering();

        reader.start_reading(Instant::now());
        assert!(reader.render_pending());
        assert_eq!(reader.state().page, 0);

        assert!(reader.go_to_page(1));
        let superseded = reader.pending_render().cloned().unwrap();
        assert!(reader.go_to_page(2));
        assert!(superseded.cancel.is_cancelled());

        let late = pages.render(&superseded.request, &CancellationToken::new());
        assert!(!reader.complete_render(&superseded, late));
        assert_eq!(reader.state().page, 0);

        assert!(reader.render_pending());
        assert_eq!(reader.state().page, 2);
        assert_eq!(reader.animator().geometry().len(), 9);
    }

    #[test]
    fn test_render_failure_keeps_previous_page() {
        let pages = StubPages::new(&[1, 1]);
        pages.fail(1, true);
        let mut reader = session(&pages);
        let mut rx = reader.events().subscribe();
        let mut clock = Instant::now();

        reader.start_reading(clock);
        reader.play();
        run_until(&mut reader, &mut clock, |r| !r.is_playing());

        assert_eq!(reader.state().playback, Playback::Paused);
        assert_eq!(reader.state().page, 0);
        assert_eq!(reader.animator().geometry().page, 0);
        assert_eq!(reader.animator().geometry().len(), 3);
        assert!(drain(&mut rx).iter().any(|event| matches!(
            event,
            ReaderEvent::RenderFailed { page: 1, .. }
        )));

        // Playing again retries the turn
        pages.fail(1, false);
        reader.play();
        assert_eq!(reader.state().page, 1);
        assert!(reader.is_playing());
    }

    #[test]
    fn test_progress_saved_on_cadence() {
        let pages = StubPages::new(&[20, 20]);
        let store = Arc::new(MemoryProgressStore::new());
        let mut reader = session(&pages).with_progress_store(store.clone());
        let start = Instant::now();

        reader.start_reading(start);
        reader.set_wpm(60);
        reader.play();
        for frame in 1..600 {
            reader.tick(start + FRAME * frame);
        }
        assert_eq!(store.load(&key()).unwrap(), None);

        reader.tick(start + Duration::from_secs(30));
        let saved = store.load(&key()).unwrap().unwrap();
        assert_eq!(saved.current_page, 0);
        assert!(saved.word_index > 0);
        assert_eq!(saved.wpm, 60);

        reader.leave(start + Duration::from_secs(31));
        assert_eq!(reader.state().screen, Screen::Library);
        assert!(!reader.is_playing());
    }

    #[test]
    fn test_failed_save_keeps_playing_and_retries() {
        let pages = StubPages::new(&[20, 20]);
        let store = Arc::new(FailingStore::default());
        let config = AppConfig {
            reader: ReaderConfig {
                save_interval_secs: 10,
                ..ReaderConfig::default()
            },
            ..AppConfig::default()
        };
        let mut reader =
            ReadingSession::new(config, key(), pages.clone()).with_progress_store(store.clone());
        let mut rx = reader.events().subscribe();
        let start = Instant::now();

        reader.start_reading(start);
        reader.set_wpm(60);
        reader.play();
        for frame in 1..200 {
            reader.tick(start + FRAME * frame);
        }
        assert_eq!(store.attempts(), 0);

        reader.tick(start + Duration::from_secs(10));
        assert_eq!(store.attempts(), 1);
        assert!(reader.is_playing());
        let events = drain(&mut rx);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, ReaderEvent::ProgressSaveFailed { reason } if reason.contains("disk full")))
        );
        assert!(!events.iter().any(|e| matches!(e, ReaderEvent::ProgressSaved { .. })));

        // No retry before the next save point
        reader.tick(start + Duration::from_secs(15));
        assert_eq!(store.attempts(), 1);

        reader.tick(start + Duration::from_secs(20));
        assert_eq!(store.attempts(), 2);
        assert!(reader.is_playing());
        assert_eq!(reader.state().page, 0);
    }

    #[test]
    fn test_save_deferred_while_render_in_flight() {
        let pages = StubPages::new(&[1, 1]);
        let store = Arc::new(MemoryProgressStore::new());
        let mut reader = session(&pages)
            .with_progress_store(store.clone())
            .with_deferred_rendering();
        let now = Instant::now();

        reader.start_reading(now);
        reader.render_pending();
        reader.play();
        reader.go_to_page(1);
        reader.pause(now + Duration::from_secs(1));

        assert_eq!(store.load(&key()).unwrap(), None);
        assert!(reader.state().save_due);

        assert!(reader.render_pending());
        let saved = store.load(&key()).unwrap().unwrap();
        assert_eq!(saved.current_page, 1);
        assert_eq!(saved.word_index, 0);
        assert!(!reader.state().save_due);
    }

    #[test]
    fn test_resume_lands_after_saved_word() {
        let pages = StubPages::new(&[1, 2]);
        let store = Arc::new(MemoryProgressStore::new());
        store
            .save(
                &key(),
                &ReadingProgress {
                    current_page: 1,
                    word_index: 4,
                    wpm: 250,
                    zoom: ZoomLevel::Percent125,
                },
            )
            .unwrap();
        let mut reader = session(&pages).with_progress_store(store);

        reader.open_settings();
        assert_eq!(reader.state().wpm, 250);
        assert_eq!(reader.state().zoom, ZoomLevel::Percent125);

        reader.start_reading(Instant::now());
        assert_eq!(reader.state().page, 1);
        assert_eq!(reader.word_index(), 4);
        assert_eq!(reader.global_word_index(), 3 + 4);

        let geometry = reader.animator().geometry();
        assert!((geometry.scale - 1.25).abs() < f32::EPSILON);
        let word = geometry.word(4).unwrap();
        assert!((reader.animator().state().pixel_x - word.right()).abs() < f32::EPSILON);
    }

    #[test]
    fn test_completion_clears_progress_and_logs_session() {
        let pages = StubPages::new(&[1]);
        let store = Arc::new(MemoryProgressStore::new());
        let journal = Arc::new(MemorySessionLog::new());
        let mut reader = session(&pages)
            .with_progress_store(store.clone())
            .with_session_log(journal.clone());
        let mut rx = reader.events().subscribe();
        let mut clock = Instant::now();

        reader.start_reading(clock);
        reader.pause(clock);
        assert!(store.load(&key()).unwrap().is_some());

        reader.play();
        run_until(&mut reader, &mut clock, |r| r.state().completed.is_some());

        assert_eq!(store.load(&key()).unwrap(), None);
        let sessions = journal.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].kind, "pdfread");
        assert_eq!(sessions[0].word_count, 3);
        assert_eq!(sessions[0].wpm, 200);
        assert_eq!(sessions[0].pages, 1);
        assert!(sessions[0].duration_secs <= 1);
        assert!(
            drain(&mut rx)
                .iter()
                .any(|event| matches!(event, ReaderEvent::SessionCompleted { word_count: 3, .. }))
        );

        reader.play();
        assert!(!reader.is_playing());
    }

    #[test]
    fn test_speed_steps_and_bounds() {
        let pages = StubPages::new(&[1]);
        let mut reader = session(&pages);

        assert_eq!(reader.adjust_speed(1), 250);
        assert_eq!(reader.adjust_speed(-1), 200);
        assert_eq!(reader.adjust_speed(-1), 150);
        assert_eq!(reader.adjust_speed(-1), 140);

        reader.set_wpm(70);
        assert_eq!(reader.adjust_speed(-1), 60);
        assert_eq!(reader.adjust_speed(-1), 60);

        reader.set_wpm(590);
        assert_eq!(reader.adjust_speed(1), 600);
        assert_eq!(reader.set_wpm(10_000), 600);
    }

    #[test]
    fn test_chapter_jump_lands_on_local_word() {
        let pages = StubPages::new(&[1, 1, 1]);
        let mut reader = session(&pages);
        reader.start_reading(Instant::now());

        let starts: Vec<_> = reader.toc().entries.iter().map(|e| e.word_start).collect();
        assert_eq!(starts, [0, 3, 6]);

        assert!(reader.jump_to_entry(2));
        assert_eq!(reader.state().page, 2);
        assert_eq!(reader.global_word_index(), 6);

        reader.jump_to_word(4);
        assert_eq!(reader.state().page, 1);
        assert_eq!(reader.word_index(), 1);

        assert!(!reader.jump_to_entry(99));
        assert!(!reader.go_to_page(3));
    }

    #[test]
    fn test_outline_drives_toc() {
        let pages = StubPages::new(&[1, 1, 1]);
        let outline = StubOutline(vec![
            OutlineNode::new("Opening", Some(0)),
            OutlineNode::new("Finale", Some(2)),
        ]);
        let mut reader = session(&pages).with_outline(&outline);
        assert_eq!(reader.toc().strategy, TocStrategy::Outline);

        reader.start_reading(Instant::now());
        assert!(reader.jump_to_entry(1));
        assert_eq!(reader.state().page, 2);
        assert_eq!(reader.toc().active_index(reader.global_word_index()), 1);
    }

    #[test]
    fn test_click_keeps_play_state() {
        let pages = StubPages::new(&[1]);
        let mut reader = session(&pages);
        reader.start_reading(Instant::now());
        reader.play();

        let target = reader.animator().geometry().word(2).unwrap().clone();
        let (cx, cy) = target.center();
        assert_eq!(reader.click(cx, cy), Some(2));
        assert!(reader.is_playing());
        assert_eq!(reader.word_index(), 2);
    }

    #[test]
    fn test_zoom_rerenders_at_same_word() {
        let pages = StubPages::new(&[2]);
        let mut reader = session(&pages);
        reader.start_reading(Instant::now());
        reader.jump_to_word(4);

        reader.set_zoom(ZoomLevel::Percent150);
        let geometry = reader.animator().geometry();
        assert!((geometry.scale - 1.5).abs() < f32::EPSILON);
        assert_eq!(reader.word_index(), 4);
        assert!((reader.animator().state().pixel_x - geometry.words[4].x).abs() < f32::EPSILON);
    }
}
