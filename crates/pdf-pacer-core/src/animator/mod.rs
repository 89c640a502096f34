//! Paced reveal: moves a "read up to here" cursor across a page's words.
//!
//! The animator owns the page geometry it walks and its reveal state. The
//! host calls [`Animator::tick`] once per display frame with the elapsed
//! time; seeks replace the position instantly and win over the next frame's
//! automatic advance.

pub mod pacing;
mod shadow;

pub use shadow::{MaskRect, ShadowMask};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

use crate::config::AnimatorConfig;
use crate::geometry::{PageGeometry, WordBox};

/// Continuous reveal position on the current page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevealState {
    /// Top of the line being revealed
    pub line_y: f32,
    pub line_height: f32,
    /// Reveal position within the line
    pub pixel_x: f32,
    pub playing: bool,
}

impl Default for RevealState {
    fn default() -> Self {
        Self {
            line_y: 0.0,
            line_height: 12.0,
            pixel_x: 0.0,
            playing: false,
        }
    }
}

/// How the cursor moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevealPolicy {
    /// Sub-word pixel sweep along each line
    #[default]
    Continuous,
    /// Whole-word steps, one per word interval
    Discrete,
}

/// Which edge of the target word a seek lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekAnchor {
    /// Left edge; the word itself is still unread
    Start,
    /// Right edge; the word counts as read
    End,
}

/// What a frame did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Paused, or nothing left to reveal
    Idle,
    Advanced,
    /// The last line was reached on this frame
    PageComplete,
}

#[derive(Debug, Clone)]
pub struct Animator {
    config: AnimatorConfig,
    policy: RevealPolicy,
    geometry: PageGeometry,
    state: RevealState,
    /// Word the cursor is on
    word_index: usize,
    /// Discrete mode: whether `word_index` has been shown yet
    revealed: bool,
    /// Discrete mode: time banked toward the next step
    banked: Duration,
    exhausted: bool,
}

impl Animator {
    pub fn new(config: AnimatorConfig, policy: RevealPolicy) -> Self {
        let state = RevealState {
            line_height: config.fallback_line_height,
            ..RevealState::default()
        };
        Self {
            config,
            policy,
            geometry: PageGeometry::default(),
            state,
            word_index: 0,
            revealed: false,
            banked: Duration::ZERO,
            exhausted: false,
        }
    }

    pub const fn state(&self) -> &RevealState {
        &self.state
    }

    pub const fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub const fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    pub const fn policy(&self) -> RevealPolicy {
        self.policy
    }

    pub const fn is_playing(&self) -> bool {
        self.state.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.state.playing = playing;
        if !playing {
            self.banked = Duration::ZERO;
        }
    }

    /// Whether the cursor has run off the last line of the page
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Word the cursor is currently on, as a page-local index
    pub const fn current_word_index(&self) -> usize {
        self.word_index
    }

    /// Swap in a new page's words and snap to `word`
    ///
    /// The previous geometry is dropped in one move, so no frame ever sees a
    /// mix of old and new words.
    pub fn load_page(&mut self, geometry: PageGeometry, word: usize, anchor: SeekAnchor) {
        self.geometry = geometry;
        if self.seek(word, anchor).is_none() {
            self.reset_position();
        }
    }

    /// Snap to a word; out-of-range indices land on the last word
    ///
    /// Returns the index actually used, or `None` when the page has no words.
    pub fn seek(&mut self, index: usize, anchor: SeekAnchor) -> Option<usize> {
        let last = self.geometry.len().checked_sub(1)?;
        let index = index.min(last);
        let word = &self.geometry.words[index];
        let pixel_x = match anchor {
            SeekAnchor::Start => word.x,
            SeekAnchor::End => word.right(),
        };
        self.snap_to(index, pixel_x);
        self.revealed = anchor == SeekAnchor::End;
        Some(index)
    }

    /// Seek to the word nearest a page-pixel point
    pub fn click(&mut self, x: f32, y: f32) -> Option<usize> {
        let index = self.geometry.nearest_word(x, y)?;
        let pixel_x = self.geometry.words[index].x;
        self.snap_to(index, pixel_x);
        self.revealed = false;
        Some(index)
    }

    fn snap_to(&mut self, index: usize, pixel_x: f32) {
        let word = &self.geometry.words[index];
        let line_y = word.y;
        let line_height = self.line_height_of(word);
        let line_end = self
            .geometry
            .line_end(line_y, self.config.line_tolerance)
            .unwrap_or(self.geometry.width);

        self.state.line_y = line_y;
        self.state.line_height = line_height;
        self.state.pixel_x = pixel_x.min(line_end);
        self.word_index = index;
        self.banked = Duration::ZERO;
        self.exhausted = false;
    }

    fn reset_position(&mut self) {
        self.state.line_y = 0.0;
        self.state.line_height = self.config.fallback_line_height;
        self.state.pixel_x = 0.0;
        self.word_index = 0;
        self.revealed = false;
        self.banked = Duration::ZERO;
        self.exhausted = false;
    }

    fn line_height_of(&self, word: &WordBox) -> f32 {
        if word.height > 0.0 {
            word.height
        } else {
            self.config.fallback_line_height
        }
    }

    /// Advance by one frame
    pub fn tick(&mut self, dt: Duration, wpm: u32) -> FrameOutcome {
        if !self.state.playing || self.exhausted {
            return FrameOutcome::Idle;
        }
        if self.geometry.is_empty() {
            // Nothing to read here; let the controller move on
            self.exhausted = true;
            return FrameOutcome::PageComplete;
        }

        let dt = dt.min(self.config.max_frame_dt());
        match self.policy {
            RevealPolicy::Continuous => self.advance_continuous(dt, wpm),
            RevealPolicy::Discrete => self.advance_discrete(dt, wpm),
        }
    }

    fn advance_continuous(&mut self, dt: Duration, wpm: u32) -> FrameOutcome {
        let speed = pacing::pixels_per_second(&self.geometry, &self.config, wpm);
        self.state.pixel_x += speed * dt.as_secs_f32();

        loop {
            let line_end = self
                .geometry
                .line_end(self.state.line_y, self.config.line_tolerance)
                .unwrap_or(self.geometry.width);
            if self.state.pixel_x < line_end {
                break;
            }

            let next = self
                .geometry
                .next_line_after(self.state.line_y, self.config.next_line_threshold)
                .map(|word| (word.y, self.line_height_of(word)));
            match next {
                Some((line_y, line_height)) => {
                    let overflow = self.state.pixel_x - line_end;
                    trace!("Line wrap {} -> {}", self.state.line_y, line_y);
                    self.state.line_y = line_y;
                    self.state.line_height = line_height;
                    self.state.pixel_x = overflow;
                }
                None => {
                    self.state.pixel_x = line_end;
                    self.word_index = self.geometry.len() - 1;
                    self.exhausted = true;
                    return FrameOutcome::PageComplete;
                }
            }
        }

        self.word_index = self.word_under_cursor();
        FrameOutcome::Advanced
    }

    /// First word on the current line not yet fully revealed, else the line's last word
    fn word_under_cursor(&self) -> usize {
        let tolerance = self.config.line_tolerance;
        let mut last_on_line = None;
        for (i, word) in self.geometry.words.iter().enumerate() {
            if !word.on_line(self.state.line_y, tolerance) {
                continue;
            }
            if word.right() > self.state.pixel_x {
                return i;
            }
            last_on_line = Some(i);
        }
        last_on_line.unwrap_or(self.word_index)
    }

    fn advance_discrete(&mut self, dt: Duration, wpm: u32) -> FrameOutcome {
        let interval = pacing::word_interval(wpm);
        self.banked += dt;

        let mut outcome = FrameOutcome::Idle;
        while self.banked >= interval {
            self.banked -= interval;

            if self.revealed {
                let next = self.word_index + 1;
                if next >= self.geometry.len() {
                    self.exhausted = true;
                    return FrameOutcome::PageComplete;
                }
                self.word_index = next;
            }
            self.reveal_current_word();
            outcome = FrameOutcome::Advanced;
        }
        outcome
    }

    fn reveal_current_word(&mut self) {
        let word = &self.geometry.words[self.word_index];
        let (line_y, right) = (word.y, word.right());
        let line_height = self.line_height_of(word);
        self.state.line_y = line_y;
        self.state.line_height = line_height;
        self.state.pixel_x = right;
        self.revealed = true;
    }

    /// Mask for the current position; safe to call every frame whatever the play state
    pub fn shadow(&self) -> ShadowMask {
        shadow::compute(&self.state, &self.geometry, &self.config)
    }
}
