//! Reading session: screens, playback, persistence and navigation.

mod controller;
mod speed;

pub use controller::{ReadingSession, RenderTicket};
pub use speed::adjust_wpm;

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::animator::{FrameOutcome, RevealState, SeekAnchor, ShadowMask};
use crate::config::ZoomLevel;
use crate::journal::CompletedSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Library,
    Settings,
    Reading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Stopped by the reader; stays stopped
    Paused,
    Playing,
    /// Stopped after an automatic page turn; resumes by itself at `resume_at`
    PageTurnPause { resume_at: Instant },
}

impl Playback {
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Everything the controller tracks between frames
#[derive(Debug, Clone)]
pub struct SessionState {
    pub screen: Screen,
    pub playback: Playback,
    /// Page whose geometry is loaded, 0-based
    pub page: usize,
    pub wpm: u32,
    pub zoom: ZoomLevel,
    /// Time spent playing
    pub played: Duration,
    pub last_frame: Option<Instant>,
    pub last_save: Option<Instant>,
    /// A save was asked for while a render was in flight
    pub save_due: bool,
    /// Where to land once the pending render arrives
    pub landing: (usize, SeekAnchor),
    pub completed: Option<CompletedSession>,
}

/// What the host needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub outcome: FrameOutcome,
    pub state: RevealState,
    pub mask: ShadowMask,
    pub page: usize,
    /// Word under the cursor on `page`
    pub word_index: usize,
    pub playback: Playback,
}
