use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::animator::RevealPolicy;

/// Discrete zoom levels offered while reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ZoomLevel {
    #[serde(rename = "75%")]
    Percent75,
    #[default]
    #[serde(rename = "100%")]
    Percent100,
    #[serde(rename = "125%")]
    Percent125,
    #[serde(rename = "150%")]
    Percent150,
}

impl ZoomLevel {
    /// All selectable levels, smallest first
    pub const ALL: [Self; 4] = [
        Self::Percent75,
        Self::Percent100,
        Self::Percent125,
        Self::Percent150,
    ];

    /// Multiplier applied to the base render scale
    pub const fn factor(self) -> f32 {
        match self {
            Self::Percent75 => 0.75,
            Self::Percent100 => 1.0,
            Self::Percent125 => 1.25,
            Self::Percent150 => 1.5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Percent75 => "75%",
            Self::Percent100 => "100%",
            Self::Percent125 => "125%",
            Self::Percent150 => "150%",
        }
    }

    /// Closest level to an arbitrary factor (persisted values are plain numbers)
    pub fn from_factor(factor: f32) -> Self {
        Self::ALL
            .into_iter()
            .min_by(|a, b| {
                (a.factor() - factor)
                    .abs()
                    .total_cmp(&(b.factor() - factor).abs())
            })
            .unwrap_or_default()
    }

    /// Parse "125", "125%" or "1.25"
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim().trim_end_matches('%');
        let number: f32 = trimmed.parse().ok()?;
        let factor = if number > 5.0 { number / 100.0 } else { number };
        let level = Self::from_factor(factor);
        ((level.factor() - factor).abs() < 0.01).then_some(level)
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Reading speed, zoom and cadence settings for the session controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Speed used when no progress has been saved
    pub default_wpm: u32,
    pub min_wpm: u32,
    pub max_wpm: u32,
    /// Speeds at or below this step by `fine_step`, above it by `coarse_step`
    pub step_threshold: u32,
    pub fine_step: u32,
    pub coarse_step: u32,
    pub default_zoom: ZoomLevel,
    /// Orientation pause after an automatic page turn
    pub page_turn_pause_ms: u64,
    /// Progress save cadence while playing
    pub save_interval_secs: u64,
    pub reveal_policy: RevealPolicy,
}

impl ReaderConfig {
    pub const fn page_turn_pause(&self) -> Duration {
        Duration::from_millis(self.page_turn_pause_ms)
    }

    pub const fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    pub fn clamp_wpm(&self, wpm: u32) -> u32 {
        wpm.clamp(self.min_wpm, self.max_wpm.max(self.min_wpm))
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            default_wpm: 200,
            min_wpm: 60,
            max_wpm: 600,
            step_threshold: 150,
            fine_step: 10,
            coarse_step: 50,
            default_zoom: ZoomLevel::Percent100,
            page_turn_pause_ms: 2000,
            save_interval_secs: 30,
            reveal_policy: RevealPolicy::Continuous,
        }
    }
}

/// Tuning constants for the paced reveal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    /// Longest frame delta applied in one tick; absorbs stalls
    pub max_frame_dt_ms: u64,
    /// Words whose top is within this many pixels share a line
    pub line_tolerance: f32,
    /// A word starts a new line once its top is this far below the current one
    pub next_line_threshold: f32,
    /// Average word width assumed when a page has no measurable words
    pub fallback_word_width: f32,
    /// Widens the average word to account for the gap after it
    pub spacing_factor: f32,
    /// Line height used when a word reports none
    pub fallback_line_height: f32,
    /// Share of the gap to the next line that the reveal band extends into
    pub shadow_gap_ratio: f32,
}

impl AnimatorConfig {
    pub const fn max_frame_dt(&self) -> Duration {
        Duration::from_millis(self.max_frame_dt_ms)
    }
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            max_frame_dt_ms: 50,
            line_tolerance: 4.0,
            next_line_threshold: 2.0,
            fallback_word_width: 40.0,
            spacing_factor: 1.5,
            fallback_line_height: 12.0,
            shadow_gap_ratio: 0.5,
        }
    }
}

/// Table-of-contents generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TocConfig {
    /// Generated titles are cut at a word boundary to this many characters
    pub max_title_len: usize,
    /// Upper bound on page or paragraph buckets
    pub max_sections: usize,
    /// Roughly how many pages a bucket should hold on long documents
    pub pages_per_section: usize,
    /// `{n}` is replaced by the 1-based page number
    pub page_label: String,
    /// `{start}` and `{end}` are replaced by 1-based page numbers
    pub page_range_label: String,
    /// `{n}` is replaced by the 1-based part number
    pub part_label: String,
    /// Used for outline entries without a title
    pub section_label: String,
}

impl TocConfig {
    pub fn page_title(&self, page: usize) -> String {
        self.page_label.replace("{n}", &(page + 1).to_string())
    }

    pub fn page_range_title(&self, start: usize, end: usize) -> String {
        self.page_range_label
            .replace("{start}", &(start + 1).to_string())
            .replace("{end}", &end.to_string())
    }

    pub fn part_title(&self, n: usize) -> String {
        self.part_label.replace("{n}", &n.to_string())
    }

    pub fn section_title(&self, n: usize) -> String {
        self.section_label.replace("{n}", &n.to_string())
    }
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            max_title_len: 50,
            max_sections: 8,
            pages_per_section: 5,
            page_label: "Page {n}".to_string(),
            page_range_label: "Pages {start}–{end}".to_string(),
            part_label: "Part {n}".to_string(),
            section_label: "Section {n}".to_string(),
        }
    }
}

/// Where progress and completed sessions are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Persist reading progress between runs
    #[serde(default = "default_true")]
    pub progress_enabled: bool,

    /// Progress database directory (defaults to $XDG_DATA_HOME/pdf-pacer/progress)
    pub progress_path: Option<PathBuf>,

    /// Completed-session journal (defaults to $XDG_DATA_HOME/pdf-pacer/sessions.jsonl)
    pub session_log_path: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

impl StorageConfig {
    pub fn progress_path(&self) -> PathBuf {
        self.progress_path
            .clone()
            .unwrap_or_else(|| crate::util::data_path().join("progress"))
    }

    pub fn session_log_path(&self) -> PathBuf {
        self.session_log_path
            .clone()
            .unwrap_or_else(|| crate::util::data_path().join("sessions.jsonl"))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            progress_enabled: true,
            progress_path: None,
            session_log_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub animator: AnimatorConfig,

    #[serde(default)]
    pub toc: TocConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Pixels per PDF point at 100% zoom
    #[serde(default = "default_render_scale")]
    pub render_scale: f32,
}

const fn default_render_scale() -> f32 {
    1.0
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/pdf-pacer/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-pacer").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        let invalid = |field: &str, reason: &str| crate::error::Error::ConfigInvalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.reader.min_wpm == 0 {
            return Err(invalid("reader.min_wpm", "must be greater than zero"));
        }
        if self.reader.min_wpm > self.reader.max_wpm {
            return Err(invalid("reader.max_wpm", "must not be below reader.min_wpm"));
        }
        if !(self.render_scale.is_finite() && self.render_scale > 0.0) {
            return Err(invalid("render_scale", "must be a positive number"));
        }
        if self.animator.line_tolerance < 0.0 {
            return Err(invalid("animator.line_tolerance", "must not be negative"));
        }
        if self.toc.max_sections == 0 {
            return Err(invalid("toc.max_sections", "must be at least 1"));
        }
        Ok(())
    }

    /// Effective pixels-per-point for a zoom level
    pub fn scale_for(&self, zoom: ZoomLevel) -> f32 {
        self.render_scale * zoom.factor()
    }
}
