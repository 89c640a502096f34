//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Get the user's data directory following XDG conventions.
///
/// Returns `$XDG_DATA_HOME` if set, otherwise `$HOME/.local/share`.
pub fn data_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
        })
}

/// Directory holding the progress database and session journal.
pub fn data_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from(".data"))
        .join("pdf-pacer")
}

/// Whole-word tokens of a text run, in order.
///
/// The extractor and the document index both count words through this so
/// global word offsets and per-page word boxes agree.
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

/// Number of whitespace-delimited words in `text`.
pub fn word_count(text: &str) -> usize {
    tokens(text).count()
}
