//! Text heuristics for documents without bookmarks.

use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::unwrap_used)] // static pattern
static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
#[allow(clippy::unwrap_used)] // static pattern
static RE_CHAPTER_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(розділ|глава|частина|chapter|part|section)\s").unwrap()
});
#[allow(clippy::unwrap_used)] // static pattern
static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]\s").unwrap());
#[allow(clippy::unwrap_used)] // static pattern
static RE_ROMAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[IVXLC]+[.)]\s").unwrap());
#[allow(clippy::unwrap_used)] // static pattern
static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s").unwrap());

/// Headings are shorter than this
const MAX_HEADING_CHARS: usize = 80;
/// Unmarked short lines count as headings below this length
const SHORT_LINE_CHARS: usize = 50;
const SHORT_LINE_MAX_WORDS: usize = 10;
const CAPS_MIN_WORDS: usize = 2;
const CAPS_MAX_WORDS: usize = 12;

/// Blank-line separated paragraphs with line breaks folded into spaces
pub fn paragraphs(text: &str) -> Vec<String> {
    RE_PARAGRAPH_BREAK
        .split(text)
        .map(|para| para.replace('\n', " ").trim().to_string())
        .filter(|para| !para.is_empty())
        .collect()
}

/// Whether a paragraph reads like a chapter or section title
pub fn is_heading(paragraph: &str) -> bool {
    let trimmed = paragraph.trim();
    let len = trimmed.chars().count();
    if !(2..MAX_HEADING_CHARS).contains(&len) {
        return false;
    }
    if trimmed.ends_with(['.', ',', ';']) {
        return false;
    }

    if RE_CHAPTER_MARKER.is_match(trimmed)
        || RE_NUMBERED.is_match(trimmed)
        || RE_ROMAN.is_match(trimmed)
    {
        return true;
    }

    let words = trimmed.split_whitespace().count();
    if (CAPS_MIN_WORDS..=CAPS_MAX_WORDS).contains(&words) && trimmed.to_uppercase() == trimmed {
        return true;
    }

    len < SHORT_LINE_CHARS && !trimmed.ends_with(['.', '!', '?']) && words <= SHORT_LINE_MAX_WORDS
}

/// Collapse whitespace, cut at a word boundary and drop trailing punctuation
pub fn clean_title(raw: &str, max_len: usize) -> String {
    let mut title = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if title.chars().count() > max_len {
        let chars: Vec<char> = title.chars().collect();
        let cut = chars[..=max_len.min(chars.len() - 1)]
            .iter()
            .rposition(|c| *c == ' ')
            .filter(|&pos| pos > 10)
            .unwrap_or(max_len);
        title = chars[..cut].iter().collect();
    }

    title
        .trim_end_matches([',', ';', ':', '-', '–', '—'])
        .trim()
        .to_string()
}

/// First sentence, kept only when it is short enough to serve as a title
pub fn short_first_sentence(paragraph: &str) -> Option<&str> {
    let end = RE_SENTENCE_END.find(paragraph)?.start();
    let chars_before = paragraph[..end].chars().count();
    (chars_before > 5 && chars_before < 60).then(|| &paragraph[..=end])
}
