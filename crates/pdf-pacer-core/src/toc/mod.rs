//! Table of contents: bookmarks when the document has them, heuristics when not.

mod builder;
pub mod heuristics;

pub use builder::TocBuilder;

use serde::{Deserialize, Serialize};

/// Reading speed behind the per-section time estimate
pub const ESTIMATE_WPM: usize = 200;

/// One bookmark as exposed by the document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub title: String,
    /// 0-based target page; `None` when the target cannot be resolved
    pub page: Option<usize>,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(title: impl Into<String>, page: Option<usize>) -> Self {
        Self {
            title: title.into(),
            page,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }
}

/// One navigation target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    /// Global word index where the section begins
    pub word_start: usize,
    /// Nesting depth, 0 is top level
    pub level: usize,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, word_start: usize, level: usize) -> Self {
        Self {
            title: title.into(),
            word_start,
            level,
        }
    }
}

/// Which strategy produced the entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocStrategy {
    /// Embedded bookmarks
    Outline,
    /// Paragraphs that look like titles
    Headings,
    /// Page or page-range buckets
    Pages,
    /// Paragraph buckets
    Paragraphs,
    /// Nothing to navigate
    Empty,
}

/// Reading statistics for one entry at a given position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStats {
    pub word_count: usize,
    pub reading_minutes: usize,
    /// 0 to 100
    pub percent_read: u8,
}

/// Entries ordered by `word_start`, non-decreasing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOfContents {
    pub entries: Vec<TocEntry>,
    pub strategy: TocStrategy,
    pub total_words: usize,
}

impl TableOfContents {
    pub const fn empty(total_words: usize) -> Self {
        Self {
            entries: Vec::new(),
            strategy: TocStrategy::Empty,
            total_words,
        }
    }

    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&TocEntry> {
        self.entries.get(index)
    }

    /// Last entry that starts at or before `word`, defaulting to the first
    pub fn active_index(&self, word: usize) -> usize {
        self.entries
            .iter()
            .rposition(|entry| entry.word_start <= word)
            .unwrap_or(0)
    }

    /// Word count, time estimate and progress for every entry
    pub fn section_stats(&self, word: usize) -> Vec<SectionStats> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let start = entry.word_start;
                let end = self
                    .entries
                    .get(i + 1)
                    .map_or(self.total_words, |next| next.word_start)
                    .max(start);
                let word_count = end - start;

                let percent_read = if word >= end {
                    100
                } else if word > start {
                    percent(word - start, word_count)
                } else {
                    0
                };

                SectionStats {
                    word_count,
                    reading_minutes: div_round(word_count, ESTIMATE_WPM).max(1),
                    percent_read,
                }
            })
            .collect()
    }

    /// Share of the whole document before `word`
    pub fn overall_progress(&self, word: usize) -> u8 {
        if self.total_words == 0 {
            0
        } else {
            percent(word.min(self.total_words), self.total_words)
        }
    }
}

/// Rounded integer division, halves rounding up
const fn div_round(numerator: usize, denominator: usize) -> usize {
    (numerator * 2 + denominator) / (denominator * 2)
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    u8::try_from(div_round(part.min(whole) * 100, whole)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toc() -> TableOfContents {
        TableOfContents {
            entries: vec![
                TocEntry::new("One", 0, 0),
                TocEntry::new("Two", 100, 0),
                TocEntry::new("Two.1", 100, 1),
                TocEntry::new("Three", 700, 0),
            ],
            strategy: TocStrategy::Outline,
            total_words: 1000,
        }
    }

    #[test]
    fn test_active_index() {
        let toc = toc();
        assert_eq!(toc.active_index(0), 0);
        assert_eq!(toc.active_index(99), 0);
        assert_eq!(toc.active_index(100), 2);
        assert_eq!(toc.active_index(5000), 3);
        assert_eq!(TableOfContents::empty(0).active_index(10), 0);
    }

    #[test]
    fn test_section_stats() {
        let stats = toc().section_stats(150);

        assert_eq!(stats[0].word_count, 100);
        assert_eq!(stats[0].reading_minutes, 1);
        assert_eq!(stats[0].percent_read, 100);

        assert_eq!(stats[1].word_count, 0);
        assert_eq!(stats[1].percent_read, 100);

        assert_eq!(stats[2].word_count, 600);
        assert_eq!(stats[2].reading_minutes, 3);
        assert_eq!(stats[2].percent_read, 8);

        assert_eq!(stats[3].word_count, 300);
        assert_eq!(stats[3].reading_minutes, 2);
        assert_eq!(stats[3].percent_read, 0);
    }

    #[test]
    fn test_overall_progress() {
        let toc = toc();
        assert_eq!(toc.overall_progress(0), 0);
        assert_eq!(toc.overall_progress(333), 33);
        assert_eq!(toc.overall_progress(2000), 100);
        assert_eq!(TableOfContents::empty(0).overall_progress(5), 0);
    }
}
