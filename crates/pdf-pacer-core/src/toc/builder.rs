use tracing::debug;

use super::heuristics::{clean_title, is_heading, paragraphs, short_first_sentence};
use super::{OutlineNode, TableOfContents, TocEntry, TocStrategy};
use crate::config::TocConfig;
use crate::geometry::DocumentIndex;
use crate::util::word_count;

/// Fewer detected headings than this and the heading strategy is rejected
const MIN_HEADINGS: usize = 2;
/// Lower bound on paragraph buckets
const MIN_PARAGRAPH_SECTIONS: usize = 3;
/// Roughly how many paragraphs a bucket should hold
const PARAGRAPHS_PER_SECTION: usize = 4;

/// Derives a table of contents, trying each strategy in priority order
#[derive(Debug, Clone)]
pub struct TocBuilder<'a> {
    config: &'a TocConfig,
}

impl<'a> TocBuilder<'a> {
    pub const fn new(config: &'a TocConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, outline: &[OutlineNode], index: &DocumentIndex) -> TableOfContents {
        let (strategy, entries) = self.select(outline, index);
        debug!("Built table of contents: {:?}, {} entries", strategy, entries.len());
        TableOfContents {
            entries,
            strategy,
            total_words: index.total_words,
        }
    }

    fn select(&self, outline: &[OutlineNode], index: &DocumentIndex) -> (TocStrategy, Vec<TocEntry>) {
        let from_outline = self.from_outline(outline, &index.page_word_offsets);
        if !from_outline.is_empty() {
            return (TocStrategy::Outline, from_outline);
        }

        let has_pages = index.page_count() > 1;
        let paras = paragraphs(&index.text);

        if paras.len() <= 1 {
            return if has_pages {
                (TocStrategy::Pages, self.from_pages(&index.page_word_offsets))
            } else {
                (TocStrategy::Empty, Vec::new())
            };
        }

        let headings = self.from_headings(&paras);
        if headings.len() >= MIN_HEADINGS {
            return (TocStrategy::Headings, headings);
        }

        if has_pages {
            (TocStrategy::Pages, self.from_pages(&index.page_word_offsets))
        } else {
            (TocStrategy::Paragraphs, self.from_paragraphs(&paras))
        }
    }

    /// Flatten bookmarks depth-first
    ///
    /// An unresolved target inherits its parent's start, or word 0 at the top level.
    pub fn from_outline(&self, outline: &[OutlineNode], offsets: &[usize]) -> Vec<TocEntry> {
        let mut entries = Vec::new();
        self.flatten(outline, 0, 0, offsets, &mut entries);
        // Bookmarks are not guaranteed to be in document order
        entries.sort_by_key(|entry| entry.word_start);
        entries
    }

    fn flatten(
        &self,
        nodes: &[OutlineNode],
        level: usize,
        parent_start: usize,
        offsets: &[usize],
        out: &mut Vec<TocEntry>,
    ) {
        for node in nodes {
            let word_start = node
                .page
                .and_then(|page| offsets.get(page).copied())
                .unwrap_or(parent_start);
            let title = node.title.trim();
            let title = if title.is_empty() {
                self.config.section_title(out.len() + 1)
            } else {
                title.to_string()
            };
            out.push(TocEntry::new(title, word_start, level));
            self.flatten(&node.children, level + 1, word_start, offsets, out);
        }
    }

    /// One entry per paragraph that reads like a title
    pub fn from_headings(&self, paragraphs: &[String]) -> Vec<TocEntry> {
        let mut entries = Vec::new();
        let mut offset = 0;
        for para in paragraphs {
            if is_heading(para) {
                entries.push(TocEntry::new(
                    clean_title(para, self.config.max_title_len),
                    offset,
                    0,
                ));
            }
            offset += word_count(para);
        }
        entries
    }

    /// One entry per page, or page ranges when there are too many pages
    pub fn from_pages(&self, offsets: &[usize]) -> Vec<TocEntry> {
        let total = offsets.len();
        let max_sections = self.config.max_sections.max(1);

        if total <= max_sections {
            return offsets
                .iter()
                .enumerate()
                .map(|(page, &offset)| TocEntry::new(self.config.page_title(page), offset, 0))
                .collect();
        }

        let sections = total
            .div_ceil(self.config.pages_per_section.max(1))
            .min(max_sections);
        let chunk = total.div_ceil(sections);

        (0..total)
            .step_by(chunk)
            .map(|start| {
                let end = (start + chunk).min(total);
                let title = if end - start == 1 {
                    self.config.page_title(start)
                } else {
                    self.config.page_range_title(start, end)
                };
                TocEntry::new(title, offsets[start], 0)
            })
            .collect()
    }

    /// Split paragraphs into a handful of equal groups
    pub fn from_paragraphs(&self, paragraphs: &[String]) -> Vec<TocEntry> {
        if paragraphs.is_empty() {
            return Vec::new();
        }

        let sections = paragraphs
            .len()
            .div_ceil(PARAGRAPHS_PER_SECTION)
            .max(MIN_PARAGRAPH_SECTIONS)
            .min(self.config.max_sections.max(1));
        let per_section = paragraphs.len().div_ceil(sections);

        let mut entries = Vec::new();
        let mut offset = 0;
        for group in paragraphs.chunks(per_section) {
            let first = group[0].as_str();
            let title = short_first_sentence(first)
                .map(str::to_string)
                .unwrap_or_else(|| clean_title(first, self.config.max_title_len));
            let title = if title.is_empty() {
                self.config.part_title(entries.len() + 1)
            } else {
                title
            };
            entries.push(TocEntry::new(title, offset, 0));
            offset += group.iter().map(|para| word_count(para)).sum::<usize>();
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(offsets_from_counts: Vec<usize>, text: &str) -> DocumentIndex {
        DocumentIndex::from_page_counts(offsets_from_counts, text.to_string())
    }

    fn assert_ordered(toc: &TableOfContents) {
        assert!(
            toc.entries.windows(2).all(|w| w[0].word_start <= w[1].word_start),
            "entries out of order: {:?}",
            toc.entries
        );
    }

    #[test]
    fn test_outline_maps_pages_to_offsets() {
        let config = TocConfig::default();
        let outline = vec![
            OutlineNode::new("Вступ", Some(0)),
            OutlineNode::new("Розділ 2", Some(3)),
        ];
        let index = index(vec![40, 45, 45, 10], "");

        let toc = TocBuilder::new(&config).build(&outline, &index);
        assert_eq!(toc.strategy, TocStrategy::Outline);
        let starts: Vec<_> = toc.entries.iter().map(|e| e.word_start).collect();
        assert_eq!(starts, [0, 130]);
        assert_eq!(toc.total_words, 140);
    }

    #[test]
    fn test_outline_nesting_and_unresolved_targets() {
        let config = TocConfig::default();
        let outline = vec![
            OutlineNode::new("Part I", Some(1)).with_children(vec![
                OutlineNode::new("  ", Some(2)),
                OutlineNode::new("Lost", None),
                OutlineNode::new("Beyond", Some(99)),
            ]),
        ];
        let index = index(vec![10, 10, 10], "");

        let toc = TocBuilder::new(&config).build(&outline, &index);
        assert_ordered(&toc);
        assert_eq!(
            toc.entries,
            [
                TocEntry::new("Part I", 10, 0),
                TocEntry::new("Lost", 10, 1),
                TocEntry::new("Beyond", 10, 1),
                TocEntry::new("Section 2", 20, 1),
            ]
        );
    }

    #[test]
    fn test_unresolved_children_stay_under_parent() {
        let config = TocConfig::default();
        let outline = vec![
            OutlineNode::new("Preface", None),
            OutlineNode::new("Chapter 1", Some(1)),
            OutlineNode::new("Chapter 2", Some(2)).with_children(vec![
                OutlineNode::new("Figures", None)
                    .with_children(vec![OutlineNode::new("Plate 1", None)]),
            ]),
        ];
        let index = index(vec![5, 10, 10], "");

        let toc = TocBuilder::new(&config).build(&outline, &index);
        let rows: Vec<_> = toc
            .entries
            .iter()
            .map(|e| (e.title.as_str(), e.word_start, e.level))
            .collect();
        assert_eq!(
            rows,
            [
                ("Preface", 0, 0),
                ("Chapter 1", 5, 0),
                ("Chapter 2", 15, 0),
                ("Figures", 15, 1),
                ("Plate 1", 15, 2),
            ]
        );
        assert_eq!(toc.active_index(16), 4);
    }

    #[test]
    fn test_headings_need_two_matches() {
        let config = TocConfig::default();
        let text = "Розділ 1\n\nДовгий абзац тексту, що пояснює все детально і не схожий на заголовок.\n\n\
                    Розділ 2\n\nЩе один звичайний абзац, у якому є кома, крапка і багато слів.";
        let toc = TocBuilder::new(&config).build(&[], &index(vec![30], text));

        assert_eq!(toc.strategy, TocStrategy::Headings);
        assert_eq!(toc.entries[0], TocEntry::new("Розділ 1", 0, 0));
        assert_eq!(toc.entries[1].title, "Розділ 2");
        assert_eq!(toc.entries[1].word_start, 2 + 12);
    }

    #[test]
    fn test_single_heading_falls_through_to_pages() {
        let config = TocConfig::default();
        let text = "Intro\n\nThis is prose, and it ends like prose does.\n\nSo does this one, naturally.";
        let toc = TocBuilder::new(&config).build(&[], &index(vec![5, 5, 5], text));
        assert_eq!(toc.strategy, TocStrategy::Pages);
        assert_eq!(toc.len(), 3);
        assert_eq!(toc.entries[2], TocEntry::new("Page 3", 10, 0));
    }

    #[test]
    fn test_page_ranges_for_long_documents() {
        let config = TocConfig::default();
        let builder = TocBuilder::new(&config);

        // 23 pages → min(8, ceil(23/5)=5) sections of ceil(23/5)=5 pages
        let offsets: Vec<usize> = (0..23).map(|p| p * 10).collect();
        let entries = builder.from_pages(&offsets);
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Pages 1–5", "Pages 6–10", "Pages 11–15", "Pages 16–20", "Pages 21–23"]
        );
        assert_eq!(entries[1].word_start, 50);

        // 100 pages → 8 sections of 13 pages, last bucket shorter
        let offsets: Vec<usize> = (0..100).collect();
        let entries = builder.from_pages(&offsets);
        assert_eq!(entries.len(), 8);
        assert_eq!(entries[7].title, "Pages 92–100");

        // A trailing single page keeps the singular label
        let offsets: Vec<usize> = (0..21).collect();
        let entries = builder.from_pages(&offsets);
        assert_eq!(entries.last().map(|e| e.title.as_str()), Some("Page 21"));
    }

    #[test]
    fn test_paragraph_buckets_without_pages() {
        let config = TocConfig::default();
        let paras: Vec<String> = (1..=10)
            .map(|i| format!("Paragraph number {i} starts here. Then it keeps talking, at length."))
            .collect();
        let text = paras.join("\n\n");
        let toc = TocBuilder::new(&config).build(&[], &index(vec![120], &text));

        assert_eq!(toc.strategy, TocStrategy::Paragraphs);
        // ceil(10/4)=3 sections, 4 paragraphs each
        assert_eq!(toc.len(), 3);
        assert_eq!(toc.entries[0].title, "Paragraph number 1 starts here.");
        assert_eq!(toc.entries[1].word_start, 4 * 11);
        assert_eq!(toc.entries[2].title, "Paragraph number 9 starts here.");
        assert_ordered(&toc);
    }

    #[test]
    fn test_single_paragraph_single_page_is_empty() {
        let config = TocConfig::default();
        let toc = TocBuilder::new(&config).build(&[], &index(vec![4], "just one paragraph here."));
        assert_eq!(toc.strategy, TocStrategy::Empty);
        assert!(toc.is_empty());
    }
}
