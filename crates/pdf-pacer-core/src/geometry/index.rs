use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::extract::count_run_words;
use crate::source::PageSource;

/// Document-wide word numbering
///
/// Global word `n` lives on the last page whose offset is `<= n`. Counts come
/// from the same tokenizer the extractor uses, so a page's local word index
/// is `n - page_word_offsets[page]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIndex {
    /// Cumulative word count before each page
    pub page_word_offsets: Vec<usize>,
    pub page_word_counts: Vec<usize>,
    pub total_words: usize,
    /// Whole-document text, pages separated by blank lines
    pub text: String,
}

impl DocumentIndex {
    /// Build from per-page word counts and the document text
    pub fn from_page_counts(page_word_counts: Vec<usize>, text: String) -> Self {
        let mut page_word_offsets = Vec::with_capacity(page_word_counts.len());
        let mut total_words = 0;
        for count in &page_word_counts {
            page_word_offsets.push(total_words);
            total_words += count;
        }
        Self {
            page_word_offsets,
            page_word_counts,
            total_words,
            text,
        }
    }

    /// Walk every page of a source.
    ///
    /// A page that fails to yield text counts as empty so the rest of the
    /// numbering stays usable.
    pub fn build(source: &dyn PageSource) -> Self {
        let page_count = source.page_count();
        let mut counts = Vec::with_capacity(page_count);
        let mut pages_text = Vec::with_capacity(page_count);

        for page in 0..page_count {
            let count = match source.page_runs(page) {
                Ok(runs) => runs.iter().map(count_run_words).sum(),
                Err(e) => {
                    warn!("Failed to read text runs of page {}: {}", page, e);
                    0
                }
            };
            counts.push(count);

            match source.page_text(page) {
                Ok(text) => pages_text.push(text.trim().to_string()),
                Err(e) => warn!("Failed to read text of page {}: {}", page, e),
            }
        }

        let index = Self::from_page_counts(counts, pages_text.join("\n\n"));
        debug!(
            "Indexed {} pages, {} words",
            index.page_count(),
            index.total_words
        );
        index
    }

    pub fn page_count(&self) -> usize {
        self.page_word_offsets.len()
    }

    /// Global index of the first word on `page`
    pub fn page_offset(&self, page: usize) -> Option<usize> {
        self.page_word_offsets.get(page).copied()
    }

    /// Page holding global word `word`; past-the-end words map to the last page
    pub fn page_for_word(&self, word: usize) -> usize {
        page_for_word(&self.page_word_offsets, word)
    }

    /// `(page, local index)` for a global word index
    pub fn locate(&self, word: usize) -> (usize, usize) {
        let page = self.page_for_word(word);
        let offset = self.page_offset(page).unwrap_or(0);
        (page, word.saturating_sub(offset))
    }

    /// Global index for a word on a page
    pub fn global_index(&self, page: usize, local: usize) -> usize {
        self.page_offset(page).unwrap_or(self.total_words) + local
    }
}

/// Last page whose starting offset is `<= word`
pub fn page_for_word(offsets: &[usize], word: usize) -> usize {
    offsets
        .iter()
        .rposition(|&offset| offset <= word)
        .unwrap_or(0)
}
