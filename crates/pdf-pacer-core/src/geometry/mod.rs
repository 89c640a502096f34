//! Word geometry: text runs in, ordered word boxes out.

mod extract;
mod index;
mod word_box;

pub use extract::{LINE_TOLERANCE_PX, TextRun, WordExtractor, count_run_words, extract_words};
pub use index::{DocumentIndex, page_for_word};
pub use word_box::{PageGeometry, WordBox};
