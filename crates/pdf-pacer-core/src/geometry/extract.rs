use serde::{Deserialize, Serialize};
use tracing::trace;

use super::word_box::WordBox;

/// Words whose tops are this close share a line band
pub const LINE_TOLERANCE_PX: f32 = 4.0;

/// A run of text as reported by the document's text layout
///
/// Coordinates are in native document space: origin bottom-left, Y grows up,
/// units are PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// `[scale_x, skew_y, skew_x, scale_y, translate_x, translate_y]`
    pub transform: [f32; 6],
    /// Advance width of the whole run
    pub width: f32,
    pub height: f32,
}

impl TextRun {
    /// Axis-aligned run whose baseline-left corner sits at `(x, y)`
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            text: text.into(),
            transform: [1.0, 0.0, 0.0, height, x, y],
            width,
            height,
        }
    }

    pub const fn origin(&self) -> (f32, f32) {
        (self.transform[4], self.transform[5])
    }

    /// Reported height, or the vertical scale when the height is missing
    pub fn effective_height(&self) -> f32 {
        let height = self.height.abs();
        if height > 0.0 {
            height
        } else {
            self.transform[3].abs()
        }
    }
}

/// A piece of a run's string: either a word or a stretch of whitespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Word(&'a str),
    Space(usize),
}

/// Split a run into words and whitespace runs, keeping their order
fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut spaces = 0;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(start) = word_start.take() {
                out.push(Segment::Word(&text[start..i]));
            }
            spaces += 1;
        } else {
            if spaces > 0 {
                out.push(Segment::Space(spaces));
                spaces = 0;
            }
            word_start.get_or_insert(i);
        }
    }
    if let Some(start) = word_start {
        out.push(Segment::Word(&text[start..]));
    }
    if spaces > 0 {
        out.push(Segment::Space(spaces));
    }
    out
}

/// Converts text runs of one page into word boxes in page-pixel space
#[derive(Debug, Clone, Copy)]
pub struct WordExtractor {
    /// Pixels per PDF point
    pub scale: f32,
    /// Rendered page height in pixels
    pub page_height: f32,
    /// Band tolerance used to normalize lines
    pub line_tolerance: f32,
}

impl WordExtractor {
    pub const fn new(scale: f32, page_height: f32) -> Self {
        Self {
            scale,
            page_height,
            line_tolerance: LINE_TOLERANCE_PX,
        }
    }

    #[must_use]
    pub const fn with_line_tolerance(mut self, tolerance: f32) -> Self {
        self.line_tolerance = tolerance;
        self
    }

    /// Extract ordered word boxes from every run on the page.
    ///
    /// Bad runs are skipped one at a time; the pass itself never fails.
    pub fn extract(&self, runs: &[TextRun]) -> Vec<WordBox> {
        let mut words = Vec::new();
        for run in runs {
            self.push_run_words(run, &mut words);
        }
        band_lines(&mut words, self.line_tolerance);
        words
    }

    #[allow(clippy::cast_precision_loss)] // character counts per run are tiny
    fn push_run_words(&self, run: &TextRun, out: &mut Vec<WordBox>) {
        if run.text.trim().is_empty() {
            return;
        }

        let (native_x, native_y) = run.origin();
        let native_height = run.effective_height();

        let x = native_x * self.scale;
        let y = self.page_height - (native_y + native_height) * self.scale;
        let width = run.width * self.scale;
        let height = native_height * self.scale;

        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            trace!("Skipping run with non-finite geometry: {:?}", run.text);
            return;
        }

        let parts = segments(&run.text);

        // Zero-width runs carry no horizontal information; keep the text as one token
        if width <= 0.0 {
            let joined = run.text.split_whitespace().collect::<Vec<_>>().join(" ");
            out.push(WordBox::new(joined, x, y, 0.0, height));
            return;
        }

        let total_chars: usize = parts
            .iter()
            .map(|part| match part {
                Segment::Word(word) => word.chars().count(),
                Segment::Space(n) => *n,
            })
            .sum();
        let char_width = width / total_chars.max(1) as f32;

        let mut cursor = x;
        for part in parts {
            match part {
                Segment::Word(word) => {
                    let word_width = word.chars().count() as f32 * char_width;
                    out.push(WordBox::new(word, cursor, y, word_width, height));
                    cursor += word_width;
                }
                Segment::Space(n) => cursor += n as f32 * char_width,
            }
        }
    }
}

/// Number of word boxes a run yields under the extractor's rules
pub fn count_run_words(run: &TextRun) -> usize {
    if run.text.trim().is_empty() {
        return 0;
    }
    let finite = [run.transform[4], run.transform[5], run.width, run.effective_height()]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        0
    } else if run.width <= 0.0 {
        1
    } else {
        crate::util::word_count(&run.text)
    }
}

/// Sort into reading order and normalize each line band.
///
/// Words within `tolerance` of a band's first word take that word's `y`,
/// are ordered left to right, and are clipped so that none extends past the
/// next word's left edge.
fn band_lines(words: &mut [WordBox], tolerance: f32) {
    words.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut start = 0;
    while start < words.len() {
        let anchor = words[start].y;
        let mut end = start + 1;
        while end < words.len() && words[end].y - anchor <= tolerance {
            end += 1;
        }

        let band = &mut words[start..end];
        for word in band.iter_mut() {
            word.y = anchor;
        }
        band.sort_by(|a, b| a.x.total_cmp(&b.x));
        for i in 1..band.len() {
            let next_x = band[i].x;
            let prev = &mut band[i - 1];
            if prev.right() > next_x {
                prev.width = (next_x - prev.x).max(0.0);
            }
        }

        start = end;
    }
}

/// Extract word boxes with the default line tolerance
pub fn extract_words(runs: &[TextRun], page_height: f32, scale: f32) -> Vec<WordBox> {
    WordExtractor::new(scale, page_height).extract(runs)
}
