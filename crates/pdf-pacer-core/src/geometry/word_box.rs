use serde::{Deserialize, Serialize};

/// One word's layout on a rendered page, in page-pixel space (origin top-left)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    /// Literal word, punctuation included
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    /// Approximates the line height at this position
    pub height: f32,
}

impl WordBox {
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Euclidean distance from a point to this box's center
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        let (cx, cy) = self.center();
        (x - cx).hypot(y - cy)
    }

    /// Whether this box sits on the line whose top is `line_y`
    pub fn on_line(&self, line_y: f32, tolerance: f32) -> bool {
        (self.y - line_y).abs() <= tolerance
    }

    /// Strict horizontal overlap; touching edges do not count
    pub fn overlaps_x(&self, other: &Self) -> bool {
        self.x < other.right() && other.x < self.right()
    }
}

/// Word geometry for one rendered page at one scale
///
/// Replaced wholesale whenever the page or zoom changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// 0-based page index
    pub page: usize,
    /// Rendered page width in pixels
    pub width: f32,
    /// Rendered page height in pixels
    pub height: f32,
    /// Pixels per PDF point used for this render
    pub scale: f32,
    /// Words in reading order
    pub words: Vec<WordBox>,
}

impl PageGeometry {
    pub const fn new(page: usize, width: f32, height: f32, scale: f32, words: Vec<WordBox>) -> Self {
        Self {
            page,
            width,
            height,
            scale,
            words,
        }
    }

    pub const fn len(&self) -> usize {
        self.words.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, index: usize) -> Option<&WordBox> {
        self.words.get(index)
    }

    /// Words on the line whose top is `line_y`
    pub fn line_words(&self, line_y: f32, tolerance: f32) -> impl Iterator<Item = &WordBox> {
        self.words.iter().filter(move |w| w.on_line(line_y, tolerance))
    }

    /// Right edge of the last word on the line, if the line has any words
    pub fn line_end(&self, line_y: f32, tolerance: f32) -> Option<f32> {
        self.line_words(line_y, tolerance)
            .map(WordBox::right)
            .reduce(f32::max)
    }

    /// First word (in reading order) whose top is strictly below `line_y + threshold`
    pub fn next_line_after(&self, line_y: f32, threshold: f32) -> Option<&WordBox> {
        self.words.iter().find(|w| w.y > line_y + threshold)
    }

    /// Mean word width, or `fallback` when there is nothing to measure
    #[allow(clippy::cast_precision_loss)] // word counts stay far below f32 precision limits
    pub fn average_word_width(&self, fallback: f32) -> f32 {
        if self.words.is_empty() {
            return fallback;
        }
        let total: f32 = self.words.iter().map(|w| w.width).sum();
        let average = total / self.words.len() as f32;
        if average > 0.0 && average.is_finite() {
            average
        } else {
            fallback
        }
    }

    /// Index of the word whose center is closest to the point
    pub fn nearest_word(&self, x: f32, y: f32) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance_to(x, y).total_cmp(&b.distance_to(x, y)))
            .map(|(index, _)| index)
    }

    /// Joined text of every word, one line per band
    pub fn text(&self, tolerance: f32) -> String {
        let mut out = String::new();
        let mut line_y: Option<f32> = None;
        for word in &self.words {
            match line_y {
                Some(y) if word.on_line(y, tolerance) => out.push(' '),
                Some(_) => out.push('\n'),
                None => {}
            }
            if line_y.is_none_or(|y| !word.on_line(y, tolerance)) {
                line_y = Some(word.y);
            }
            out.push_str(&word.text);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PageGeometry {
        PageGeometry::new(
            0,
            400.0,
            600.0,
            1.0,
            vec![
                WordBox::new("Перший", 20.0, 10.0, 50.0, 20.0),
                WordBox::new("другий", 80.0, 10.0, 50.0, 20.0),
                WordBox::new("третій", 140.0, 10.0, 50.0, 20.0),
                WordBox::new("далі", 20.0, 40.0, 40.0, 20.0),
            ],
        )
    }

    #[test]
    fn test_line_end_uses_last_word_on_line() {
        let geometry = sample();
        assert_eq!(geometry.line_end(10.0, 4.0), Some(190.0));
        assert_eq!(geometry.line_end(12.0, 4.0), Some(190.0));
        assert_eq!(geometry.line_end(25.0, 4.0), None);
    }

    #[test]
    fn test_next_line_after() {
        let geometry = sample();
        let next = geometry.next_line_after(10.0, 2.0).map(|w| w.text.as_str());
        assert_eq!(next, Some("далі"));
        assert!(geometry.next_line_after(40.0, 2.0).is_none());
    }

    #[test]
    fn test_nearest_word_by_center() {
        let geometry = sample();
        assert_eq!(geometry.nearest_word(100.0, 22.0), Some(1));
        assert_eq!(geometry.nearest_word(0.0, 100.0), Some(3));
        assert_eq!(PageGeometry::default().nearest_word(1.0, 1.0), None);
    }

    #[test]
    fn test_average_word_width_fallback() {
        assert!((sample().average_word_width(40.0) - 47.5).abs() < f32::EPSILON);
        assert!((PageGeometry::default().average_word_width(40.0) - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_text_breaks_lines() {
        assert_eq!(sample().text(4.0), "Перший другий третій\nдалі");
    }
}
