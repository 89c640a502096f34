use mupdf::{Page, Quad, TextPage, TextPageOptions};

use super::document::PdfDocument;
use crate::error::{Error, Result};
use crate::geometry::TextRun;

/// Axis-aligned box in mupdf page space (origin top-left, Y down)
#[derive(Debug, Clone, Copy, PartialEq)]
struct LineBox {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl LineBox {
    fn from_quad(quad: &Quad) -> Self {
        Self {
            x0: quad.ul.x.min(quad.ur.x).min(quad.ll.x).min(quad.lr.x),
            y0: quad.ul.y.min(quad.ur.y).min(quad.ll.y).min(quad.lr.y),
            x1: quad.ul.x.max(quad.ur.x).max(quad.ll.x).max(quad.lr.x),
            y1: quad.ul.y.max(quad.ur.y).max(quad.ll.y).max(quad.lr.y),
        }
    }

    fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Reads a page's text layout as runs and plain text
pub struct TextExtractor<'a> {
    pub doc: &'a PdfDocument,
}

impl<'a> TextExtractor<'a> {
    pub const fn new(doc: &'a PdfDocument) -> Self {
        Self { doc }
    }

    /// One run per laid-out line, in native bottom-left coordinates
    pub fn page_runs(&self, page_num: usize) -> Result<Vec<TextRun>> {
        let doc = self.doc.open_document()?;
        let page = self.doc.load_page(&doc, page_num)?;
        Self::runs_from_page(&page, page_num)
    }

    pub(crate) fn runs_from_page(page: &Page, page_num: usize) -> Result<Vec<TextRun>> {
        let bounds = page.bounds().map_err(|e| Error::PdfTextExtraction {
            page: page_num,
            reason: format!("Failed to get bounds: {e}"),
        })?;
        let text_page = text_page(page, page_num)?;
        let page_height = bounds.y1 - bounds.y0;

        let mut runs = Vec::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let mut text = String::new();
                let mut line_box: Option<LineBox> = None;

                for text_char in line.chars() {
                    if let Some(c) = text_char.char() {
                        text.push(c);
                    }
                    let char_box = LineBox::from_quad(&text_char.quad());
                    line_box = Some(line_box.map_or(char_box, |b| b.union(char_box)));
                }

                let Some(line_box) = line_box else {
                    continue;
                };
                if text.trim().is_empty() {
                    continue;
                }

                // Flip into bottom-left space: the run origin is the line's lower-left corner
                let x = line_box.x0 - bounds.x0;
                let y = page_height - (line_box.y1 - bounds.y0);
                runs.push(TextRun::new(
                    text,
                    x,
                    y,
                    line_box.x1 - line_box.x0,
                    line_box.y1 - line_box.y0,
                ));
            }
        }
        Ok(runs)
    }

    /// Page text with lines on their own rows and blocks separated by blank lines
    pub fn page_text(&self, page_num: usize) -> Result<String> {
        let doc = self.doc.open_document()?;
        let page = self.doc.load_page(&doc, page_num)?;
        let text_page = text_page(&page, page_num)?;

        let mut blocks = Vec::new();
        for block in text_page.blocks() {
            let lines: Vec<String> = block
                .lines()
                .map(|line| line.chars().filter_map(|c| c.char()).collect::<String>())
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect();
            if !lines.is_empty() {
                blocks.push(lines.join("\n"));
            }
        }
        Ok(blocks.join("\n\n"))
    }
}

fn text_page(page: &Page, page_num: usize) -> Result<TextPage> {
    page.to_text_page(TextPageOptions::empty())
        .map_err(|e| Error::PdfTextExtraction {
            page: page_num,
            reason: format!("Failed to get text page: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mupdf::Point;

    #[test]
    fn test_line_box_covers_rotated_quad() {
        let quad = Quad {
            ul: Point { x: 12.0, y: 5.0 },
            ur: Point { x: 30.0, y: 3.0 },
            ll: Point { x: 10.0, y: 15.0 },
            lr: Point { x: 28.0, y: 13.0 },
        };
        let b = LineBox::from_quad(&quad);
        assert_eq!(
            b,
            LineBox {
                x0: 10.0,
                y0: 3.0,
                x1: 30.0,
                y1: 15.0
            }
        );

        let other = LineBox {
            x0: 40.0,
            y0: 4.0,
            x1: 50.0,
            y1: 16.0,
        };
        assert_eq!(
            b.union(other),
            LineBox {
                x0: 10.0,
                y0: 3.0,
                x1: 50.0,
                y1: 16.0
            }
        );
    }
}
