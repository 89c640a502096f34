use serde::{Deserialize, Serialize};

use super::RevealState;
use crate::config::AnimatorConfig;
use crate::geometry::PageGeometry;

/// Axis-aligned rectangle in page-pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl MaskRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Region of the page already read, drawn over the page every frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowMask {
    pub page_width: f32,
    pub page_height: f32,
    /// Full-width band above the current line
    pub above: Option<MaskRect>,
    /// Revealed part of the current line, extended into the gap below it
    pub line: Option<MaskRect>,
}

impl ShadowMask {
    pub fn rects(&self) -> impl Iterator<Item = &MaskRect> {
        self.above.iter().chain(self.line.iter())
    }

    pub fn covers(&self, x: f32, y: f32) -> bool {
        self.rects().any(|rect| rect.contains(x, y))
    }
}

/// Mask for a reveal position on a page
pub fn compute(state: &RevealState, geometry: &PageGeometry, config: &AnimatorConfig) -> ShadowMask {
    let line_y = state.line_y;
    let line_height = state.line_height;

    let line_end = geometry
        .line_end(line_y, config.line_tolerance)
        .unwrap_or(geometry.width);
    let revealed_x = state.pixel_x.min(line_end);

    let next_line_y = geometry
        .next_line_after(line_y, config.next_line_threshold)
        .map_or(line_y + line_height, |word| word.y);
    let gap_share = ((next_line_y - (line_y + line_height)) * config.shadow_gap_ratio).round();

    ShadowMask {
        page_width: geometry.width,
        page_height: geometry.height,
        above: (line_y > 0.0).then(|| MaskRect::new(0.0, 0.0, geometry.width, line_y)),
        line: (revealed_x > 0.0)
            .then(|| MaskRect::new(0.0, line_y, revealed_x, line_height + gap_share)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WordBox;

    fn geometry() -> PageGeometry {
        PageGeometry::new(
            0,
            400.0,
            600.0,
            1.0,
            vec![
                WordBox::new("one", 30.0, 10.0, 50.0, 20.0),
                WordBox::new("two", 90.0, 10.0, 50.0, 20.0),
                WordBox::new("three", 30.0, 40.0, 50.0, 20.0),
            ],
        )
    }

    #[test]
    fn test_half_gap_below_line() {
        let state = RevealState {
            line_y: 10.0,
            line_height: 20.0,
            pixel_x: 60.0,
            playing: true,
        };
        let mask = compute(&state, &geometry(), &AnimatorConfig::default());

        assert_eq!(mask.above, Some(MaskRect::new(0.0, 0.0, 400.0, 10.0)));
        // gap to next line is 40 - 30 = 10, half of it is 5
        assert_eq!(mask.line, Some(MaskRect::new(0.0, 10.0, 60.0, 25.0)));
        assert!(mask.covers(59.0, 34.0));
        assert!(!mask.covers(61.0, 20.0));
    }

    #[test]
    fn test_clamped_to_line_end_and_no_gap_on_last_line() {
        let state = RevealState {
            line_y: 40.0,
            line_height: 20.0,
            pixel_x: 500.0,
            playing: false,
        };
        let mask = compute(&state, &geometry(), &AnimatorConfig::default());
        assert_eq!(mask.line, Some(MaskRect::new(0.0, 40.0, 80.0, 20.0)));
    }

    #[test]
    fn test_nothing_revealed_at_top() {
        let mask = compute(&RevealState::default(), &geometry(), &AnimatorConfig::default());
        assert!(mask.above.is_none());
        assert!(mask.line.is_none());
        assert_eq!(mask.rects().count(), 0);
    }
}
