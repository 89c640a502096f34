//! Converting a reading speed into reveal rates.

use std::time::Duration;

use crate::config::AnimatorConfig;
use crate::geometry::PageGeometry;

/// Estimated words on a full line of this page, at least 1
pub fn words_per_line(geometry: &PageGeometry, config: &AnimatorConfig) -> f32 {
    let average = geometry.average_word_width(config.fallback_word_width);
    (geometry.width / (average * config.spacing_factor)).max(1.0)
}

/// Horizontal reveal speed in pixels per second
#[allow(clippy::cast_precision_loss)] // wpm is at most a few thousand
pub fn pixels_per_second(geometry: &PageGeometry, config: &AnimatorConfig, wpm: u32) -> f32 {
    let lines_per_second = wpm as f32 / 60.0 / words_per_line(geometry, config);
    geometry.width * lines_per_second
}

/// Time one word stays on screen in word-by-word mode
pub fn word_interval(wpm: u32) -> Duration {
    Duration::from_nanos(60_000_000_000 / u64::from(wpm.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WordBox;

    #[test]
    fn test_rates_follow_average_word_width() {
        let config = AnimatorConfig::default();
        let geometry = PageGeometry::new(
            0,
            600.0,
            800.0,
            1.0,
            vec![
                WordBox::new("a", 0.0, 0.0, 40.0, 10.0),
                WordBox::new("b", 50.0, 0.0, 60.0, 10.0),
            ],
        );

        // average 50px * 1.5 → 8 words per 600px line
        assert!((words_per_line(&geometry, &config) - 8.0).abs() < 1e-4);
        // 120 wpm → 2 words/s → 0.25 lines/s → 150 px/s
        assert!((pixels_per_second(&geometry, &config, 120) - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_narrow_page_still_one_word_per_line() {
        let config = AnimatorConfig::default();
        let geometry = PageGeometry::new(0, 30.0, 100.0, 1.0, Vec::new());
        assert!((words_per_line(&geometry, &config) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_word_interval() {
        assert_eq!(word_interval(200), Duration::from_millis(300));
        assert_eq!(word_interval(60), Duration::from_secs(1));
    }
}
