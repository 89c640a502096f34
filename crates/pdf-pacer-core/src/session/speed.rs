use crate::config::ReaderConfig;

/// Apply `delta` speed steps; fine steps at or below the threshold, coarse above
pub fn adjust_wpm(wpm: u32, delta: i32, config: &ReaderConfig) -> u32 {
    let step = if wpm <= config.step_threshold {
        config.fine_step
    } else {
        config.coarse_step
    };
    let next = i64::from(wpm) + i64::from(delta) * i64::from(step);
    let next = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
    config.clamp_wpm(next)
}
