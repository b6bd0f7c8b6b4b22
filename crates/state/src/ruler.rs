use crate::config::RulerConfig;

pub fn ruler_interval(duration: f64, config: &RulerConfig) -> f64 {
    if duration > config.long_threshold {
        config.long_interval
    } else if duration > config.medium_threshold {
        config.medium_interval
    } else {
        config.short_interval
    }
}

/// Tick times from `0` in interval steps, always ending with `duration`
/// itself even when it falls between steps.
pub fn ruler_ticks(duration: f64, config: &RulerConfig) -> Vec<f64> {
    if !(duration > 0.0) {
        return vec![0.0];
    }
    let interval = ruler_interval(duration, config);
    if !(interval > 0.0) {
        return vec![0.0, duration];
    }

    let steps = (duration / interval).floor() as usize;
    let mut ticks: Vec<f64> = (0..=steps).map(|i| i as f64 * interval).collect();

    // Drop a step that lands within float noise of the end so the end tick
    // is not duplicated.
    let eps = interval * 1e-9;
    while ticks.last().is_some_and(|&t| t > 0.0 && duration - t < eps) {
        ticks.pop();
    }
    ticks.push(duration);
    ticks
}

pub fn format_timecode(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_clip_uses_five_second_steps() {
        let config = RulerConfig::default();
        assert_eq!(ruler_interval(30.0, &config), 5.0);
        assert_eq!(
            ruler_ticks(30.0, &config),
            vec![0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0]
        );
    }

    #[test]
    fn thresholds_are_exclusive() {
        let config = RulerConfig::default();
        assert_eq!(ruler_interval(60.0, &config), 5.0);
        assert_eq!(ruler_interval(60.5, &config), 10.0);
        assert_eq!(ruler_interval(180.0, &config), 10.0);
        assert_eq!(ruler_interval(181.0, &config), 30.0);
    }

    #[test]
    fn duration_is_always_final_tick() {
        let config = RulerConfig::default();
        assert_eq!(
            ruler_ticks(72.5, &config),
            vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 72.5]
        );
        assert_eq!(ruler_ticks(3.0, &config), vec![0.0, 3.0]);
    }

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_timecode(0.0), "0:00");
        assert_eq!(format_timecode(95.0), "1:35");
        assert_eq!(format_timecode(3725.0), "1:02:05");
    }
}
