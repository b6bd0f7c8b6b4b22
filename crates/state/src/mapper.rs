/// Converts a time in seconds to a horizontal pixel offset.
///
/// Returns `0.0` for a degenerate `duration` or `width`. The time is clamped
/// to `[0, duration]` before scaling, so the result always lies in
/// `[0, width]`.
pub fn time_to_x(time: f64, duration: f64, width: f64) -> f64 {
    if !(duration > 0.0) || !(width > 0.0) {
        return 0.0;
    }
    time.clamp(0.0, duration) / duration * width
}

pub fn x_to_time(x: f64, duration: f64, width: f64) -> f64 {
    if !(duration > 0.0) || !(width > 0.0) {
        return 0.0;
    }
    x.clamp(0.0, width) / width * duration
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    duration: f64,
    width: f64,
}

impl CoordinateMapper {
    pub fn new(duration: f64, width: f64) -> Self {
        Self { duration, width }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.duration > 0.0) || !(self.width > 0.0)
    }

    pub fn time_to_x(&self, time: f64) -> f64 {
        time_to_x(time, self.duration, self.width)
    }

    pub fn x_to_time(&self, x: f64) -> f64 {
        x_to_time(x, self.duration, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn time_round_trips_through_pixels() {
        for &(duration, width) in &[(120.0, 325.0), (30.0, 800.0), (3600.5, 1.0)] {
            for t in [0.0, duration / 2.0, duration] {
                let back = x_to_time(time_to_x(t, duration, width), duration, width);
                assert!((back - t).abs() < EPS * duration.max(1.0), "{t} -> {back}");
            }
        }
    }

    #[test]
    fn pixels_round_trip_through_time() {
        let (duration, width) = (90.0, 641.0);
        for x in [0.0, width / 2.0, width] {
            let back = time_to_x(x_to_time(x, duration, width), duration, width);
            assert!((back - x).abs() < EPS * width);
        }
    }

    #[test]
    fn edges_map_to_edges_without_off_by_one() {
        let m = CoordinateMapper::new(42.0, 400.0);
        assert_eq!(m.x_to_time(0.0), 0.0);
        assert_eq!(m.x_to_time(400.0), 42.0);
        assert_eq!(m.time_to_x(42.0), 400.0);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let m = CoordinateMapper::new(10.0, 100.0);
        assert_eq!(m.time_to_x(-3.0), 0.0);
        assert_eq!(m.time_to_x(25.0), 100.0);
        assert_eq!(m.x_to_time(-1.0), 0.0);
        assert_eq!(m.x_to_time(150.0), 10.0);
    }

    #[test]
    fn degenerate_inputs_map_to_zero() {
        assert_eq!(time_to_x(5.0, 0.0, 100.0), 0.0);
        assert_eq!(time_to_x(5.0, 10.0, 0.0), 0.0);
        assert_eq!(x_to_time(50.0, -1.0, 100.0), 0.0);
        assert_eq!(x_to_time(50.0, 10.0, -4.0), 0.0);
        assert_eq!(x_to_time(50.0, f64::NAN, 100.0), 0.0);
        assert!(CoordinateMapper::new(0.0, 10.0).is_degenerate());
    }
}
