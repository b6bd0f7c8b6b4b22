use crate::mapper::CoordinateMapper;

pub const ZOOM_MIN: f32 = 1.0;

/// Measured drawable area of the track lanes.
///
/// `track_width` is the width of the lane itself, never of a container that
/// also holds the track header gutter. Every mapper, generator and hit-test
/// derives its width from this value through [`Viewport::content_width`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub track_width: f32,
    pub track_height: f32,
    pub zoom: f32,
    pub scroll_x: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            track_width: 0.0,
            track_height: 0.0,
            zoom: ZOOM_MIN,
            scroll_x: 0.0,
        }
    }
}

impl Viewport {
    pub fn new(track_width: f32, track_height: f32) -> Self {
        Self {
            track_width,
            track_height,
            ..Self::default()
        }
    }

    pub fn is_measured(&self) -> bool {
        self.track_width > 0.0 && self.track_height > 0.0
    }

    pub fn content_width(&self) -> f64 {
        self.track_width.max(0.0) as f64 * self.zoom as f64
    }

    pub fn mapper(&self, duration: f64) -> CoordinateMapper {
        CoordinateMapper::new(duration, self.content_width())
    }

    pub fn max_scroll(&self) -> f32 {
        (self.content_width() as f32 - self.track_width).max(0.0)
    }

    pub fn content_x(&self, local_x: f32) -> f64 {
        local_x as f64 + self.scroll_x as f64
    }

    pub fn local_x(&self, content_x: f64) -> f32 {
        (content_x - self.scroll_x as f64) as f32
    }

    /// Resizes the lane. Scroll is rescaled so the same fraction of the strip
    /// stays at the left edge.
    pub fn resize(&mut self, track_width: f32, track_height: f32) {
        let old_content = self.content_width();
        let fraction = if old_content > 0.0 {
            self.scroll_x as f64 / old_content
        } else {
            0.0
        };
        self.track_width = track_width.max(0.0);
        self.track_height = track_height.max(0.0);
        self.scroll_x = (fraction * self.content_width()) as f32;
        self.clamp_scroll();
    }

    pub fn scroll_by(&mut self, dx: f32) {
        self.scroll_x += dx;
        self.clamp_scroll();
    }

    /// Multiplies zoom by `factor`, keeping the point under `anchor_local_x`
    /// fixed on screen.
    pub fn zoom_at(&mut self, factor: f32, anchor_local_x: f32, zoom_max: f32) {
        if !(factor > 0.0) || self.track_width <= 0.0 {
            return;
        }
        let old_content = self.content_width();
        let anchor = anchor_local_x.clamp(0.0, self.track_width);
        let fraction = self.content_x(anchor) / old_content;

        self.zoom = (self.zoom * factor).clamp(ZOOM_MIN, zoom_max.max(ZOOM_MIN));
        self.scroll_x = (fraction * self.content_width()) as f32 - anchor;
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        self.scroll_x = self.scroll_x.clamp(0.0, self.max_scroll());
    }
}
