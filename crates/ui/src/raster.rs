use image::{Rgba, RgbaImage};

pub struct Surface {
    dpr: f32,
    pixels: RgbaImage,
}

impl Surface {
    pub fn new(logical_width: f32, logical_height: f32, dpr: f32) -> Self {
        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        let logical_width = logical_width.max(0.0);
        let logical_height = logical_height.max(0.0);
        let w = (logical_width * dpr).ceil() as u32;
        let h = (logical_height * dpr).ceil() as u32;
        Self {
            dpr,
            pixels: RgbaImage::new(w.max(1), h.max(1)),
        }
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    /// Fills a logical rectangle, clipped to the surface. Every non-empty
    /// rectangle covers at least one physical pixel in each direction.
    pub fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba<u8>) {
        let (w, h) = self.pixels.dimensions();
        let Some((px0, px1)) = span(x0.min(x1), x0.max(x1), self.dpr, w) else {
            return;
        };
        let Some((py0, py1)) = span(y0.min(y1), y0.max(y1), self.dpr, h) else {
            return;
        };
        for y in py0..py1 {
            for x in px0..px1 {
                self.pixels.put_pixel(x, y, color);
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        (x < self.pixels.width() && y < self.pixels.height()).then(|| *self.pixels.get_pixel(x, y))
    }

    pub fn to_color_image(&self) -> egui::ColorImage {
        let (w, h) = self.pixels.dimensions();
        egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], self.pixels.as_raw())
    }
}

fn span(lo: f32, hi: f32, dpr: f32, limit: u32) -> Option<(u32, u32)> {
    if !(lo.is_finite() && hi.is_finite()) || limit == 0 || hi < 0.0 {
        return None;
    }
    let start = (lo * dpr).floor().max(0.0) as u32;
    let mut end = ((hi * dpr).ceil().max(0.0) as u32).min(limit);
    if start >= limit {
        return None;
    }
    if end <= start {
        end = start + 1;
    }
    Some((start, end))
}
