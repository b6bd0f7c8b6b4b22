use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use narrate_state::cancel::CancelToken;
use narrate_state::filmstrip::{CellSize, SlotPlan, StillImage, ThumbnailSlot};

use crate::error::{MediaError, MediaResult};
use crate::frame_grabber::FrameGrabber;

pub struct ThumbnailSampler {
    plan: SlotPlan,
    pixel_size: (u32, u32),
}

impl ThumbnailSampler {
    pub fn new(plan: SlotPlan, cell: CellSize, dpr: f32) -> Self {
        Self {
            plan,
            pixel_size: cell.pixel_size(dpr),
        }
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        self.pixel_size
    }

    /// Captures every slot in order, passing each to `sink`. Stops at the
    /// first failing slot; slots already emitted stay valid. The grabber is
    /// released before returning on every path.
    pub fn run<G: FrameGrabber>(
        &self,
        grabber: &mut G,
        cancel: &CancelToken,
        mut sink: impl FnMut(ThumbnailSlot),
    ) -> MediaResult<usize> {
        let result = self.capture_all(grabber, cancel, &mut sink);
        grabber.release();
        result
    }

    fn capture_all<G: FrameGrabber>(
        &self,
        grabber: &mut G,
        cancel: &CancelToken,
        sink: &mut impl FnMut(ThumbnailSlot),
    ) -> MediaResult<usize> {
        let mut emitted = 0;
        for (slot_index, center_time) in self.plan.center_times() {
            if cancel.is_cancelled() {
                return Err(MediaError::Cancelled);
            }

            let frame = grabber
                .seek_and_capture(center_time)
                .map_err(|reason| MediaError::Thumbnail { slot_index, reason })?;
            let image = self
                .encode(frame)
                .map_err(|reason| MediaError::Thumbnail { slot_index, reason })?;

            if cancel.is_cancelled() {
                return Err(MediaError::Cancelled);
            }
            sink(ThumbnailSlot {
                slot_index,
                center_time,
                image,
            });
            emitted += 1;
        }
        log::debug!("captured {emitted} thumbnails");
        Ok(emitted)
    }

    fn encode(&self, frame: RgbaImage) -> Result<StillImage, String> {
        let (width, height) = self.pixel_size;
        let fitted = cover_fit(&frame, width, height)?;
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(fitted)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| format!("PNG encode failed: {e}"))?;
        Ok(StillImage {
            width,
            height,
            png: png.into(),
        })
    }
}

/// Scales `frame` to cover `width` x `height` without distortion and crops
/// the overflow evenly from both sides.
pub fn cover_fit(frame: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, String> {
    let (src_w, src_h) = frame.dimensions();
    if src_w == 0 || src_h == 0 || width == 0 || height == 0 {
        return Err("empty frame".to_string());
    }

    let scale = (width as f64 / src_w as f64).max(height as f64 / src_h as f64);
    let scaled_w = ((src_w as f64 * scale).ceil() as u32).max(width);
    let scaled_h = ((src_h as f64 * scale).ceil() as u32).max(height);
    let scaled = if (scaled_w, scaled_h) == (src_w, src_h) {
        frame.clone()
    } else {
        imageops::resize(frame, scaled_w, scaled_h, FilterType::Nearest)
    };

    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;
    Ok(imageops::crop_imm(&scaled, x, y, width, height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// 16:9 frames whose red channel encodes the requested time.
    struct FakeGrabber {
        seeks: Vec<f64>,
        fail_at: Option<usize>,
        released: bool,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl FakeGrabber {
        fn new() -> Self {
            Self {
                seeks: Vec::new(),
                fail_at: None,
                released: false,
                cancel_after: None,
            }
        }
    }

    impl FrameGrabber for FakeGrabber {
        fn seek_and_capture(&mut self, time: f64) -> Result<RgbaImage, String> {
            assert!(!self.released);
            self.seeks.push(time);
            if self.fail_at == Some(self.seeks.len() - 1) {
                return Err("decoder error".into());
            }
            if let Some((n, token)) = &self.cancel_after {
                if self.seeks.len() == *n {
                    token.cancel();
                }
            }
            Ok(RgbaImage::from_pixel(
                160,
                90,
                Rgba([time.round() as u8, 0, 0, 255]),
            ))
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    fn sampler(duration: f64, width: f64, dpr: f32) -> ThumbnailSampler {
        ThumbnailSampler::new(
            SlotPlan::new(duration, width, 40.0),
            CellSize::new(40.0, 60.0),
            dpr,
        )
    }

    #[test]
    fn captures_every_slot_in_order() {
        let mut grabber = FakeGrabber::new();
        let mut slots = Vec::new();
        let n = sampler(90.0, 325.0, 1.0)
            .run(&mut grabber, &CancelToken::new(), |s| slots.push(s))
            .unwrap();

        assert_eq!(n, 9);
        assert_eq!(grabber.seeks, vec![5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 85.0]);
        assert!(grabber.released);
        let indices: Vec<_> = slots.iter().map(|s| s.slot_index).collect();
        assert_eq!(indices, (0..9).collect::<Vec<_>>());

        let decoded = image::load_from_memory(&slots[3].image.png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (40, 60));
        assert_eq!(decoded.get_pixel(20, 30)[0], 35);
    }

    #[test]
    fn image_size_follows_device_pixel_ratio() {
        let mut grabber = FakeGrabber::new();
        let mut slots = Vec::new();
        sampler(10.0, 40.0, 2.0)
            .run(&mut grabber, &CancelToken::new(), |s| slots.push(s))
            .unwrap();
        let img = &slots[0].image;
        assert_eq!((img.width, img.height), (80, 120));
        let decoded = image::load_from_memory(&img.png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (80, 120));
    }

    #[test]
    fn failure_stops_loop_and_keeps_earlier_slots() {
        let mut grabber = FakeGrabber::new();
        grabber.fail_at = Some(2);
        let mut slots = Vec::new();
        let err = sampler(90.0, 325.0, 1.0)
            .run(&mut grabber, &CancelToken::new(), |s| slots.push(s))
            .unwrap_err();

        assert!(matches!(err, MediaError::Thumbnail { slot_index: 2, .. }));
        assert_eq!(slots.len(), 2);
        assert_eq!(grabber.seeks.len(), 3);
        assert!(grabber.released);
    }

    #[test]
    fn cancellation_emits_nothing_further() {
        let cancel = CancelToken::new();
        let mut grabber = FakeGrabber::new();
        grabber.cancel_after = Some((3, cancel.clone()));
        let mut slots = Vec::new();
        let err = sampler(90.0, 325.0, 1.0)
            .run(&mut grabber, &cancel, |s| slots.push(s))
            .unwrap_err();

        assert!(err.is_cancelled());
        // The third capture finished after cancellation and is discarded.
        assert_eq!(slots.len(), 2);
        assert_eq!(grabber.seeks.len(), 3);
        assert!(grabber.released);
    }

    #[test]
    fn cover_fit_crops_instead_of_stretching() {
        let mut frame = RgbaImage::from_pixel(160, 90, Rgba([0, 0, 255, 255]));
        for y in 0..90 {
            for x in 70..90 {
                frame.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let fitted = cover_fit(&frame, 40, 60).unwrap();
        assert_eq!(fitted.dimensions(), (40, 60));
        // Centre column survives, both sides are cut away.
        assert_eq!(fitted.get_pixel(20, 30)[0], 255);
        assert_eq!(fitted.get_pixel(0, 30)[2], 255);
    }
}
