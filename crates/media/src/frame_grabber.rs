use std::path::Path;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;

use crate::gst_init::*;

pub trait FrameGrabber {
    /// Frame at (or just after) `time_seconds`, in the source's aspect ratio.
    fn seek_and_capture(&mut self, time_seconds: f64) -> Result<image::RgbaImage, String>;

    fn release(&mut self);
}

pub struct GstFrameGrabber {
    guard: Option<PipelineGuard>,
    appsink: gst_app::AppSink,
    bus: gst::Bus,
    duration_secs: Option<f64>,
}

impl GstFrameGrabber {
    /// Opens `path` scaled to frames `target_h` pixels tall.
    pub fn open(path: &Path, target_h: u32) -> Result<Self, String> {
        init_once()?;

        let pipeline = gst::Pipeline::new();
        let guard = PipelineGuard(pipeline.clone());

        let filesrc = make_filesrc(path)?;
        let decodebin = make_element("decodebin")?;
        let videoconvert = make_element("videoconvert")?;
        let videoscale = make_element("videoscale")?;
        let appsink = gst_app::AppSink::builder()
            .caps(&build_video_caps(target_h.max(1)))
            .sync(false)
            .max_buffers(1)
            .drop(true)
            .build();

        pipeline
            .add_many([
                &filesrc,
                &decodebin,
                &videoconvert,
                &videoscale,
                appsink.upcast_ref::<gst::Element>(),
            ])
            .map_err(|e| format!("Failed to add elements: {e}"))?;
        gst::Element::link_many([&filesrc, &decodebin])
            .map_err(|e| format!("Failed to link filesrc->decodebin: {e}"))?;
        gst::Element::link_many([
            &videoconvert,
            &videoscale,
            appsink.upcast_ref::<gst::Element>(),
        ])
        .map_err(|e| format!("Failed to link video chain: {e}"))?;

        connect_decodebin_video_only(&decodebin, &videoconvert);

        pipeline
            .set_state(gst::State::Paused)
            .map_err(|e| format!("Failed to set Paused: {e}"))?;
        let bus = pipeline.bus().ok_or_else(|| "No bus".to_string())?;
        wait_for_async_done(&bus, gst::ClockTime::from_seconds(10))
            .map_err(|e| format!("Preroll error: {e}"))?;

        let duration_secs = pipeline
            .query_duration::<gst::ClockTime>()
            .map(clock_to_seconds);

        Ok(Self {
            guard: Some(guard),
            appsink,
            bus,
            duration_secs,
        })
    }
}

impl FrameGrabber for GstFrameGrabber {
    fn seek_and_capture(&mut self, time_seconds: f64) -> Result<image::RgbaImage, String> {
        let Some(guard) = &self.guard else {
            return Err("frame grabber already released".to_string());
        };

        // Seeking exactly to the end yields no frame; back off by one tick.
        let mut target = time_seconds.max(0.0);
        if let Some(d) = self.duration_secs {
            target = target.min((d - 0.001).max(0.0));
        }

        guard
            .0
            .seek_simple(
                gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
                seconds_to_clock(target),
            )
            .map_err(|e| format!("seek to {target:.3}s failed: {e}"))?;
        wait_for_async_done(&self.bus, gst::ClockTime::from_seconds(5))
            .map_err(|e| format!("seek to {target:.3}s failed: {e}"))?;

        let sample = self
            .appsink
            .try_pull_preroll(gst::ClockTime::from_seconds(5))
            .ok_or_else(|| format!("no frame at {target:.3}s"))?;
        sample_to_rgba(&sample)
    }

    fn release(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
    }
}

fn sample_to_rgba(sample: &gst::Sample) -> Result<image::RgbaImage, String> {
    let caps = sample.caps().ok_or_else(|| "frame without caps".to_string())?;
    let info = gst_video::VideoInfo::from_caps(caps)
        .map_err(|e| format!("unreadable video caps: {e}"))?;
    let buffer = sample
        .buffer()
        .ok_or_else(|| "frame without buffer".to_string())?;
    let map = buffer
        .map_readable()
        .map_err(|e| format!("frame not readable: {e}"))?;

    let width = info.width();
    let height = info.height();
    if width == 0 || height == 0 {
        return Err("empty frame".to_string());
    }
    let stride = info.stride()[0] as usize;
    let row_bytes = width as usize * 4;
    let data = map.as_slice();
    if stride < row_bytes || data.len() < stride * (height as usize - 1) + row_bytes {
        return Err(format!("short frame buffer ({} bytes)", data.len()));
    }

    let mut rgba = Vec::with_capacity(row_bytes * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        rgba.extend_from_slice(&row[..row_bytes]);
    }
    image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| "frame size mismatch".to_string())
}
