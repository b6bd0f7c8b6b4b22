use std::path::Path;
use std::sync::OnceLock;

use gstreamer as gst;
use gstreamer::prelude::*;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

pub fn init_once() -> Result<(), String> {
    INIT.get_or_init(|| {
        gst::init().map_err(|e| format!("Failed to initialize GStreamer: {e}"))
    })
    .clone()
}

/// Owns a pipeline and drops it to `Null` however the owner exits, so no
/// decoder stays open after a failed or cancelled run.
pub(crate) struct PipelineGuard(pub(crate) gst::Pipeline);

impl PipelineGuard {
    pub(crate) fn release(&self) {
        let _ = self.0.set_state(gst::State::Null);
        let _ = self.0.state(gst::ClockTime::from_seconds(2));
    }
}

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        self.release();
    }
}

pub(crate) fn wait_for_async_done(bus: &gst::Bus, timeout: gst::ClockTime) -> Result<(), String> {
    loop {
        let Some(msg) = bus.timed_pop(timeout) else {
            return Ok(());
        };
        match msg.view() {
            gst::MessageView::AsyncDone(_) => return Ok(()),
            gst::MessageView::Error(err) => {
                return Err(format!("{}", err.error()));
            }
            _ => {}
        }
    }
}

pub(crate) fn pending_bus_error(bus: &gst::Bus) -> Option<String> {
    while let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error]) {
        if let gst::MessageView::Error(err) = msg.view() {
            return Some(format!("{}", err.error()));
        }
    }
    None
}

pub(crate) fn build_video_caps(target_h: u32) -> gst::Caps {
    use gstreamer_video as gst_video;
    gst_video::VideoCapsBuilder::new()
        .format(gst_video::VideoFormat::Rgba)
        .height(target_h as i32)
        .pixel_aspect_ratio(gst::Fraction::new(1, 1))
        .build()
}

// Channel layout is left to the source; the reference channel is picked out
// after decoding.
pub(crate) fn build_audio_caps(rate: u32) -> gst::Caps {
    gst::Caps::builder("audio/x-raw")
        .field("format", "F32LE")
        .field("layout", "interleaved")
        .field("rate", rate as i32)
        .build()
}

pub(crate) fn make_element(factory_name: &str) -> Result<gst::Element, String> {
    gst::ElementFactory::make(factory_name)
        .build()
        .map_err(|e| format!("Failed to create {factory_name}: {e}"))
}

pub(crate) fn make_filesrc(path: &Path) -> Result<gst::Element, String> {
    let location = path
        .to_str()
        .ok_or_else(|| "Invalid path encoding".to_string())?;
    gst::ElementFactory::make("filesrc")
        .property("location", location)
        .build()
        .map_err(|e| format!("Failed to create filesrc: {e}"))
}

fn link_first_pad_of_kind(src_pad: &gst::Pad, target: &gst::Element, media_prefix: &str) {
    let caps = match src_pad.current_caps() {
        Some(c) => c,
        None => src_pad.query_caps(None),
    };
    let Some(structure) = caps.structure(0) else {
        return;
    };
    if !structure.name().as_str().starts_with(media_prefix) {
        return;
    }
    let Some(sink_pad) = target.static_pad("sink") else {
        log::warn!("{} has no sink pad", target.name());
        return;
    };
    if !sink_pad.is_linked() {
        if let Err(e) = src_pad.link(&sink_pad) {
            log::warn!("failed to link decoded {media_prefix} pad: {e:?}");
        }
    }
}

pub(crate) fn connect_decodebin_video_only(decodebin: &gst::Element, videoconvert: &gst::Element) {
    let videoconvert_weak = videoconvert.downgrade();
    decodebin.connect_pad_added(move |_dbin, src_pad| {
        if let Some(vc) = videoconvert_weak.upgrade() {
            link_first_pad_of_kind(src_pad, &vc, "video/");
        }
    });
}

pub(crate) fn connect_decodebin_audio_only(decodebin: &gst::Element, audioconvert: &gst::Element) {
    let audioconvert_weak = audioconvert.downgrade();
    decodebin.connect_pad_added(move |_dbin, src_pad| {
        if let Some(aconv) = audioconvert_weak.upgrade() {
            link_first_pad_of_kind(src_pad, &aconv, "audio/");
        }
    });
}

pub(crate) fn seconds_to_clock(seconds: f64) -> gst::ClockTime {
    gst::ClockTime::from_nseconds((seconds.max(0.0) * 1_000_000_000.0) as u64)
}

pub(crate) fn clock_to_seconds(time: gst::ClockTime) -> f64 {
    time.nseconds() as f64 / 1_000_000_000.0
}
