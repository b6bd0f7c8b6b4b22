use std::path::Path;

use gst_pbutils::prelude::DiscovererStreamInfoExt;
use gstreamer as gst;
use gstreamer_pbutils as gst_pbutils;
use narrate_state::source::MediaLocator;

use crate::error::{MediaError, MediaResult};
use crate::gst_init::{clock_to_seconds, init_once};

#[derive(Debug, Clone, Default)]
pub struct MediaMetadata {
    pub duration: Option<f64>,
    pub resolution: Option<(u32, u32)>,
    pub codec: Option<String>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Probes a local file or URL for its duration and stream layout.
pub fn probe(locator: &MediaLocator) -> MediaResult<MediaMetadata> {
    init_once().map_err(|e| MediaError::fetch(locator, e))?;

    let uri = match locator {
        MediaLocator::File(path) => url_from_path(path)
            .ok_or_else(|| MediaError::fetch(locator, "cannot resolve path"))?,
        MediaLocator::Url(url) => url.clone(),
    };

    let discoverer = gst_pbutils::Discoverer::new(gst::ClockTime::from_seconds(10))
        .map_err(|e| MediaError::fetch(locator, e.to_string()))?;
    let info = discoverer
        .discover_uri(&uri)
        .map_err(|e| MediaError::fetch(locator, e.to_string()))?;

    let mut meta = MediaMetadata {
        duration: info.duration().map(clock_to_seconds),
        has_audio: !info.audio_streams().is_empty(),
        ..MediaMetadata::default()
    };

    if let Some(stream) = info.video_streams().into_iter().next() {
        meta.has_video = true;
        let w = stream.width();
        let h = stream.height();
        if w > 0 && h > 0 {
            meta.resolution = Some((w, h));
        }
        if let Some(caps) = DiscovererStreamInfoExt::caps(&stream) {
            if let Some(structure) = caps.structure(0) {
                meta.codec = Some(structure.name().as_str().to_string());
            }
        }
    }

    log::debug!(
        "probed {locator}: duration {:?}, video {}, audio {}",
        meta.duration,
        meta.has_video,
        meta.has_audio
    );
    Ok(meta)
}

fn url_from_path(path: &Path) -> Option<String> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    gst::glib::filename_to_uri(&abs, None)
        .ok()
        .map(|uri| uri.to_string())
}
