//! Viewport ownership, content regeneration and click-to-seek.
//!
//! The controller is a plain state machine: callers feed it measurements,
//! sources and worker results, and it answers with [`ContentRequest`]s to
//! run. Every request is keyed on its input tuple, so feeding the same
//! inputs twice does nothing, and every request carries a generation id so
//! results from superseded requests are dropped.

use std::sync::Arc;

use crate::cancel::{CancelToken, GenerationId, GenerationTracker};
use crate::config::TimelineConfig;
use crate::filmstrip::{CellSize, Filmstrip, SlotPlan, ThumbnailSlot};
use crate::mapper::CoordinateMapper;
use crate::peaks::PeakSample;
use crate::source::{MediaSource, SourceId};
use crate::track::{default_tracks, Track, TrackContent, TrackKind, TrackStatus};
use crate::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineStatus {
    Idle,
    Loading,
    Ready,
}

#[derive(Debug, Clone)]
pub struct PeakRequest {
    pub track: TrackKind,
    pub generation: GenerationId,
    pub cancel: CancelToken,
    pub source: MediaSource,
    pub peak_count: usize,
}

#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub generation: GenerationId,
    pub cancel: CancelToken,
    pub source: MediaSource,
    pub duration: f64,
    pub plan: SlotPlan,
    pub cell: CellSize,
    pub dpr: f32,
}

#[derive(Debug, Clone)]
pub enum ContentRequest {
    Peaks(PeakRequest),
    Thumbnails(ThumbnailRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PeakKey {
    source: SourceId,
    revision: u32,
    duration_bits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ThumbKey {
    source: SourceId,
    revision: u32,
    duration_bits: u64,
    width_bits: u64,
    dpr_bits: u32,
    cell_bits: (u32, u32),
}

#[derive(Default)]
struct Lane {
    generation: GenerationTracker,
    peak_key: Option<PeakKey>,
    thumb_key: Option<ThumbKey>,
}

pub struct TimelineController {
    config: TimelineConfig,
    viewport: Viewport,
    dpr: f32,
    duration: f64,
    video: Option<MediaSource>,
    ad_audio: Option<MediaSource>,
    tracks: Vec<Track>,
    lanes: Vec<Lane>,
    layout_revision: u64,
}

impl TimelineController {
    pub fn new(config: TimelineConfig, dpr: f32) -> Self {
        let tracks = default_tracks(config.track_height);
        let lanes = tracks.iter().map(|_| Lane::default()).collect();
        Self {
            config,
            viewport: Viewport::default(),
            dpr: sanitize_dpr(dpr),
            duration: 0.0,
            video: None,
            ad_audio: None,
            tracks,
            lanes,
            layout_revision: 0,
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.dpr
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, kind: TrackKind) -> &Track {
        &self.tracks[lane_index(kind)]
    }

    pub fn video_source(&self) -> Option<&MediaSource> {
        self.video.as_ref()
    }

    pub fn layout_revision(&self) -> u64 {
        self.layout_revision
    }

    /// The one mapper used for drawing, playhead placement and hit-testing.
    pub fn mapper(&self) -> CoordinateMapper {
        self.viewport.mapper(self.duration)
    }

    pub fn status(&self) -> TimelineStatus {
        if self.video.is_none() || !self.viewport.is_measured() || !(self.duration > 0.0) {
            return TimelineStatus::Idle;
        }
        if self.tracks.iter().any(|t| t.status.is_loading()) {
            TimelineStatus::Loading
        } else {
            TimelineStatus::Ready
        }
    }

    pub fn set_sources(
        &mut self,
        video: Option<MediaSource>,
        ad_audio: Option<MediaSource>,
        duration: f64,
    ) -> Vec<ContentRequest> {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        if self.duration != duration {
            self.layout_revision += 1;
        }
        self.video = video;
        self.ad_audio = ad_audio;
        self.duration = duration;
        self.refresh()
    }

    pub fn set_device_pixel_ratio(&mut self, dpr: f32) -> Vec<ContentRequest> {
        let dpr = sanitize_dpr(dpr);
        if dpr == self.dpr {
            return Vec::new();
        }
        self.dpr = dpr;
        self.layout_revision += 1;
        self.refresh()
    }

    pub fn set_viewport(&mut self, track_width: f32, track_height: f32) -> Vec<ContentRequest> {
        if self.viewport.track_width == track_width && self.viewport.track_height == track_height
        {
            return Vec::new();
        }
        log::debug!(
            "viewport resized {}x{} -> {}x{}",
            self.viewport.track_width,
            self.viewport.track_height,
            track_width,
            track_height
        );
        self.viewport.resize(track_width, track_height);
        self.layout_revision += 1;
        self.refresh()
    }

    pub fn zoom_at(&mut self, factor: f32, anchor_local_x: f32) -> Vec<ContentRequest> {
        let before = self.viewport.zoom;
        self.viewport
            .zoom_at(factor, anchor_local_x, self.config.zoom_max);
        if self.viewport.zoom == before {
            return Vec::new();
        }
        self.layout_revision += 1;
        self.refresh()
    }

    pub fn scroll_by(&mut self, dx: f32) {
        self.viewport.scroll_by(dx);
    }

    /// Time under a pointer at `client_x`, given the left edge of the same
    /// lane rect the width was measured from.
    pub fn seek_time_at(&self, client_x: f32, track_left: f32) -> Option<f64> {
        let mapper = self.mapper();
        if mapper.is_degenerate() {
            return None;
        }
        let local_x = (client_x - track_left).clamp(0.0, self.viewport.track_width);
        Some(mapper.x_to_time(self.viewport.content_x(local_x)))
    }

    pub fn handle_click(
        &self,
        client_x: f32,
        track_left: f32,
        mut on_seek: impl FnMut(f64),
    ) -> bool {
        match self.seek_time_at(client_x, track_left) {
            Some(time) => {
                on_seek(time);
                true
            }
            None => false,
        }
    }

    /// Lane-relative x of the playhead, or `None` while it is scrolled out
    /// of view or nothing is mapped.
    pub fn playhead_x(&self, current_time: f64) -> Option<f32> {
        let mapper = self.mapper();
        if mapper.is_degenerate() {
            return None;
        }
        let x = self.viewport.local_x(mapper.time_to_x(current_time));
        (0.0..=self.viewport.track_width).contains(&x).then_some(x)
    }

    pub fn accept_peaks(
        &mut self,
        kind: TrackKind,
        generation: GenerationId,
        peaks: Vec<PeakSample>,
        warning: Option<String>,
    ) -> bool {
        let idx = lane_index(kind);
        if !kind.is_audio() || !self.lanes[idx].generation.is_current(generation) {
            log::debug!("dropping stale peaks for {kind:?}");
            return false;
        }
        let track = &mut self.tracks[idx];
        track.content = TrackContent::Peaks(Some(Arc::from(peaks)));
        track.status = match warning {
            Some(w) => TrackStatus::Warning(w),
            None => TrackStatus::Ready,
        };
        self.layout_revision += 1;
        true
    }

    pub fn fail_peaks(&mut self, kind: TrackKind, generation: GenerationId, message: String) -> bool {
        let idx = lane_index(kind);
        if !self.lanes[idx].generation.is_current(generation) {
            return false;
        }
        log::warn!("{kind:?} waveform unavailable: {message}");
        let track = &mut self.tracks[idx];
        track.clear();
        track.status = TrackStatus::Failed(message);
        true
    }

    pub fn accept_slot(&mut self, generation: GenerationId, slot: ThumbnailSlot) -> bool {
        let idx = lane_index(TrackKind::VideoThumbnails);
        if !self.lanes[idx].generation.is_current(generation) {
            return false;
        }
        match &mut self.tracks[idx].content {
            TrackContent::Slots(strip) => strip.insert(slot),
            TrackContent::Peaks(_) => false,
        }
    }

    /// Closes a thumbnail generation. `error` is set when the loop stopped
    /// early; slots captured before the failure stay visible.
    pub fn finish_thumbnails(&mut self, generation: GenerationId, error: Option<String>) -> bool {
        let idx = lane_index(TrackKind::VideoThumbnails);
        if !self.lanes[idx].generation.is_current(generation) {
            return false;
        }
        let track = &mut self.tracks[idx];
        let filled = track.filmstrip().map(Filmstrip::filled).unwrap_or(0);
        track.status = match error {
            None => TrackStatus::Ready,
            Some(e) if filled > 0 => TrackStatus::Warning(e),
            Some(e) => TrackStatus::Failed(e),
        };
        true
    }

    /// Cancels all in-flight work and forgets content, as on unmount.
    pub fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.generation.cancel();
            lane.peak_key = None;
            lane.thumb_key = None;
        }
        for track in &mut self.tracks {
            track.clear();
            track.status = TrackStatus::Empty;
        }
        self.video = None;
        self.ad_audio = None;
        self.duration = 0.0;
        self.layout_revision += 1;
    }

    fn refresh(&mut self) -> Vec<ContentRequest> {
        let mut requests = Vec::new();
        let measured = self.viewport.is_measured();

        for kind in TrackKind::ALL {
            let source = match kind {
                TrackKind::OriginalAudio | TrackKind::VideoThumbnails => self.video.clone(),
                TrackKind::AdAudio => self.ad_audio.clone(),
            };
            let idx = lane_index(kind);

            let Some(source) = source.filter(|_| self.duration > 0.0) else {
                self.clear_lane(idx);
                continue;
            };

            if kind.is_audio() {
                // Peaks do not depend on width: only the first extraction
                // waits for a measurement, later resizes re-render.
                if !measured && self.lanes[idx].peak_key != Some(self.peak_key(&source)) {
                    self.clear_lane(idx);
                } else if let Some(req) = self.refresh_peaks(kind, source) {
                    requests.push(ContentRequest::Peaks(req));
                }
            } else if !measured {
                self.clear_lane(idx);
            } else if let Some(req) = self.refresh_thumbnails(source) {
                requests.push(ContentRequest::Thumbnails(req));
            }
        }

        requests
    }

    fn clear_lane(&mut self, idx: usize) {
        let lane = &mut self.lanes[idx];
        if lane.peak_key.is_some() || lane.thumb_key.is_some() {
            lane.generation.cancel();
            lane.peak_key = None;
            lane.thumb_key = None;
        }
        let track = &mut self.tracks[idx];
        track.clear();
        track.status = TrackStatus::Empty;
    }

    fn peak_key(&self, source: &MediaSource) -> PeakKey {
        PeakKey {
            source: source.id,
            revision: source.revision,
            duration_bits: self.duration.to_bits(),
        }
    }

    fn refresh_peaks(&mut self, kind: TrackKind, source: MediaSource) -> Option<PeakRequest> {
        let idx = lane_index(kind);
        let key = self.peak_key(&source);
        let lane = &mut self.lanes[idx];
        if lane.peak_key == Some(key) {
            return None;
        }
        lane.peak_key = Some(key);
        let (generation, cancel) = lane.generation.begin();

        let track = &mut self.tracks[idx];
        track.clear();
        track.status = TrackStatus::Loading;
        log::info!(
            "extracting {kind:?} peaks from {} (generation {})",
            source.locator,
            generation.0
        );

        Some(PeakRequest {
            track: kind,
            generation,
            cancel,
            source,
            peak_count: self.config.peak_count,
        })
    }

    fn refresh_thumbnails(&mut self, source: MediaSource) -> Option<ThumbnailRequest> {
        let idx = lane_index(TrackKind::VideoThumbnails);
        let width = self.viewport.content_width();
        let cell = CellSize::new(self.config.cell_width, self.config.cell_height);
        let key = ThumbKey {
            source: source.id,
            revision: source.revision,
            duration_bits: self.duration.to_bits(),
            width_bits: width.to_bits(),
            dpr_bits: self.dpr.to_bits(),
            cell_bits: (cell.width.to_bits(), cell.height.to_bits()),
        };
        let lane = &mut self.lanes[idx];
        if lane.thumb_key == Some(key) {
            return None;
        }
        lane.thumb_key = Some(key);
        let (generation, cancel) = lane.generation.begin();

        let plan = SlotPlan::new(self.duration, width, cell.width);
        let track = &mut self.tracks[idx];
        track.content = TrackContent::Slots(Filmstrip::with_plan(&plan));
        track.status = TrackStatus::Loading;
        log::info!(
            "sampling {} thumbnails from {} (generation {})",
            plan.slots,
            source.locator,
            generation.0
        );

        Some(ThumbnailRequest {
            generation,
            cancel,
            source,
            duration: self.duration,
            plan,
            cell,
            dpr: self.dpr,
        })
    }
}

fn lane_index(kind: TrackKind) -> usize {
    match kind {
        TrackKind::OriginalAudio => 0,
        TrackKind::AdAudio => 1,
        TrackKind::VideoThumbnails => 2,
    }
}

fn sanitize_dpr(dpr: f32) -> f32 {
    if dpr.is_finite() && dpr > 0.0 {
        dpr
    } else {
        1.0
    }
}
