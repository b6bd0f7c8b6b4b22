use std::ops::Range;

use image::Rgba;
use narrate_state::config::RulerConfig;
use narrate_state::filmstrip::CellSize;
use narrate_state::mapper::CoordinateMapper;
use narrate_state::peaks::{global_max_abs, normalized, peak_time, PeakSample};
use narrate_state::ruler::ruler_ticks;
use narrate_state::track::{Track, TrackStatus};
use narrate_state::viewport::Viewport;

use crate::raster::Surface;

/// Fraction of the track height a full-scale peak spans.
pub const WAVEFORM_FILL: f32 = 0.9;

/// Room two adjacent ruler labels need: a left-aligned label after its tick
/// and the right-aligned duration label before the end tick.
pub const RULER_LABEL_GAP: f32 = 48.0;

/// Memo key for a waveform raster. The controller's layout revision covers
/// peaks, width, height and pixel ratio; scroll picks the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformKey {
    pub layout_revision: u64,
    pub scroll_bits: u32,
}

impl WaveformKey {
    pub fn new(layout_revision: u64, viewport: &Viewport) -> Self {
        Self {
            layout_revision,
            scroll_bits: viewport.scroll_x.to_bits(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarExtent {
    pub top: f32,
    pub bottom: f32,
}

pub fn bar_extent(peak: PeakSample, global_max: f32, height: f32, scale: f32) -> BarExtent {
    let mid = height / 2.0;
    let half_span = height * WAVEFORM_FILL * scale / 2.0;
    let above = normalized(peak.max, global_max) * half_span;
    let below = normalized(peak.min, global_max) * half_span;
    BarExtent {
        top: (mid - above).max(0.0),
        bottom: (mid + below).min(height),
    }
}

/// Rasterises the visible window of a waveform. `mapper` spans the whole
/// zoomed strip; `scroll_x` and `track_width` select the window.
pub fn render_waveform(
    peaks: &[PeakSample],
    mapper: &CoordinateMapper,
    viewport: &Viewport,
    dpr: f32,
    scale: f32,
    color: Rgba<u8>,
) -> Surface {
    let mut surface = Surface::new(viewport.track_width, viewport.track_height, dpr);
    if peaks.is_empty() || mapper.is_degenerate() {
        return surface;
    }
    log::trace!(
        "rasterising {} peaks into {:?} px at scroll {}",
        peaks.len(),
        surface.pixel_size(),
        viewport.scroll_x
    );

    let count = peaks.len();
    let global_max = global_max_abs(peaks);
    let height = viewport.track_height;
    let px = 1.0 / surface.dpr();
    let bar_w = ((mapper.width() / count as f64) as f32).max(px);

    for (i, peak) in peaks.iter().enumerate() {
        let x = viewport.local_x(mapper.time_to_x(peak_time(i, count, mapper.duration())));
        if x + bar_w < 0.0 || x - bar_w > viewport.track_width {
            continue;
        }
        let mut extent = bar_extent(*peak, global_max, height, scale);
        if extent.bottom - extent.top < px {
            let mid = height / 2.0;
            extent = BarExtent {
                top: mid - px / 2.0,
                bottom: mid + px / 2.0,
            };
        }
        surface.fill_rect(x - bar_w / 2.0, extent.top, x + bar_w / 2.0, extent.bottom, color);
    }
    surface
}

pub fn slot_cell_rect(
    index: usize,
    cell: CellSize,
    track_height: f32,
    scroll_x: f32,
) -> (f32, f32, f32, f32) {
    let x0 = index as f32 * cell.width - scroll_x;
    let y0 = (track_height - cell.height) / 2.0;
    (x0, y0, x0 + cell.width, y0 + cell.height)
}

pub fn visible_slots(count: usize, cell_width: f32, viewport: &Viewport) -> Range<usize> {
    if cell_width <= 0.0 || count == 0 {
        return 0..0;
    }
    let first = (viewport.scroll_x / cell_width).floor().max(0.0) as usize;
    let last = ((viewport.scroll_x + viewport.track_width) / cell_width).ceil() as usize;
    first.min(count)..last.min(count)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulerMark {
    pub local_x: f32,
    pub time: f64,
    pub is_end: bool,
    pub labeled: bool,
}

/// Ruler ticks inside the visible window, in lane-local x. The last step
/// tick loses its label when it sits too close to the duration tick.
pub fn ruler_marks(
    duration: f64,
    mapper: &CoordinateMapper,
    viewport: &Viewport,
    config: &RulerConfig,
) -> Vec<RulerMark> {
    if mapper.is_degenerate() {
        return Vec::new();
    }
    let ticks = ruler_ticks(duration, config);
    let end = ticks.len() - 1;
    let end_x = viewport.local_x(mapper.time_to_x(duration));
    ticks
        .into_iter()
        .enumerate()
        .map(|(i, time)| {
            let local_x = viewport.local_x(mapper.time_to_x(time));
            let crowded = i + 1 == end && end_x - local_x < RULER_LABEL_GAP;
            RulerMark {
                local_x,
                time,
                is_end: i == end && i > 0,
                labeled: !crowded,
            }
        })
        .filter(|m| (0.0..=viewport.track_width).contains(&m.local_x))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneNoticeKind {
    Error,
    Warning,
    Loading,
}

pub fn lane_notice(track: &Track) -> Option<(LaneNoticeKind, String)> {
    match &track.status {
        TrackStatus::Failed(m) => Some((LaneNoticeKind::Error, m.clone())),
        TrackStatus::Warning(m) => Some((LaneNoticeKind::Warning, m.clone())),
        TrackStatus::Loading if track.kind.is_audio() => {
            Some((LaneNoticeKind::Loading, "Extracting waveform…".to_string()))
        }
        TrackStatus::Loading | TrackStatus::Empty | TrackStatus::Ready => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INK: Rgba<u8> = Rgba([10, 200, 10, 255]);

    fn lane(width: f32) -> Viewport {
        Viewport::new(width, 60.0)
    }

    #[test]
    fn full_scale_bar_spans_ninety_percent() {
        let e = bar_extent(PeakSample::new(-1.0, 1.0), 1.0, 60.0, 1.0);
        assert!((e.top - 3.0).abs() < 1e-4);
        assert!((e.bottom - 57.0).abs() < 1e-4);
    }

    #[test]
    fn bars_are_normalized_against_global_max() {
        let e = bar_extent(PeakSample::new(-0.25, 0.5), 0.5, 60.0, 1.0);
        assert!((e.top - 3.0).abs() < 1e-4);
        assert!((e.bottom - 43.5).abs() < 1e-4);
    }

    #[test]
    fn scaled_bars_are_clamped_to_the_surface() {
        let e = bar_extent(PeakSample::new(-1.0, 1.0), 1.0, 60.0, 3.0);
        assert_eq!(e, BarExtent { top: 0.0, bottom: 60.0 });
    }

    #[test]
    fn waveform_raster_has_dpr_pixel_size() {
        let vp = lane(100.0);
        let peaks = vec![PeakSample::new(-0.5, 0.5); 10];
        let s = render_waveform(&peaks, &vp.mapper(10.0), &vp, 2.0, 1.0, INK);
        assert_eq!(s.pixel_size(), (200, 120));
    }

    #[test]
    fn middle_peak_lands_at_mapped_x() {
        let vp = lane(100.0);
        let peaks = vec![
            PeakSample::default(),
            PeakSample::new(-1.0, 1.0),
            PeakSample::default(),
        ];
        let s = render_waveform(&peaks, &vp.mapper(10.0), &vp, 1.0, 1.0, INK);
        assert_eq!(s.pixel(50, 30), Some(INK));
        assert_eq!(s.pixel(50, 4), Some(INK));
        assert_eq!(s.pixel(50, 1).map(|p| p[3]), Some(0));
        assert_eq!(s.pixel(25, 10).map(|p| p[3]), Some(0));
    }

    #[test]
    fn zoomed_raster_shows_scrolled_window() {
        let mut vp = lane(100.0);
        vp.zoom_at(2.0, 0.0, 16.0);
        vp.scroll_by(100.0);
        let peaks = vec![
            PeakSample::default(),
            PeakSample::default(),
            PeakSample::new(-1.0, 1.0),
        ];
        let s = render_waveform(&peaks, &vp.mapper(10.0), &vp, 1.0, 1.0, INK);
        // Last peak sits on the right edge of the 200pt strip.
        assert_eq!(s.pixel(99, 30), Some(INK));
    }

    #[test]
    fn degenerate_mapping_draws_nothing() {
        let vp = lane(100.0);
        let peaks = vec![PeakSample::new(-1.0, 1.0); 4];
        let s = render_waveform(&peaks, &vp.mapper(0.0), &vp, 1.0, 1.0, INK);
        assert_eq!(s.pixel(0, 30).map(|p| p[3]), Some(0));
    }

    #[test]
    fn cells_flow_left_to_right_and_centre_vertically() {
        let cell = CellSize::new(40.0, 40.0);
        assert_eq!(slot_cell_rect(0, cell, 60.0, 0.0), (0.0, 10.0, 40.0, 50.0));
        assert_eq!(slot_cell_rect(3, cell, 60.0, 0.0), (120.0, 10.0, 160.0, 50.0));
        assert_eq!(slot_cell_rect(3, cell, 60.0, 100.0).0, 20.0);
    }

    #[test]
    fn visible_slots_follow_scroll() {
        let mut vp = lane(100.0);
        assert_eq!(visible_slots(9, 40.0, &vp), 0..3);
        vp.zoom_at(4.0, 0.0, 16.0);
        vp.scroll_by(130.0);
        assert_eq!(visible_slots(10, 40.0, &vp), 3..6);
        assert_eq!(visible_slots(0, 40.0, &vp), 0..0);
    }

    #[test]
    fn ruler_marks_end_on_duration() {
        let vp = lane(300.0);
        let marks = ruler_marks(30.0, &vp.mapper(30.0), &vp, &RulerConfig::default());
        assert_eq!(marks.len(), 7);
        assert_eq!(marks[0].local_x, 0.0);
        assert_eq!(marks[6].time, 30.0);
        assert!((marks[6].local_x - 300.0).abs() < 1e-3);
        assert!(marks.iter().all(|m| m.labeled));
        assert!(marks[6].is_end);
        assert!(!marks[5].is_end);
    }

    #[test]
    fn step_label_next_to_duration_is_dropped() {
        let vp = lane(400.0);
        let marks = ruler_marks(30.02, &vp.mapper(30.02), &vp, &RulerConfig::default());
        let n = marks.len();
        assert_eq!(marks[n - 2].time, 30.0);
        assert!(!marks[n - 2].labeled);
        assert!(marks[n - 1].labeled && marks[n - 1].is_end);
        assert!(marks[..n - 2].iter().all(|m| m.labeled));
    }

    #[test]
    fn scrolled_window_has_no_end_mark() {
        let mut vp = lane(300.0);
        vp.zoom_at(4.0, 0.0, 16.0);
        let marks = ruler_marks(30.0, &vp.mapper(30.0), &vp, &RulerConfig::default());
        assert!(!marks.is_empty());
        assert!(marks.iter().all(|m| !m.is_end));
    }

    #[test]
    fn lane_notices_follow_status() {
        use narrate_state::track::TrackKind;

        let mut audio = Track::new(TrackKind::AdAudio, 60.0);
        assert_eq!(lane_notice(&audio), None);
        audio.status = TrackStatus::Failed("download failed".into());
        assert_eq!(
            lane_notice(&audio),
            Some((LaneNoticeKind::Error, "download failed".to_string()))
        );
        audio.status = TrackStatus::Warning("placeholder".into());
        assert_eq!(lane_notice(&audio).map(|n| n.0), Some(LaneNoticeKind::Warning));
        audio.status = TrackStatus::Loading;
        assert_eq!(lane_notice(&audio).map(|n| n.0), Some(LaneNoticeKind::Loading));

        let mut video = Track::new(TrackKind::VideoThumbnails, 60.0);
        video.status = TrackStatus::Loading;
        assert_eq!(lane_notice(&video), None);
    }
}
