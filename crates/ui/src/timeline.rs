use egui::{pos2, vec2, Align2, CornerRadius, FontId, Rect, Sense, Stroke};
use narrate_state::controller::{ContentRequest, TimelineController, TimelineStatus};
use narrate_state::filmstrip::CellSize;
use narrate_state::ruler::format_timecode;
use narrate_state::track::{Track, TrackKind, TrackStatus};

use crate::render::{
    lane_notice, render_waveform, ruler_marks, slot_cell_rect, visible_slots, LaneNoticeKind,
    WaveformKey,
};
use crate::theme;
use crate::TimelineTextures;

pub const TRACK_HEADER_WIDTH: f32 = 70.0;
pub const RULER_HEIGHT: f32 = 24.0;
pub const TRACK_GAP: f32 = 2.0;

/// Draws the timeline and returns any content requests the frame's
/// measurements or input produced. Clicks and drags on the lanes or ruler
/// call `on_seek` with the time under the pointer.
pub fn timeline_panel(
    ui: &mut egui::Ui,
    controller: &mut TimelineController,
    current_time: f64,
    textures: &mut dyn TimelineTextures,
    mut on_seek: impl FnMut(f64),
) -> Vec<ContentRequest> {
    let track_h = controller.config().track_height;
    let lanes_h = controller.tracks().len() as f32 * (track_h + TRACK_GAP);
    let (outer, _) = ui.allocate_exact_size(
        vec2(ui.available_width(), RULER_HEIGHT + lanes_h),
        Sense::hover(),
    );

    let track_left = outer.min.x + TRACK_HEADER_WIDTH;
    let track_width = (outer.width() - TRACK_HEADER_WIDTH).max(0.0);
    let ruler_rect = Rect::from_min_size(pos2(track_left, outer.min.y), vec2(track_width, RULER_HEIGHT));
    let lanes_rect = Rect::from_min_size(
        pos2(track_left, ruler_rect.max.y),
        vec2(track_width, lanes_h),
    );

    let mut requests = controller.set_device_pixel_ratio(ui.ctx().pixels_per_point());
    requests.extend(controller.set_viewport(track_width, track_h));

    let response = ui.interact(
        ruler_rect.union(lanes_rect),
        ui.id().with("timeline_lanes"),
        Sense::click_and_drag(),
    );
    if response.clicked() || response.dragged() {
        if let Some(pointer) = response.interact_pointer_pos() {
            controller.handle_click(pointer.x, track_left, &mut on_seek);
        }
    }
    requests.extend(handle_zoom_scroll(ui, controller, ruler_rect.union(lanes_rect), track_left));

    draw_ruler(ui, controller, ruler_rect);
    for (i, track) in controller.tracks().iter().enumerate() {
        let top = lanes_rect.min.y + i as f32 * (track_h + TRACK_GAP);
        let header = Rect::from_min_size(pos2(outer.min.x, top), vec2(TRACK_HEADER_WIDTH, track_h));
        let lane = Rect::from_min_size(pos2(track_left, top), vec2(track_width, track_h));
        draw_header(ui, track, header);
        draw_lane(ui, controller, track, lane, textures);
    }

    if controller.status() == TimelineStatus::Idle && controller.video_source().is_none() {
        ui.painter().text(
            lanes_rect.center(),
            Align2::CENTER_CENTER,
            "Open a video to begin",
            FontId::proportional(13.0),
            theme::TEXT_DIM,
        );
    }

    if let Some(x) = controller.playhead_x(current_time) {
        draw_playhead(ui, track_left + x, ruler_rect.min.y, lanes_rect.max.y);
    }

    requests
}

fn handle_zoom_scroll(
    ui: &egui::Ui,
    controller: &mut TimelineController,
    area: Rect,
    track_left: f32,
) -> Vec<ContentRequest> {
    let Some(pointer) = ui.input(|i| i.pointer.hover_pos()).filter(|p| area.contains(*p)) else {
        return Vec::new();
    };

    let zoom_delta = ui.input(|i| i.zoom_delta());
    if zoom_delta != 1.0 {
        return controller.zoom_at(zoom_delta, pointer.x - track_left);
    }

    let scroll_delta = ui.input(|i| i.smooth_scroll_delta);
    let dx = if scroll_delta.x.abs() > 0.1 {
        scroll_delta.x
    } else {
        scroll_delta.y
    };
    if dx.abs() > 0.1 {
        controller.scroll_by(-dx);
    }
    Vec::new()
}

fn draw_ruler(ui: &egui::Ui, controller: &TimelineController, rect: Rect) {
    let painter = ui.painter().with_clip_rect(rect.expand2(vec2(24.0, 0.0)));
    painter.rect_filled(rect, CornerRadius::ZERO, theme::RULER_BG);

    let marks = ruler_marks(
        controller.duration(),
        &controller.mapper(),
        controller.viewport(),
        &controller.config().ruler,
    );
    for mark in &marks {
        let x = rect.min.x + mark.local_x;
        painter.line_segment(
            [pos2(x, rect.max.y - 8.0), pos2(x, rect.max.y)],
            Stroke::new(1.0, theme::RULER_TICK),
        );
        if !mark.labeled {
            continue;
        }
        // The duration tick sits on the right edge; its label goes inside.
        let (anchor, dx) = if mark.is_end {
            (Align2::RIGHT_TOP, -2.0)
        } else {
            (Align2::LEFT_TOP, 2.0)
        };
        painter.text(
            pos2(x + dx, rect.min.y + 2.0),
            anchor,
            format_timecode(mark.time),
            FontId::monospace(9.0),
            theme::TEXT_DIM,
        );
    }
}

fn draw_header(ui: &egui::Ui, track: &Track, rect: Rect) {
    let painter = ui.painter();
    painter.rect_filled(rect, CornerRadius::ZERO, theme::HEADER_BG);
    painter.text(
        pos2(rect.min.x + 6.0, rect.center().y),
        Align2::LEFT_CENTER,
        track.kind.label(),
        FontId::proportional(11.0),
        theme::TEXT_PRIMARY,
    );

    let glyph = match &track.status {
        TrackStatus::Loading => Some(("…", theme::TEXT_DIM)),
        TrackStatus::Warning(_) => Some(("!", theme::WARNING_COLOR)),
        TrackStatus::Failed(_) => Some(("×", theme::ERROR_COLOR)),
        TrackStatus::Empty | TrackStatus::Ready => None,
    };
    if let Some((glyph, color)) = glyph {
        painter.text(
            pos2(rect.max.x - 6.0, rect.center().y),
            Align2::RIGHT_CENTER,
            glyph,
            FontId::proportional(12.0),
            color,
        );
    }
    if let Some(message) = track.status.message() {
        ui.interact(rect, ui.id().with(("track_header", track.kind)), Sense::hover())
            .on_hover_text(message);
    }
}

fn draw_lane(
    ui: &egui::Ui,
    controller: &TimelineController,
    track: &Track,
    rect: Rect,
    textures: &mut dyn TimelineTextures,
) {
    let painter = ui.painter().with_clip_rect(rect);
    painter.rect_filled(rect, CornerRadius::ZERO, theme::TRACK_BG);
    let viewport = controller.viewport();

    if let Some(peaks) = track.peaks() {
        let color = match track.kind {
            TrackKind::AdAudio => theme::WAVEFORM_AD,
            _ => theme::WAVEFORM_ORIGINAL,
        };
        let mapper = controller.mapper();
        let dpr = controller.device_pixel_ratio();
        let scale = controller.config().amplitude_scale;
        let key = WaveformKey::new(controller.layout_revision(), viewport);
        let build = || {
            render_waveform(peaks, &mapper, viewport, dpr, scale, theme::waveform_rgba(color))
        };
        if let Some(texture) = textures.waveform(ui.ctx(), track.kind, key, &build) {
            let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
            painter.image(texture, rect, uv, egui::Color32::WHITE);
        }
    }

    if let Some(strip) = track.filmstrip() {
        let config = controller.config();
        let cell = CellSize::new(config.cell_width, config.cell_height);
        for index in visible_slots(strip.len(), cell.width, viewport) {
            let (x0, y0, x1, y1) = slot_cell_rect(index, cell, rect.height(), viewport.scroll_x);
            let cell_rect = Rect::from_min_max(
                pos2(rect.min.x + x0, rect.min.y + y0),
                pos2(rect.min.x + x1, rect.min.y + y1),
            );
            match strip.get(index).and_then(|_| textures.slot(index)) {
                Some(texture) => {
                    let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
                    painter.image(texture.id(), cell_rect, uv, egui::Color32::WHITE);
                }
                None => {
                    painter.rect_filled(cell_rect.shrink(0.5), theme::ROUNDING_SM, theme::SLOT_PLACEHOLDER);
                }
            }
        }
    }

    if let Some((kind, text)) = lane_notice(track) {
        match kind {
            LaneNoticeKind::Error => {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    text,
                    FontId::proportional(12.0),
                    theme::ERROR_COLOR,
                );
            }
            LaneNoticeKind::Loading => {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    text,
                    FontId::proportional(11.0),
                    theme::TEXT_DIM,
                );
            }
            LaneNoticeKind::Warning => {
                let galley =
                    painter.layout_no_wrap(text, FontId::proportional(10.0), theme::WARNING_COLOR);
                let top_left = pos2(rect.min.x + 4.0, rect.max.y - 2.0 - galley.size().y);
                let bg = Rect::from_min_size(top_left - vec2(2.0, 0.0), galley.size() + vec2(4.0, 0.0));
                painter.rect_filled(bg, theme::ROUNDING_SM, theme::TRACK_BG.gamma_multiply(0.85));
                painter.galley(top_left, galley, theme::WARNING_COLOR);
            }
        }
    }
}

fn draw_playhead(ui: &egui::Ui, x: f32, top: f32, bottom: f32) {
    let painter = ui.painter();
    painter.line_segment(
        [pos2(x, top), pos2(x, bottom)],
        Stroke::new(1.5, theme::PLAYHEAD_COLOR),
    );
    let head = vec![pos2(x - 5.0, top), pos2(x + 5.0, top), pos2(x, top + 7.0)];
    painter.add(egui::Shape::convex_polygon(
        head,
        theme::PLAYHEAD_COLOR,
        Stroke::NONE,
    ));
}
