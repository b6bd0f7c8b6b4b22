use std::collections::HashMap;

use narrate_state::filmstrip::ThumbnailSlot;
use narrate_state::track::TrackKind;
use narrate_ui::raster::Surface;
use narrate_ui::render::WaveformKey;
use narrate_ui::TimelineTextures;

// Rasters are already sized in physical pixels.
const TEXTURE_OPTIONS: egui::TextureOptions = egui::TextureOptions::NEAREST;

#[derive(Default)]
pub struct TextureCache {
    waveforms: HashMap<TrackKind, (WaveformKey, egui::TextureHandle)>,
    slots: HashMap<usize, egui::TextureHandle>,
}

impl TextureCache {
    /// Drops slot textures when a new filmstrip generation starts.
    pub fn clear_slots(&mut self) {
        self.slots.clear();
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.waveforms.clear();
    }

    pub fn insert_slot(&mut self, ctx: &egui::Context, slot: &ThumbnailSlot) -> Result<(), String> {
        let img = image::load_from_memory(&slot.image.png)
            .map_err(|e| format!("slot {} is not a readable PNG: {e}", slot.slot_index))?
            .to_rgba8();
        let texture = ctx.load_texture(
            format!("slot_{}", slot.slot_index),
            egui::ColorImage::from_rgba_unmultiplied(
                [img.width() as usize, img.height() as usize],
                img.as_raw(),
            ),
            TEXTURE_OPTIONS,
        );
        self.slots.insert(slot.slot_index, texture);
        Ok(())
    }
}

impl TimelineTextures for TextureCache {
    fn waveform(
        &mut self,
        ctx: &egui::Context,
        kind: TrackKind,
        key: WaveformKey,
        build: &dyn Fn() -> Surface,
    ) -> Option<egui::TextureId> {
        if let Some((cached, handle)) = self.waveforms.get_mut(&kind) {
            if *cached != key {
                let surface = build();
                handle.set(surface.to_color_image(), TEXTURE_OPTIONS);
                *cached = key;
            }
            return Some(handle.id());
        }

        let surface = build();
        let texture = ctx.load_texture(
            format!("waveform_{kind:?}"),
            surface.to_color_image(),
            TEXTURE_OPTIONS,
        );
        let id = texture.id();
        self.waveforms.insert(kind, (key, texture));
        Some(id)
    }

    fn slot(&self, slot_index: usize) -> Option<&egui::TextureHandle> {
        self.slots.get(&slot_index)
    }
}
