pub mod raster;
pub mod render;
pub mod theme;
pub mod timeline;

use narrate_state::track::TrackKind;

use crate::raster::Surface;
use crate::render::WaveformKey;

pub trait TimelineTextures {
    /// Waveform texture for `kind`, rebuilt with `build` when `key` differs
    /// from the one the cached texture was made with.
    fn waveform(
        &mut self,
        ctx: &egui::Context,
        kind: TrackKind,
        key: WaveformKey,
        build: &dyn Fn() -> Surface,
    ) -> Option<egui::TextureId>;

    fn slot(&self, slot_index: usize) -> Option<&egui::TextureHandle>;
}
