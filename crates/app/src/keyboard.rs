use crate::NarrateApp;

const ZOOM_STEP: f32 = 1.25;

impl NarrateApp {
    pub(crate) fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (toggle, zoom_in, zoom_out, home) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals),
                i.key_pressed(egui::Key::Minus),
                i.key_pressed(egui::Key::Home),
            )
        });

        if toggle && self.controller.duration() > 0.0 {
            self.playback.toggle_play();
        }
        if home {
            self.seek(0.0);
        }

        let centre = self.controller.viewport().track_width / 2.0;
        if zoom_in {
            let requests = self.controller.zoom_at(ZOOM_STEP, centre);
            self.dispatch(requests);
        }
        if zoom_out {
            let requests = self.controller.zoom_at(1.0 / ZOOM_STEP, centre);
            self.dispatch(requests);
        }
    }
}
