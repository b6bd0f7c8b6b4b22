use std::path::Path;

use narrate_state::source::MediaSource;

use crate::source_watch::absolute;
use crate::workers::thumbnail_worker::ThumbnailEvent;
use crate::NarrateApp;

impl NarrateApp {
    pub(crate) fn poll_background_tasks(&mut self, ctx: &egui::Context) {
        let mut received = false;

        while let Ok(result) = self.probe_rx.try_recv() {
            received = true;
            if self.video.as_ref().map(|v| v.id) != Some(result.source) {
                continue;
            }
            match result.outcome {
                Ok(meta) => match meta.duration.filter(|d| *d > 0.0) {
                    Some(duration) => {
                        log::info!("video duration {duration:.3}s");
                        self.playback.set_duration(duration);
                        let requests = self.controller.set_sources(
                            self.video.clone(),
                            self.ad_audio.clone(),
                            duration,
                        );
                        self.dispatch(requests);
                    }
                    None => self.notice = Some("video has no known duration".to_string()),
                },
                Err(e) => {
                    log::warn!("{e}");
                    self.notice = Some(e.to_string());
                }
            }
        }

        while let Ok(result) = self.peaks.result_rx.try_recv() {
            received = true;
            match result.outcome {
                Ok(outcome) => {
                    self.controller.accept_peaks(
                        result.track,
                        result.generation,
                        outcome.peaks,
                        outcome.warning,
                    );
                }
                Err(e) => {
                    self.controller
                        .fail_peaks(result.track, result.generation, e.to_string());
                }
            }
        }

        while let Ok(event) = self.thumbnails.event_rx.try_recv() {
            received = true;
            match event {
                ThumbnailEvent::Slot(generation, slot) => {
                    if self.controller.accept_slot(generation, slot.clone()) {
                        if let Err(e) = self.textures.insert_slot(ctx, &slot) {
                            log::warn!("{e}");
                        }
                    }
                }
                ThumbnailEvent::Finished(generation, error) => {
                    self.controller.finish_thumbnails(generation, error);
                }
            }
        }

        for path in self.watcher.poll() {
            received = true;
            self.source_changed(&path);
        }

        if received {
            ctx.request_repaint();
        }
    }

    /// A watched file was rewritten: bump the matching source's revision so
    /// its content is regenerated.
    fn source_changed(&mut self, path: &Path) {
        let is_changed_file = |s: &MediaSource| {
            s.locator
                .local_path()
                .is_some_and(|p| absolute(p) == path)
        };
        let mut changed = false;
        for source in [&mut self.video, &mut self.ad_audio].into_iter().flatten() {
            if is_changed_file(&*source) {
                source.bump_revision();
                log::info!("{} changed on disk (revision {})", path.display(), source.revision);
                changed = true;
            }
        }
        if changed {
            self.push_sources();
        }
    }
}
