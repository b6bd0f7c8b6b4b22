mod channel_polling;
mod keyboard;
pub mod source_watch;
mod texture_cache;

mod workers {
    pub mod peak_worker;
    pub mod probe_worker;
    pub mod thumbnail_worker;
}

use std::sync::mpsc;

use narrate_media::import::{has_extension, is_ad_audio_extension, is_video_extension};
use narrate_media::SharedFetcher;
use narrate_state::config::TimelineConfig;
use narrate_state::controller::{ContentRequest, TimelineController, TimelineStatus};
use narrate_state::playback::Playback;
use narrate_state::ruler::format_timecode;
use narrate_state::source::MediaSource;

use crate::source_watch::SourceWatcher;
use crate::texture_cache::TextureCache;
use crate::workers::peak_worker::{spawn_peak_worker, PeakWorkerChannels};
use crate::workers::probe_worker::{spawn_probe, ProbeResult};
use crate::workers::thumbnail_worker::{spawn_thumbnail_worker, ThumbnailWorkerChannels};

#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub video: Option<String>,
    pub ad_audio: Option<String>,
    pub config: TimelineConfig,
}

pub struct NarrateApp {
    controller: TimelineController,
    playback: Playback,
    last_frame_time: Option<f64>,
    video: Option<MediaSource>,
    ad_audio: Option<MediaSource>,
    peaks: PeakWorkerChannels,
    thumbnails: ThumbnailWorkerChannels,
    probe_tx: mpsc::Sender<ProbeResult>,
    probe_rx: mpsc::Receiver<ProbeResult>,
    textures: TextureCache,
    watcher: SourceWatcher,
    notice: Option<String>,
}

impl NarrateApp {
    pub fn new(cc: &eframe::CreationContext<'_>, launch: LaunchOptions) -> Self {
        narrate_ui::theme::apply_theme(&cc.egui_ctx);
        let (probe_tx, probe_rx) = mpsc::channel();
        let dpr = cc.egui_ctx.pixels_per_point();
        let backend = launch.config.decoder_backend;
        let fetcher: SharedFetcher = SharedFetcher::default();

        let mut app = Self {
            controller: TimelineController::new(launch.config, dpr),
            playback: Playback::default(),
            last_frame_time: None,
            video: None,
            ad_audio: None,
            peaks: spawn_peak_worker(backend, fetcher.clone()),
            thumbnails: spawn_thumbnail_worker(fetcher),
            probe_tx,
            probe_rx,
            textures: TextureCache::default(),
            watcher: SourceWatcher::default(),
            notice: None,
        };

        if let Some(src) = launch.video {
            app.open_video(MediaSource::new(&src));
        }
        if let Some(src) = launch.ad_audio {
            app.open_ad_audio(Some(MediaSource::new(&src)));
        }
        app
    }

    /// A new video resets the timeline until its duration is probed.
    fn open_video(&mut self, source: MediaSource) {
        log::info!("opening video {}", source.locator);
        self.playback = Playback::default();
        self.video = Some(source.clone());
        self.notice = None;
        self.textures.clear();
        let requests = self.controller.set_sources(Some(source.clone()), self.ad_audio.clone(), 0.0);
        self.dispatch(requests);
        spawn_probe(source.id, source.locator, self.probe_tx.clone());
        self.refresh_watch();
    }

    fn open_ad_audio(&mut self, source: Option<MediaSource>) {
        if let Some(s) = &source {
            log::info!("opening audio description {}", s.locator);
        }
        self.ad_audio = source;
        self.push_sources();
        self.refresh_watch();
    }

    fn push_sources(&mut self) {
        let duration = self.controller.duration();
        let requests =
            self.controller
                .set_sources(self.video.clone(), self.ad_audio.clone(), duration);
        self.dispatch(requests);
    }

    fn refresh_watch(&mut self) {
        let paths: Vec<&std::path::Path> = [&self.video, &self.ad_audio]
            .into_iter()
            .flatten()
            .filter_map(|s| s.locator.local_path())
            .collect();
        self.watcher.watch_files(&paths);
    }

    fn dispatch(&mut self, requests: Vec<ContentRequest>) {
        for request in requests {
            match request {
                ContentRequest::Peaks(req) => {
                    if self.peaks.req_tx.send(req).is_err() {
                        log::error!("peak worker is gone");
                    }
                }
                ContentRequest::Thumbnails(req) => {
                    self.textures.clear_slots();
                    if self.thumbnails.req_tx.send(req).is_err() {
                        log::error!("thumbnail worker is gone");
                    }
                }
            }
        }
    }

    fn seek(&mut self, time: f64) {
        log::debug!("seek to {time:.3}s");
        self.playback.seek(time);
    }

    fn open_dialog_video(&mut self) {
        let exts = narrate_media::import::VIDEO_EXTENSIONS;
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Video", exts)
            .pick_file()
        {
            if !has_extension(&path, is_video_extension) {
                log::warn!("{} does not look like a video file", path.display());
            }
            self.open_video(MediaSource::from_path(path));
        }
    }

    fn open_dialog_ad_audio(&mut self) {
        let exts = narrate_media::import::AUDIO_EXTENSIONS;
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Audio", exts)
            .add_filter("Video", narrate_media::import::VIDEO_EXTENSIONS)
            .pick_file()
        {
            if !has_extension(&path, is_ad_audio_extension) {
                log::warn!("{} does not look like an audio file", path.display());
            }
            self.open_ad_audio(Some(MediaSource::from_path(path)));
        }
    }

    fn top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open video…").clicked() {
                self.open_dialog_video();
            }
            if ui.button("Open AD audio…").clicked() {
                self.open_dialog_ad_audio();
            }
            if self.ad_audio.is_some() && ui.button("Remove AD").clicked() {
                self.open_ad_audio(None);
            }
            ui.separator();

            let label = if self.playback.is_playing() { "Pause" } else { "Play" };
            if ui
                .add_enabled(self.controller.duration() > 0.0, egui::Button::new(label))
                .clicked()
            {
                self.playback.toggle_play();
            }
            ui.monospace(format!(
                "{} / {}",
                format_timecode(self.playback.current_time),
                format_timecode(self.controller.duration())
            ));

            let status = match self.controller.status() {
                TimelineStatus::Idle => "idle",
                TimelineStatus::Loading => "loading",
                TimelineStatus::Ready => "ready",
            };
            ui.label(egui::RichText::new(status).color(narrate_ui::theme::TEXT_DIM));
        });
    }

    fn info_panel(&self, ui: &mut egui::Ui) {
        let name = |s: &Option<MediaSource>| {
            s.as_ref()
                .map(MediaSource::display_name)
                .unwrap_or_else(|| "none".to_string())
        };
        ui.label(format!("Video: {}", name(&self.video)));
        ui.label(format!("Audio description: {}", name(&self.ad_audio)));
        for track in self.controller.tracks() {
            if let Some(message) = track.status.message() {
                ui.colored_label(
                    narrate_ui::theme::WARNING_COLOR,
                    format!("{}: {message}", track.kind.label()),
                );
            }
        }
        if let Some(notice) = &self.notice {
            ui.colored_label(narrate_ui::theme::ERROR_COLOR, notice);
        }
    }
}

impl eframe::App for NarrateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);
        if let Some(last) = self.last_frame_time {
            self.playback.advance(now - last);
        }
        self.last_frame_time = Some(now);

        self.poll_background_tasks(ctx);
        self.handle_keyboard(ctx);

        egui::TopBottomPanel::top("top_panel")
            .exact_height(32.0)
            .show(ctx, |ui| self.top_bar(ui));

        let current_time = self.playback.current_time;
        let mut seek_to = None;
        let requests = egui::TopBottomPanel::bottom("timeline_panel")
            .resizable(false)
            .show(ctx, |ui| {
                narrate_ui::timeline::timeline_panel(
                    ui,
                    &mut self.controller,
                    current_time,
                    &mut self.textures,
                    |t| seek_to = Some(t),
                )
            })
            .inner;
        self.dispatch(requests);
        if let Some(t) = seek_to {
            self.seek(t);
        }

        egui::CentralPanel::default().show(ctx, |ui| self.info_panel(ui));

        if self.playback.is_playing()
            || self.controller.status() == TimelineStatus::Loading
            || self.watcher.has_pending()
        {
            ctx.request_repaint();
        }
    }
}
