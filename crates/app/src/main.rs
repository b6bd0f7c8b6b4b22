use std::path::PathBuf;

use clap::Parser;
use narrate_app::{LaunchOptions, NarrateApp};
use narrate_state::config::TimelineConfig;

/// Timeline viewer for audio description work.
#[derive(Parser, Debug)]
#[command(name = "narrate-app")]
struct Args {
    /// Video file or http(s) URL
    video: Option<String>,

    /// Audio description track (file or URL)
    ad_audio: Option<String>,

    /// JSON timeline configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TimelineConfig::load(path).unwrap_or_else(|e| {
            log::warn!("{e}; using default configuration");
            TimelineConfig::default()
        }),
        None => TimelineConfig::default(),
    };
    let launch = LaunchOptions {
        video: args.video,
        ad_audio: args.ad_audio,
        config,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 640.0])
            .with_min_inner_size([640.0, 360.0])
            .with_title("Narrate"),
        vsync: true,
        renderer: eframe::Renderer::Wgpu,
        ..Default::default()
    };

    eframe::run_native(
        "Narrate",
        options,
        Box::new(|cc| Ok(Box::new(NarrateApp::new(cc, launch)))),
    )
}
