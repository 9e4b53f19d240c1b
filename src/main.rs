#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod demo;

use std::path::PathBuf;

use timeline_dep_graph::TimelineConfig;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Optional config file as the first argument.
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => TimelineConfig::load(&path).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "using default config");
            TimelineConfig::default()
        }),
        None => TimelineConfig::default(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Timeline Dependency Graph"),
        ..Default::default()
    };

    eframe::run_native(
        "Timeline Dependency Graph",
        options,
        Box::new(|cc| Ok(Box::new(demo::app::TimelineApp::new(cc, config)))),
    )
}
