mod actions;
mod config;
mod core;
mod error;
mod launcher;
mod manifest;
mod progress;
mod style;
mod types;
mod ui;

use std::sync::Arc;

use eframe::egui;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::actions::{OperationGate, ScreenContext};
use crate::config::StoreConfig;
use crate::core::LocalStore;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = StoreConfig::load().unwrap_or_else(|e| {
        error!("falling back to default settings: {:#}", e);
        StoreConfig::default()
    });
    info!(
        "storage root {:?}, repository {:?}",
        config.storage_root, config.repo_dir
    );

    // launch capability is fixed for the lifetime of the process
    let launcher = launcher::detect();
    let config = Arc::new(config);
    let screen_ctx = ScreenContext {
        store: Arc::new(LocalStore::new((*config).clone())),
        launcher: Arc::from(launcher),
        config,
        gate: OperationGate::default(),
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([1000.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Homebrew Store",
        native_options,
        Box::new(|cc| Ok(Box::new(ui::HbStoreApp::new(&cc.egui_ctx, screen_ctx)))),
    )
}
