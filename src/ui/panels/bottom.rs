use crate::types::PackageStatus;
use crate::ui::GuiState;
use eframe::egui;
use eframe::epaint::Color32;
use std::sync::{Arc, Mutex};

/// Render the bottom status bar.
pub fn show(ctx: &egui::Context, state: &Arc<Mutex<GuiState>>) {
    egui::TopBottomPanel::bottom("bottom_status")
        .resizable(false)
        .show(ctx, |ui| {
            let (total, installed, updates, last_msg, refreshing) = {
                let s = state.lock().unwrap();
                let count = |st: PackageStatus| s.packages.iter().filter(|p| p.status == st).count();
                (
                    s.packages.len(),
                    count(PackageStatus::Installed),
                    count(PackageStatus::NeedsUpdate),
                    s.status_msgs.last().cloned().unwrap_or_default(),
                    s.refreshing,
                )
            };

            let mut line = format!(
                "Packages: {}  •  Installed: {}  •  Updates: {}",
                total, installed, updates
            );
            if refreshing {
                line.push_str("  •  Refreshing...");
            }
            if !last_msg.is_empty() {
                line.push_str(&format!("  •  {}", last_msg));
            }

            ui.horizontal(|ui| {
                ui.set_height(32.0);
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new(line)
                            .color(Color32::from_rgb(110, 112, 124))
                            .monospace(),
                    );
                });
            });
        });
}
