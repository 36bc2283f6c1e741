use eframe::egui;

/// Render the top header panel.
pub fn show(ctx: &egui::Context) {
    let scale = ctx.pixels_per_point();
    egui::TopBottomPanel::top("top").show(ctx, |ui| {
        ui.add_space(8.0 * scale);
        ui.horizontal(|ui| {
            ui.heading(format!("📦 Homebrew Store v{}", env!("CARGO_PKG_VERSION")));
        });
        ui.add_space(6.0 * scale);
    });
}
