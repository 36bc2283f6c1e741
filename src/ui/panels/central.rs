use crate::actions::{ActionState, DetailsScreen, ScreenEvent, ScreenInput};
use crate::types::{Package, PackageStatus};
use eframe::egui;

const ERROR_RED: egui::Color32 = egui::Color32::from_rgb(200, 70, 70);

/// Everything else we know about the package, one fact per line.
pub fn details_text(p: &Package) -> String {
    format!(
        "Title: {}\n{}\n\nAuthor: {}\nVersion: {}\nLicense: {}\n\nPackage: {}\nDownloads: {}\nUpdated: {}\n\nDownload size: {} KB\nInstall size: {} KB\n",
        p.title,
        p.short_desc,
        p.author,
        p.version,
        p.license,
        p.pkg_name,
        p.downloads,
        p.updated,
        p.download_size,
        p.extracted_size,
    )
}

// Space is left alone: egui already uses it to press the focused button.
const SHORTCUT_KEYS: [egui::Key; 4] = [egui::Key::Enter, egui::Key::Escape, egui::Key::L, egui::Key::X];

fn shortcut(key: egui::Key) -> Option<ScreenInput> {
    match key {
        egui::Key::Enter => Some(ScreenInput::Confirm),
        egui::Key::Escape => Some(ScreenInput::Cancel),
        egui::Key::L => Some(ScreenInput::Launch),
        egui::Key::X => Some(ScreenInput::MoreByAuthor),
        _ => None,
    }
}

/// Keyboard shortcut for this frame, unless a text field has focus.
fn key_input(ctx: &egui::Context) -> Option<ScreenInput> {
    if ctx.wants_keyboard_input() {
        return None;
    }
    ctx.input(|i| SHORTCUT_KEYS.into_iter().find(|k| i.key_pressed(*k)))
        .and_then(shortcut)
}

/// Render the details screen on top of the stack and apply the user's input.
pub fn show(ctx: &egui::Context, screen: &mut DetailsScreen) -> Option<ScreenEvent> {
    let idle = !screen.is_operating();
    let mut input = None;

    egui::CentralPanel::default().show(ctx, |ui| {
        let p = &screen.package;
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.heading(egui::RichText::new(&p.title).strong().size(22.0));
                ui.label(egui::RichText::new(&p.author).color(egui::Color32::GRAY).size(16.0));
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                if ui.add_enabled(idle, egui::Button::new("More by Author")).clicked() {
                    input = Some(ScreenInput::MoreByAuthor);
                }
            });
        });

        ui.add_space(6.0);
        ui.separator();
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            let label = p.status.action_label();
            let button = if p.status == PackageStatus::Installed {
                egui::Button::new(egui::RichText::new(label).color(egui::Color32::WHITE))
                    .fill(egui::Color32::from_rgb(220, 68, 68))
            } else {
                egui::Button::new(label)
            };
            if ui.add_enabled(idle, button).clicked() {
                input = Some(ScreenInput::Confirm);
            }
            if let Some(launch) = screen.launch_label() {
                if ui
                    .add_enabled(idle && screen.can_launch(), egui::Button::new(launch))
                    .clicked()
                {
                    input = Some(ScreenInput::Launch);
                }
            }
            if ui.add_enabled(idle, egui::Button::new("Cancel")).clicked() {
                input = Some(ScreenInput::Cancel);
            }
        });

        if let Some(err) = screen.error_text() {
            ui.colored_label(ERROR_RED, err);
        }

        if let ActionState::Operating(kind) = screen.state() {
            ui.add_space(6.0);
            ui.label(kind.description());
            ui.add(egui::ProgressBar::new(screen.progress()).show_percentage());
        }

        ui.add_space(8.0);
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.label(&p.long_desc);
                ui.add_space(12.0);
                ui.label(format!("Changelog:\n{}", p.changelog));
                ui.add_space(12.0);
                ui.label(egui::RichText::new(details_text(p)).monospace());
            });
    });

    let input = input.or_else(|| key_input(ctx))?;
    screen.handle(input, Some(ctx.clone()))
}

/// Shown when no details screen is open.
pub fn show_placeholder(ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.centered_and_justified(|ui| {
            ui.label("Select a package from the left to see details.");
        });
    });
}
