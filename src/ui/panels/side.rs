use eframe::egui;
use std::sync::{Arc, Mutex};

use crate::types::{Package, StateColors};
use crate::ui::GuiState;
use crate::ui::list;

use egui::{Color32, Vec2};

/// What the user asked for in the sidebar this frame.
pub enum SideAction {
    Open(Package),
    Refresh,
}

/// Render the left sidebar with search, category filter and the package list.
///
/// Everything is disabled while `busy`.
pub fn show(
    ctx: &egui::Context,
    state: &Arc<Mutex<GuiState>>,
    busy: bool,
    selected: Option<&str>,
) -> Option<SideAction> {
    let mut action = None;
    egui::SidePanel::left("sidebar")
        .resizable(false)
        .exact_width(280.0)
        .show(ctx, |ui| {
            ui.add_enabled_ui(!busy, |ui| {
                ui.add_space(4.0);
                let refreshing = { state.lock().unwrap().refreshing };
                ui.horizontal(|ui| {
                    ui.set_height(32.0);
                    ui.label(egui::RichText::new("PACKAGES").strong().size(16.0));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.add_enabled(!refreshing, egui::Button::new("Refresh")).clicked() {
                            action = Some(SideAction::Refresh);
                        }
                    });
                });

                let (mut query, mut category, cats) = {
                    let s = state.lock().unwrap();
                    (s.search_query.clone(), s.category.clone(), list::categories(&s.packages))
                };
                let query_changed = ui
                    .add(egui::TextEdit::singleline(&mut query).hint_text("Search"))
                    .changed();
                let before = category.clone();
                egui::ComboBox::from_id_salt("category")
                    .selected_text(category.clone().unwrap_or_else(|| "All".to_string()))
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut category, None, "All");
                        for c in &cats {
                            ui.selectable_value(&mut category, Some(c.clone()), c);
                        }
                    });
                if query_changed || before != category {
                    let mut s = state.lock().unwrap();
                    s.search_query = query.clone();
                    s.category = category.clone();
                }

                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let packages = { state.lock().unwrap().packages.clone() };
                    for i in list::filter_packages(&packages, &query, category.as_deref()) {
                        let p = &packages[i];
                        let full_width = ui.available_width();
                        let resp = list::list_item(
                            ui,
                            &list::package_label(p),
                            Vec2::new(full_width, 24.0),
                            selected == Some(p.pkg_name.as_str()),
                            StateColors {
                                default: Color32::from_rgb(247, 248, 250),
                                hover: Color32::WHITE,
                                selected: Some(Color32::from_rgb(58, 128, 246)),
                            },
                        );
                        if resp.clicked() {
                            action = Some(SideAction::Open(p.clone()));
                        }
                    }
                });
            });
        });
    action
}
