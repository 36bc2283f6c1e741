use crate::types::{Package, PackageStatus, StateColors};
use eframe::emath::{Align2, Vec2};
use eframe::epaint::{FontId, StrokeKind};
use egui::{Response, Sense, Ui};

pub fn list_item(
    ui: &mut Ui,
    text: &str,
    size: Vec2,
    selected: bool,
    colors: StateColors,
) -> Response {
    let (rect, response) = ui.allocate_exact_size(size, Sense::click());

    if ui.is_rect_visible(rect) {
        let mut visuals = ui.style().interact_selectable(&response, selected);

        // Override background color based on state
        let bg_color = if selected {
            colors.selected.unwrap_or(visuals.bg_fill)
        } else if response.hovered() {
            colors.hover
        } else {
            colors.default
        };

        visuals.bg_fill = bg_color;

        let border_radius = 2.0;
        ui.painter()
            .rect_filled(rect, border_radius, visuals.bg_fill);
        ui.painter()
            .rect_stroke(rect, border_radius, visuals.bg_stroke, StrokeKind::Middle);

        // Draw left-aligned text
        let text_pos = rect.left_center() + Vec2::new(10.0, 0.0);
        ui.painter().text(
            text_pos,
            Align2::LEFT_CENTER,
            text,
            FontId::default(),
            visuals.text_color(),
        );
    }

    response
}

/// Sidebar label: title plus a marker for anything not plainly downloadable.
pub fn package_label(p: &Package) -> String {
    let title = if p.title.is_empty() { &p.pkg_name } else { &p.title };
    match p.status {
        PackageStatus::NeedsGet => title.to_string(),
        PackageStatus::NeedsUpdate => format!("{} • update", title),
        PackageStatus::Installed => format!("{} • installed", title),
        PackageStatus::LocalOnly => format!("{} • local", title),
    }
}

/// Indices of packages matching the search query and category.
///
/// The query matches title, name or author, case-insensitively.
pub fn filter_packages(packages: &[Package], query: &str, category: Option<&str>) -> Vec<usize> {
    let q = query.trim().to_lowercase();
    packages
        .iter()
        .enumerate()
        .filter(|(_, p)| category.is_none_or(|c| p.category == c))
        .filter(|(_, p)| {
            q.is_empty()
                || p.title.to_lowercase().contains(&q)
                || p.pkg_name.to_lowercase().contains(&q)
                || p.author.to_lowercase().contains(&q)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Distinct categories in catalog order.
pub fn categories(packages: &[Package]) -> Vec<String> {
    let mut res: Vec<String> = Vec::new();
    for p in packages {
        if !p.category.is_empty() && !res.contains(&p.category) {
            res.push(p.category.clone());
        }
    }
    res
}
