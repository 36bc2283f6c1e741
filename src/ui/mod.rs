//! Egui-based UI for the store.
//!
//! This module defines the catalog state, the eframe App implementation, and
//! routes details-screen events to the navigation stack and background tasks
//! defined in ui::tasks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use eframe::{App, egui};
use tracing::info;

use crate::actions::{DetailsScreen, ScreenContext, ScreenEvent};
use crate::style::set_appkit_style;
use crate::types::Package;

use nav::Navigator;
use panels::side::SideAction;

/// Catalog state shared between the UI thread and the refresh worker.
pub struct GuiState {
    pub packages: Vec<Package>,
    pub search_query: String,
    pub category: Option<String>, // None = all categories
    pub refreshing: bool,

    // status log
    pub status_msgs: Vec<String>,
}

impl GuiState {
    pub fn new() -> Self {
        Self {
            packages: Vec::new(),
            search_query: String::new(),
            category: None,
            refreshing: false,
            status_msgs: Vec::new(),
        }
    }
}

/// Main eframe application: catalog sidebar plus a stack of details screens.
pub struct HbStoreApp {
    pub state: Arc<Mutex<GuiState>>,
    nav: Navigator<DetailsScreen>,
    screen_ctx: ScreenContext,
}

impl HbStoreApp {
    /// Start with an empty catalog and immediately trigger a refresh.
    pub fn new(egui_ctx: &egui::Context, screen_ctx: ScreenContext) -> Self {
        let state = Arc::new(Mutex::new(GuiState::new()));
        tasks::spawn_refresh_catalog(state.clone(), screen_ctx.store.clone(), Some(egui_ctx.clone()));
        Self {
            state,
            nav: Navigator::new(screen_ctx.gate.clone()),
            screen_ctx,
        }
    }

    fn open_details(&mut self, package: Package) {
        let screen = DetailsScreen::new(package, self.screen_ctx.clone());
        self.nav.replace(screen);
    }

    fn handle_event(&mut self, ctx: &egui::Context, event: ScreenEvent) {
        match event {
            ScreenEvent::Close => {
                self.nav.pop();
            }
            ScreenEvent::CloseAndRefresh { error } => {
                self.nav.clear();
                {
                    let mut s = self.state.lock().unwrap();
                    match error {
                        Some(e) => s.status_msgs.push(format!("Error: {}", e)),
                        None => s.status_msgs.push("Operation finished".to_string()),
                    }
                }
                tasks::spawn_refresh_catalog(self.state.clone(), self.screen_ctx.store.clone(), Some(ctx.clone()));
            }
            ScreenEvent::SearchAuthor(author) => {
                info!("showing packages by {}", author);
                {
                    let mut s = self.state.lock().unwrap();
                    s.search_query = author;
                    s.category = None;
                }
                self.nav.clear();
            }
            ScreenEvent::OpenDetails(package) => {
                let screen = DetailsScreen::new(*package, self.screen_ctx.clone());
                self.nav.push(screen);
            }
        }
    }
}

/// Egui frame update: drains operation progress, then lays out the panels.
impl App for HbStoreApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // apply theme
        set_appkit_style(ctx);

        // pull updates from the running operation (non-blocking)
        let finished = self.nav.top_mut().and_then(|s| s.poll());
        if let Some(ev) = finished {
            self.handle_event(ctx, ev);
        }
        let busy = self.screen_ctx.gate.is_held() || self.nav.top_mut().is_some_and(|s| s.is_operating());

        panels::top::show(ctx);
        panels::bottom::show(ctx, &self.state);

        let selected = self.nav.top_mut().map(|s| s.package.pkg_name.clone());
        match panels::side::show(ctx, &self.state, busy, selected.as_deref()) {
            Some(SideAction::Open(package)) => self.open_details(package),
            Some(SideAction::Refresh) => {
                tasks::spawn_refresh_catalog(self.state.clone(), self.screen_ctx.store.clone(), Some(ctx.clone()));
            }
            None => {}
        }

        let event = match self.nav.top_mut() {
            Some(screen) => panels::central::show(ctx, screen),
            None => {
                panels::central::show_placeholder(ctx);
                None
            }
        };
        if let Some(ev) = event {
            self.handle_event(ctx, ev);
        }

        if busy {
            // keep polling the worker channel while it runs
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }
}

pub mod list;
pub mod nav;
pub mod panels;
pub mod tasks;
