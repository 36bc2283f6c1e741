//! Background tasks used by the UI for loading the catalog and running
//! install/remove operations without blocking the UI thread.

use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use crate::actions::GateGuard;
use crate::core::PackageStore;
use crate::progress::ProgressBridge;
use crate::types::{OperationKind, Package, ProgressUpdate};

use super::GuiState;

/// Spawn a background task to reload the package catalog.
pub fn spawn_refresh_catalog(state_arc: Arc<Mutex<GuiState>>, store: Arc<dyn PackageStore>, repaint: Option<egui::Context>) {
    {
        let mut s = state_arc.lock().unwrap();
        s.refreshing = true;
    }
    thread::spawn(move || {
        let result = store.packages();
        let mut s = state_arc.lock().unwrap();
        s.refreshing = false;
        match result {
            Ok(list) => {
                info!("catalog loaded: {} packages", list.len());
                s.packages = list;
            }
            Err(e) => {
                error!("catalog refresh failed: {:#}", e);
                s.status_msgs.push(format!("Refresh failed: {:#}", e));
            }
        }
        drop(s);
        if let Some(ctx) = repaint {
            ctx.request_repaint();
        }
    });
}

/// Run an install or remove on a worker thread.
///
/// Progress arrives on `tx` through a throttled [`ProgressBridge`]; the last
/// message is always `Finished`. The gate is reopened before that message is
/// sent, so the UI sees a free gate once it handles completion.
pub fn spawn_operation(
    store: Arc<dyn PackageStore>,
    package: Package,
    kind: OperationKind,
    tx: mpsc::Sender<ProgressUpdate>,
    guard: GateGuard,
    repaint: Option<egui::Context>,
    interval: Duration,
) {
    thread::spawn(move || {
        let mut bridge = ProgressBridge::new(tx.clone(), interval);
        if let Some(ctx) = &repaint {
            bridge = bridge.with_repaint(ctx.clone());
        }

        let result = match kind {
            OperationKind::Install => store.install(&package, &mut bridge),
            OperationKind::Remove => store.remove(&package),
        };
        match &result {
            Ok(()) => info!("{:?} of {} finished", kind, package.pkg_name),
            Err(e) => error!(
                "{:?} of {} failed at {:.0}%: {:#}",
                kind,
                package.pkg_name,
                bridge.state().percent * 100.0,
                e
            ),
        }

        drop(guard);
        let _ = tx.send(ProgressUpdate::Finished(result.map_err(|e| format!("{:#}", e))));
        if let Some(ctx) = repaint {
            ctx.request_repaint();
        }
    });
}
