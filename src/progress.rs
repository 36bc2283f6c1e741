//! Throttled bridge from transfer byte counts to on-screen progress.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::types::ProgressUpdate;

/// Minimum spacing between two accepted progress updates.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(32);

/// Reply to the transfer layer after a progress callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferStatus {
    Continue,
}

/// Observer the transfer layer calls while bytes move.
pub trait TransferObserver {
    fn on_transfer(&mut self, dl_total: f64, dl_now: f64, ul_total: f64, ul_now: f64) -> TransferStatus;
}

/// Last accepted progress value and when it was accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProgressState {
    pub percent: f64,
    pub last_update: Option<Instant>,
}

/// Fraction of `total` already downloaded. A zero total counts as one.
pub fn percent_of(downloaded: f64, total: f64) -> f64 {
    let total = if total == 0.0 { 1.0 } else { total };
    downloaded / total
}

pub struct ProgressBridge {
    state: ProgressState,
    interval: Duration,
    tx: mpsc::Sender<ProgressUpdate>,
    repaint: Option<egui::Context>,
}

impl ProgressBridge {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>, interval: Duration) -> Self {
        Self {
            state: ProgressState::default(),
            interval,
            tx,
            repaint: None,
        }
    }

    /// Ask `ctx` for a repaint whenever an update is accepted.
    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    /// Feed a byte count; returns whether the update was accepted.
    pub fn update(&mut self, downloaded: f64, total: f64) -> bool {
        self.update_at(Instant::now(), downloaded, total)
    }

    pub(crate) fn update_at(&mut self, now: Instant, downloaded: f64, total: f64) -> bool {
        let percent = percent_of(downloaded, total);

        // the final 100% update always goes through
        if let Some(last) = self.state.last_update {
            if now.saturating_duration_since(last) < self.interval && percent != 1.0 {
                return false;
            }
        }

        self.state.percent = percent;
        // a closed receiver means the screen is gone; nothing to draw into
        if self.tx.send(ProgressUpdate::Progress(percent as f32)).is_ok() {
            if let Some(ctx) = &self.repaint {
                ctx.request_repaint();
            }
        }
        self.state.last_update = Some(now);
        true
    }
}

impl TransferObserver for ProgressBridge {
    fn on_transfer(&mut self, dl_total: f64, dl_now: f64, _ul_total: f64, _ul_now: f64) -> TransferStatus {
        self.update(dl_now, dl_total);
        TransferStatus::Continue
    }
}
