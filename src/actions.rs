//! Details-screen action state machine: install/remove, launch, navigation.
//!
//! A screen is either `Idle` or `Operating`. Only one operation may be in
//! flight per process; that is enforced by the shared [`OperationGate`], not
//! by the screen, so a second screen cannot start work while the first one is
//! still busy. Launching never touches the gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};

use tracing::{error, info, warn};

use crate::config::StoreConfig;
use crate::core::PackageStore;
use crate::error::LaunchError;
use crate::launcher::{self, Launcher};
use crate::manifest;
use crate::types::{OperationKind, Package, PackageStatus, ProgressUpdate};

pub const LAUNCH_ERROR_TEXT: &str = "Couldn't launch app";

/// Process-wide "an install or remove is running" flag.
#[derive(Clone, Default)]
pub struct OperationGate(Arc<AtomicBool>);

/// Holding this keeps the gate closed; dropping it reopens it.
pub struct GateGuard(Arc<AtomicBool>);

impl OperationGate {
    pub fn try_acquire(&self) -> Option<GateGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard(self.0.clone()))
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Collaborators every details screen is built with.
#[derive(Clone)]
pub struct ScreenContext {
    pub store: Arc<dyn PackageStore>,
    pub launcher: Arc<dyn Launcher>,
    pub config: Arc<StoreConfig>,
    pub gate: OperationGate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Operating(OperationKind),
}

/// What the owner of the navigation stack should do next.
#[derive(Debug)]
pub enum ScreenEvent {
    Close,
    /// Operation finished: drop every details screen and reload the catalog.
    CloseAndRefresh { error: Option<String> },
    /// Show the catalog filtered to this author.
    SearchAuthor(String),
    OpenDetails(Box<Package>),
}

/// Input the details screen reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenInput {
    Confirm,
    Cancel,
    Launch,
    MoreByAuthor,
}

pub struct DetailsScreen {
    pub package: Package,
    state: ActionState,
    can_launch: bool,
    launch_label: Option<&'static str>,
    error_text: Option<String>,
    progress: f32,
    rx: Option<mpsc::Receiver<ProgressUpdate>>,
    ctx: ScreenContext,
}

impl DetailsScreen {
    pub fn new(package: Package, ctx: ScreenContext) -> Self {
        let launch_label = launch_label(&package, &ctx);
        Self {
            package,
            state: ActionState::Idle,
            can_launch: launch_label.is_some(),
            launch_label,
            error_text: None,
            progress: 0.0,
            rx: None,
            ctx,
        }
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn is_operating(&self) -> bool {
        matches!(self.state, ActionState::Operating(_))
    }

    pub fn can_launch(&self) -> bool {
        self.can_launch
    }

    /// Label of the launch button, when the package can be launched at all.
    pub fn launch_label(&self) -> Option<&'static str> {
        self.launch_label
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Dispatch one input. Everything is ignored while operating.
    pub fn handle(&mut self, input: ScreenInput, repaint: Option<egui::Context>) -> Option<ScreenEvent> {
        if self.is_operating() {
            return None;
        }
        match input {
            ScreenInput::Confirm => {
                self.confirm(repaint);
                None
            }
            ScreenInput::Cancel => self.cancel(),
            ScreenInput::Launch => self.launch(),
            ScreenInput::MoreByAuthor => self.more_by_author(),
        }
    }

    /// Start installing (or removing, when installed) on a worker.
    ///
    /// Returns false without side effects if an operation is already running.
    pub fn confirm(&mut self, repaint: Option<egui::Context>) -> bool {
        if self.is_operating() {
            return false;
        }
        let Some(guard) = self.ctx.gate.try_acquire() else {
            warn!("another operation is in flight; ignoring confirm");
            return false;
        };

        let kind = if self.package.status == PackageStatus::Installed {
            OperationKind::Remove
        } else {
            OperationKind::Install
        };
        info!("{:?} {}", kind, self.package.pkg_name);

        let (tx, rx) = mpsc::channel();
        self.rx = Some(rx);
        self.progress = 0.0;
        self.state = ActionState::Operating(kind);

        crate::ui::tasks::spawn_operation(
            self.ctx.store.clone(),
            self.package.clone(),
            kind,
            tx,
            guard,
            repaint,
            self.ctx.config.progress_interval(),
        );
        true
    }

    /// Drain progress from the worker; yields the completion event once.
    pub fn poll(&mut self) -> Option<ScreenEvent> {
        let rx = self.rx.as_ref()?;
        let mut finished = None;
        loop {
            match rx.try_recv() {
                Ok(ProgressUpdate::Progress(p)) => self.progress = p,
                Ok(ProgressUpdate::Finished(res)) => {
                    finished = Some(res);
                    break;
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    finished = Some(Err("operation worker exited unexpectedly".to_string()));
                    break;
                }
            }
        }

        let res = finished?;
        self.rx = None;
        self.state = ActionState::Idle;
        if let Err(e) = &res {
            error!("{} failed: {}", self.package.pkg_name, e);
        }
        Some(ScreenEvent::CloseAndRefresh { error: res.err() })
    }

    pub fn cancel(&mut self) -> Option<ScreenEvent> {
        if self.is_operating() {
            return None;
        }
        Some(ScreenEvent::Close)
    }

    pub fn more_by_author(&mut self) -> Option<ScreenEvent> {
        if self.is_operating() {
            return None;
        }
        Some(ScreenEvent::SearchAuthor(self.package.author.clone()))
    }

    /// Hand off to the package binary, or to the theme injector for themes.
    ///
    /// A failure disables launching until the screen is rebuilt.
    pub fn launch(&mut self) -> Option<ScreenEvent> {
        if !self.can_launch || self.is_operating() {
            return None;
        }
        match self.try_launch() {
            Ok(ev) => ev,
            Err(e) => {
                error!("Failed to launch {}: {}", self.package.pkg_name, e);
                self.error_text = Some(LAUNCH_ERROR_TEXT.to_string());
                self.can_launch = false;
                None
            }
        }
    }

    fn try_launch(&mut self) -> Result<Option<ScreenEvent>, LaunchError> {
        let cfg = self.ctx.config.clone();
        let launcher = self.ctx.launcher.clone();

        if self.package.is_theme() {
            let injector = self
                .ctx
                .store
                .lookup(&cfg.injector_package)
                .ok_or_else(|| LaunchError::InjectorMissing(cfg.injector_package.clone()))?;
            if injector.status == PackageStatus::NeedsGet {
                // offer the injector itself for download
                return Ok(Some(ScreenEvent::OpenDetails(Box::new(injector))));
            }
            let arg = manifest::resolve_theme_argument(
                &mut self.package,
                &cfg.install_root,
                &cfg.storage_root,
            )?;
            if arg == manifest::THEME_ARG_PREFIX {
                warn!("{} installed no theme files; injector gets an empty list", self.package.pkg_name);
            }
            let path = cfg.storage_path(&injector.binary);
            let context = format!("{} {}", path.display(), arg);
            launcher::redirect(launcher.as_ref(), &path, &context)?;
        } else {
            let path = cfg.storage_path(&self.package.binary);
            let context = path.display().to_string();
            launcher::redirect(launcher.as_ref(), &path, &context)?;
        }
        Ok(None)
    }
}

/// Launch button label, or `None` when the screen offers no launch.
fn launch_label(package: &Package, ctx: &ScreenContext) -> Option<&'static str> {
    if !ctx.launcher.supports_launch() || package.status == PackageStatus::NeedsGet {
        return None;
    }
    if package.is_theme() {
        // available whether or not the injector itself is installed
        let injector = ctx.store.lookup(&ctx.config.injector_package)?;
        return Some(if injector.status == PackageStatus::NeedsGet {
            "Injector"
        } else {
            "Inject"
        });
    }
    package.has_binary().then_some("Launch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::FakeStore;
    use crate::launcher::NoLaunch;
    use crate::launcher::testing::RecordingLauncher;
    use crate::manifest::{MANIFEST_FILE, SPACE_TOKEN};
    use crate::types::test_package;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};

    struct Harness {
        _dir: tempfile::TempDir,
        store: Arc<FakeStore>,
        launcher: Arc<RecordingLauncher>,
        ctx: ScreenContext,
    }

    fn harness(store: FakeStore) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig::with_storage_root(dir.path().join("sd"), dir.path().join("repo"));
        let store = Arc::new(store);
        let launcher = Arc::new(RecordingLauncher::default());
        let ctx = ScreenContext {
            store: store.clone(),
            launcher: launcher.clone(),
            config: Arc::new(cfg),
            gate: OperationGate::default(),
        };
        Harness {
            _dir: dir,
            store,
            launcher,
            ctx,
        }
    }

    fn wait_for_event(screen: &mut DetailsScreen) -> ScreenEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(ev) = screen.poll() {
                return ev;
            }
            assert!(Instant::now() < deadline, "operation never finished");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn touch(path: PathBuf) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"bin").unwrap();
    }

    #[test]
    fn gate_admits_one_holder() {
        let gate = OperationGate::default();
        let guard = gate.try_acquire().unwrap();
        assert!(gate.is_held());
        assert!(gate.clone().try_acquire().is_none());
        drop(guard);
        assert!(!gate.is_held());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn confirm_installs_and_second_confirm_is_ignored() {
        let pkg = test_package("App", PackageStatus::NeedsGet, "tool", "switch/app.nro");
        let (store, release) = FakeStore::with_packages(vec![pkg.clone()]).gated();
        let h = harness(store);
        let mut screen = DetailsScreen::new(pkg, h.ctx.clone());

        assert!(screen.confirm(None));
        assert_eq!(screen.state(), ActionState::Operating(OperationKind::Install));
        assert!(!screen.confirm(None));
        assert!(screen.handle(ScreenInput::Cancel, None).is_none());
        assert!(h.ctx.gate.is_held());

        release.send(()).unwrap();
        let ev = wait_for_event(&mut screen);
        assert!(matches!(ev, ScreenEvent::CloseAndRefresh { error: None }));
        assert_eq!(screen.state(), ActionState::Idle);
        assert_eq!(h.store.installs.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.removes.load(Ordering::SeqCst), 0);
        assert!(!h.ctx.gate.is_held());
        assert_eq!(screen.progress(), 1.0);
    }

    #[test]
    fn installed_package_is_removed() {
        let pkg = test_package("App", PackageStatus::Installed, "tool", "none");
        let h = harness(FakeStore::with_packages(vec![pkg.clone()]));
        let mut screen = DetailsScreen::new(pkg, h.ctx.clone());
        assert!(screen.confirm(None));
        wait_for_event(&mut screen);
        assert_eq!(h.store.removes.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.installs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_operation_still_returns_to_idle_with_error() {
        let pkg = test_package("App", PackageStatus::NeedsUpdate, "tool", "none");
        let store = FakeStore {
            fail: true,
            ..FakeStore::with_packages(vec![pkg.clone()])
        };
        let h = harness(store);
        let mut screen = DetailsScreen::new(pkg, h.ctx.clone());
        assert!(screen.confirm(None));
        match wait_for_event(&mut screen) {
            ScreenEvent::CloseAndRefresh { error: Some(e) } => assert!(e.contains("transfer failed")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(screen.state(), ActionState::Idle);
    }

    #[test]
    fn gate_is_shared_across_screens() {
        let a = test_package("A", PackageStatus::NeedsGet, "tool", "none");
        let b = test_package("B", PackageStatus::NeedsGet, "tool", "none");
        let (store, release) = FakeStore::with_packages(vec![a.clone(), b.clone()]).gated();
        let h = harness(store);
        let mut first = DetailsScreen::new(a, h.ctx.clone());
        let mut second = DetailsScreen::new(b, h.ctx.clone());

        assert!(first.confirm(None));
        assert!(!second.confirm(None));
        assert_eq!(second.state(), ActionState::Idle);

        drop(release);
        wait_for_event(&mut first);
        assert_eq!(h.store.installs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_and_more_by_author_while_idle() {
        let pkg = test_package("App", PackageStatus::NeedsGet, "tool", "none");
        let h = harness(FakeStore::default());
        let mut screen = DetailsScreen::new(pkg, h.ctx.clone());
        assert!(matches!(screen.cancel(), Some(ScreenEvent::Close)));
        match screen.handle(ScreenInput::MoreByAuthor, None) {
            Some(ScreenEvent::SearchAuthor(a)) => assert_eq!(a, "tester"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn launch_is_ignored_without_capability() {
        let pkg = test_package("App", PackageStatus::NeedsGet, "tool", "switch/app.nro");
        let h = harness(FakeStore::default());
        let mut screen = DetailsScreen::new(pkg, h.ctx.clone());
        assert!(!screen.can_launch());
        assert!(screen.launch().is_none());
        assert!(screen.error_text().is_none());
        assert!(h.launcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn no_launch_platform_hides_launch() {
        let pkg = test_package("App", PackageStatus::Installed, "tool", "switch/app.nro");
        let mut h = harness(FakeStore::default());
        h.ctx.launcher = Arc::new(NoLaunch);
        let screen = DetailsScreen::new(pkg, h.ctx.clone());
        assert!(!screen.can_launch());
        assert!(screen.launch_label().is_none());
    }

    #[test]
    fn launch_hands_off_to_own_binary() {
        let pkg = test_package("App", PackageStatus::Installed, "tool", "switch/app/app.nro");
        let h = harness(FakeStore::default());
        let target = h.ctx.config.storage_path("switch/app/app.nro");
        touch(target.clone());

        let mut screen = DetailsScreen::new(pkg, h.ctx.clone());
        assert_eq!(screen.launch_label(), Some("Launch"));
        assert!(screen.launch().is_none());
        let calls = h.launcher.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, target);
        assert_eq!(calls[0].1, target.display().to_string());
    }

    #[test]
    fn missing_binary_disables_launch_and_shows_error() {
        let pkg = test_package("App", PackageStatus::Installed, "tool", "switch/app/app.nro");
        let h = harness(FakeStore::default());
        let mut screen = DetailsScreen::new(pkg, h.ctx.clone());
        assert!(screen.can_launch());
        screen.launch();
        assert!(!screen.can_launch());
        assert_eq!(screen.error_text(), Some(LAUNCH_ERROR_TEXT));
        assert_eq!(screen.state(), ActionState::Idle);

        // further attempts are no-ops
        screen.launch();
        assert!(h.launcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn refused_handoff_is_reported_like_missing_target() {
        let pkg = test_package("App", PackageStatus::Installed, "tool", "switch/app/app.nro");
        let mut h = harness(FakeStore::default());
        let failing = Arc::new(RecordingLauncher {
            fail: true,
            ..Default::default()
        });
        h.ctx.launcher = failing.clone();
        touch(h.ctx.config.storage_path("switch/app/app.nro"));

        let mut screen = DetailsScreen::new(pkg, h.ctx.clone());
        assert!(screen.can_launch());
        assert!(screen.launch().is_none());
        assert!(!screen.can_launch());
        assert_eq!(screen.error_text(), Some(LAUNCH_ERROR_TEXT));
        assert_eq!(screen.state(), ActionState::Idle);
        assert_eq!(failing.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn theme_launch_builds_injector_context() {
        let injector = test_package(
            crate::config::DEFAULT_INJECTOR,
            PackageStatus::Installed,
            "tool",
            "switch/NXThemes/installer.nro",
        );
        let theme = test_package("Dark", PackageStatus::Installed, "theme", "none");
        let h = harness(FakeStore::with_packages(vec![injector]));
        let cfg = h.ctx.config.clone();
        let target = cfg.storage_path("switch/NXThemes/installer.nro");
        touch(target.clone());
        let mdir = cfg.install_root.join("Dark");
        fs::create_dir_all(&mdir).unwrap();
        fs::write(mdir.join(MANIFEST_FILE), "U: themes/my theme.nxtheme\nU: themes/b.jpg\n").unwrap();

        let mut screen = DetailsScreen::new(theme, h.ctx.clone());
        assert_eq!(screen.launch_label(), Some("Inject"));
        assert!(screen.launch().is_none());
        assert!(screen.error_text().is_none());

        let calls = h.launcher.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, target);
        let theme_path = cfg.storage_path("themes/my theme.nxtheme").display().to_string();
        let expected = format!(
            "{} installtheme={}",
            target.display(),
            theme_path.replace(' ', SPACE_TOKEN)
        );
        assert_eq!(calls[0].1, expected);
    }

    #[test]
    fn theme_without_manifest_fails_before_handoff() {
        let injector = test_package(
            crate::config::DEFAULT_INJECTOR,
            PackageStatus::Installed,
            "tool",
            "switch/NXThemes/installer.nro",
        );
        let theme = test_package("Dark", PackageStatus::Installed, "theme", "none");
        let h = harness(FakeStore::with_packages(vec![injector]));
        touch(h.ctx.config.storage_path("switch/NXThemes/installer.nro"));

        let mut screen = DetailsScreen::new(theme, h.ctx.clone());
        screen.launch();
        assert!(!screen.can_launch());
        assert_eq!(screen.error_text(), Some(LAUNCH_ERROR_TEXT));
        assert!(h.launcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn theme_with_uninstalled_injector_opens_injector_details() {
        let injector = test_package(
            crate::config::DEFAULT_INJECTOR,
            PackageStatus::NeedsGet,
            "tool",
            "switch/NXThemes/installer.nro",
        );
        let theme = test_package("Dark", PackageStatus::Installed, "theme", "none");
        let h = harness(FakeStore::with_packages(vec![injector]));
        let mut screen = DetailsScreen::new(theme, h.ctx.clone());
        assert_eq!(screen.launch_label(), Some("Injector"));
        match screen.launch() {
            Some(ScreenEvent::OpenDetails(p)) => assert_eq!(p.pkg_name, crate::config::DEFAULT_INJECTOR),
            other => panic!("unexpected {:?}", other),
        }
        assert!(screen.can_launch());
    }

    #[test]
    fn theme_without_injector_in_catalog_cannot_launch() {
        let theme = test_package("Dark", PackageStatus::Installed, "theme", "none");
        let h = harness(FakeStore::default());
        let screen = DetailsScreen::new(theme, h.ctx.clone());
        assert!(!screen.can_launch());
    }
}
