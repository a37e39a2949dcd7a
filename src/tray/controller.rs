// tray/controller.rs - Tray Lifecycle Controller
//
// Gives application code a "configure the tray now" API while the native
// backend starts asynchronously. Calls made before the backend is ready are
// queued and replayed in order once it reports readiness.
//
// Locking: one mutex guards the whole controller state. It is held only to
// inspect or mutate that state and is always released before calling into
// the backend, since the backend may call back into the controller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, error, info, warn};

use super::backend::{ClickHandler, MenuItemHandle, TrayBackend};
use super::error::{TrayError, TrayResult};
use crate::event::{EventBus, EventType};

/// Lifecycle phase of the tray
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayPhase {
    /// `start` has not been called yet
    Stopped,
    /// Backend initialization requested, waiting for the ready signal
    Starting,
    /// Backend is live and accepts mutations
    Running,
    /// Tray was quit or torn down; final for this controller
    Exited,
}

/// Progress of the backend `initialize` call for the current attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attach {
    Detached,
    Attaching,
    Attached,
}

/// Where a mutation goes given the current phase
enum Route {
    Forward,
    Defer,
    Discard,
}

/// A tray mutation captured before the backend was ready
enum PendingOp {
    AddMenuItem {
        title: String,
        tooltip: String,
        handler: Option<ClickHandler>,
    },
    AddSeparator,
    SetIcon(Vec<u8>),
    SetTitle(String),
    SetTooltip(String),
}

impl PendingOp {
    fn apply(self, backend: &dyn TrayBackend) {
        match self {
            PendingOp::AddMenuItem {
                title,
                tooltip,
                handler,
            } => {
                backend.add_menu_item(&title, &tooltip, handler);
            }
            PendingOp::AddSeparator => backend.add_separator(),
            PendingOp::SetIcon(icon) => backend.set_icon(&icon),
            PendingOp::SetTitle(title) => backend.set_title(&title),
            PendingOp::SetTooltip(tooltip) => backend.set_tooltip(&tooltip),
        }
    }
}

struct ControllerState {
    phase: TrayPhase,
    attach: Attach,
    /// Incremented per `start`; callbacks from older attempts are ignored
    attempt: u64,
    /// Set while the ready handler replays `pending`
    draining: bool,
    /// `quit` arrived while starting; tear down as soon as the backend is up
    quit_requested: bool,
    icon: Option<Vec<u8>>,
    title: Option<String>,
    tooltip: Option<String>,
    pending: VecDeque<PendingOp>,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            phase: TrayPhase::Stopped,
            attach: Attach::Detached,
            attempt: 0,
            draining: false,
            quit_requested: false,
            icon: None,
            title: None,
            tooltip: None,
            pending: VecDeque::new(),
        }
    }

    // Calls issued while the queue drains are queued behind it so that
    // everything issued before readiness reaches the backend first.
    fn route(&self) -> Route {
        match self.phase {
            TrayPhase::Running if !self.draining => Route::Forward,
            TrayPhase::Exited => Route::Discard,
            _ => Route::Defer,
        }
    }

    fn teardown(&mut self) {
        self.phase = TrayPhase::Exited;
        self.draining = false;
        self.pending.clear();
    }
}

struct Inner {
    backend: Arc<dyn TrayBackend>,
    bus: Option<EventBus>,
    state: Mutex<ControllerState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tray lifecycle controller.
///
/// Cloning yields another handle to the same controller, so menu click
/// handlers can capture one.
#[derive(Clone)]
pub struct TrayController {
    inner: Arc<Inner>,
}

impl TrayController {
    pub fn new(backend: Arc<dyn TrayBackend>) -> Self {
        Self::build(backend, None)
    }

    /// Controller that announces `tray.ready` and `tray.exit` on `bus`
    pub fn with_events(backend: Arc<dyn TrayBackend>, bus: EventBus) -> Self {
        Self::build(backend, Some(bus))
    }

    fn build(backend: Arc<dyn TrayBackend>, bus: Option<EventBus>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                bus,
                state: Mutex::new(ControllerState::new()),
            }),
        }
    }

    pub fn phase(&self) -> TrayPhase {
        self.inner.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == TrayPhase::Running
    }

    /// Number of operations waiting for the backend
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Ask the backend to bring the tray up.
    ///
    /// Returns once the backend has attached; readiness is reported later
    /// through the `tray.ready` event. A backend failure, whether returned
    /// here or reported as an exit before readiness, leaves the tray in
    /// [`TrayPhase::Starting`] with its queue intact, and `start` may be
    /// called again. Nothing retries automatically.
    pub fn start(&self) -> TrayResult<()> {
        let attempt = {
            let mut state = self.inner.lock();
            match (state.phase, state.attach) {
                (TrayPhase::Running, _) => {
                    return Err(TrayError::InvalidState("tray is already running"))
                }
                (TrayPhase::Exited, _) => {
                    return Err(TrayError::InvalidState("tray has already exited"))
                }
                (TrayPhase::Starting, Attach::Attaching | Attach::Attached) => {
                    return Err(TrayError::InvalidState("tray start already in progress"))
                }
                (TrayPhase::Stopped, _) | (TrayPhase::Starting, Attach::Detached) => {}
            }
            state.phase = TrayPhase::Starting;
            state.attach = Attach::Attaching;
            state.attempt += 1;
            state.attempt
        };

        info!(
            "Starting system tray (attempt {}, {} queued operations)",
            attempt,
            self.pending_len()
        );

        let on_ready = {
            let weak = Arc::downgrade(&self.inner);
            Box::new(move || {
                if let Some(controller) = Self::upgrade(&weak) {
                    controller.on_ready_received(attempt);
                }
            })
        };
        let on_exit = {
            let weak = Arc::downgrade(&self.inner);
            Box::new(move || {
                if let Some(controller) = Self::upgrade(&weak) {
                    controller.on_exit_received(attempt);
                }
            })
        };

        let result = self.inner.backend.initialize(on_ready, on_exit);

        let mut state = self.inner.lock();
        if state.attempt == attempt {
            // An exit fired from inside `initialize` has already detached us.
            match &result {
                Ok(()) if state.attach == Attach::Attaching => state.attach = Attach::Attached,
                Ok(()) => {}
                Err(_) => state.attach = Attach::Detached,
            }
        }
        drop(state);

        if let Err(e) = &result {
            error!("Failed to start system tray: {}", e);
        }
        result
    }

    /// Tear the tray down. Only a running tray touches the backend; calling
    /// this before `start` or after exit does nothing.
    pub fn quit(&self) {
        let was_running = {
            let mut state = self.inner.lock();
            match (state.phase, state.attach) {
                (TrayPhase::Running, _) => {
                    state.teardown();
                    true
                }
                (TrayPhase::Starting, Attach::Attaching | Attach::Attached) => {
                    state.teardown();
                    state.quit_requested = true;
                    info!("Tray quit requested before ready, shutting down once it attaches");
                    false
                }
                (phase, _) => {
                    debug!("Tray quit ignored in phase {:?}", phase);
                    return;
                }
            }
        };

        if was_running {
            info!("Quitting system tray");
            self.inner.backend.quit();
            self.notify(EventType::TRAY_EXITED);
        }
    }

    /// Set the tray icon (encoded image bytes). The last value set before
    /// readiness is applied once the tray is ready.
    pub fn set_icon(&self, icon: impl Into<Vec<u8>>) {
        let icon = icon.into();
        {
            let mut state = self.inner.lock();
            state.icon = Some(icon.clone());
            match state.route() {
                Route::Forward => {}
                Route::Defer if state.phase == TrayPhase::Running => {
                    state.pending.push_back(PendingOp::SetIcon(icon));
                    return;
                }
                Route::Defer | Route::Discard => return,
            }
        }
        self.inner.backend.set_icon(&icon);
    }

    /// Set the tray title, with the same deferral rules as [`Self::set_icon`]
    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        {
            let mut state = self.inner.lock();
            state.title = Some(title.clone());
            match state.route() {
                Route::Forward => {}
                Route::Defer if state.phase == TrayPhase::Running => {
                    state.pending.push_back(PendingOp::SetTitle(title));
                    return;
                }
                Route::Defer | Route::Discard => return,
            }
        }
        self.inner.backend.set_title(&title);
    }

    /// Set the tray tooltip, with the same deferral rules as [`Self::set_icon`]
    pub fn set_tooltip(&self, tooltip: impl Into<String>) {
        let tooltip = tooltip.into();
        {
            let mut state = self.inner.lock();
            state.tooltip = Some(tooltip.clone());
            match state.route() {
                Route::Forward => {}
                Route::Defer if state.phase == TrayPhase::Running => {
                    state.pending.push_back(PendingOp::SetTooltip(tooltip));
                    return;
                }
                Route::Defer | Route::Discard => return,
            }
        }
        self.inner.backend.set_tooltip(&tooltip);
    }

    /// Append a menu item.
    ///
    /// Returns the live item when the tray is running. Before readiness the
    /// item is not yet materialized: the call is queued and `None` is
    /// returned. Wait for `tray.ready` before relying on item handles.
    pub fn add_menu_item<F>(&self, title: &str, tooltip: &str, on_click: F) -> Option<MenuItemHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_menu_entry(title, tooltip, Some(Arc::new(on_click)))
    }

    /// Like [`Self::add_menu_item`] with an optional, already shared handler
    pub fn add_menu_entry(
        &self,
        title: &str,
        tooltip: &str,
        handler: Option<ClickHandler>,
    ) -> Option<MenuItemHandle> {
        {
            let mut state = self.inner.lock();
            match state.route() {
                Route::Forward => {}
                Route::Defer => {
                    debug!("Queueing tray menu item {:?}", title);
                    state.pending.push_back(PendingOp::AddMenuItem {
                        title: title.to_string(),
                        tooltip: tooltip.to_string(),
                        handler,
                    });
                    return None;
                }
                Route::Discard => {
                    warn!("Tray has exited, dropping menu item {:?}", title);
                    return None;
                }
            }
        }
        Some(self.inner.backend.add_menu_item(title, tooltip, handler))
    }

    pub fn add_separator(&self) {
        {
            let mut state = self.inner.lock();
            match state.route() {
                Route::Forward => {}
                Route::Defer => {
                    state.pending.push_back(PendingOp::AddSeparator);
                    return;
                }
                Route::Discard => {
                    warn!("Tray has exited, dropping separator");
                    return;
                }
            }
        }
        self.inner.backend.add_separator();
    }

    /// Entry point for the backend's ready signal
    fn on_ready_received(&self, attempt: u64) {
        let (icon, title, tooltip) = {
            let mut state = self.inner.lock();
            if state.attempt != attempt {
                warn!("Ignoring ready signal from stale tray attempt {}", attempt);
                return;
            }
            let phase = state.phase;
            match phase {
                TrayPhase::Starting => {}
                TrayPhase::Exited if state.quit_requested => {
                    state.quit_requested = false;
                    drop(state);
                    info!("Tray became ready after quit was requested, shutting it down");
                    self.inner.backend.quit();
                    return;
                }
                phase => {
                    warn!("Ignoring tray ready signal in phase {:?}", phase);
                    return;
                }
            }
            state.phase = TrayPhase::Running;
            state.draining = true;
            (state.icon.clone(), state.title.clone(), state.tooltip.clone())
        };

        info!("System tray ready");
        let backend = self.inner.backend.as_ref();
        if let Some(icon) = icon.filter(|icon| !icon.is_empty()) {
            backend.set_icon(&icon);
        }
        if let Some(title) = title.filter(|title| !title.is_empty()) {
            backend.set_title(&title);
        }
        if let Some(tooltip) = tooltip.filter(|tooltip| !tooltip.is_empty()) {
            backend.set_tooltip(&tooltip);
        }

        let replayed = self.drain_pending();
        debug!("Replayed {} queued tray operations", replayed);

        if self.is_running() {
            self.notify(EventType::TRAY_READY);
        }
    }

    /// Replay queued operations in FIFO order. The lock is taken per
    /// dequeue and released before each backend call.
    fn drain_pending(&self) -> usize {
        let mut replayed = 0;
        loop {
            let op = {
                let mut state = self.inner.lock();
                if state.phase != TrayPhase::Running {
                    state.pending.clear();
                    state.draining = false;
                    break;
                }
                match state.pending.pop_front() {
                    Some(op) => op,
                    None => {
                        state.draining = false;
                        break;
                    }
                }
            };
            op.apply(self.inner.backend.as_ref());
            replayed += 1;
        }
        replayed
    }

    /// Entry point for the backend's exit signal.
    ///
    /// An exit before readiness is a failed attempt: the queue is kept and
    /// `start` may be called again. Either way `tray.exit` is announced.
    fn on_exit_received(&self, attempt: u64) {
        {
            let mut state = self.inner.lock();
            if state.attempt != attempt {
                debug!("Ignoring exit signal from stale tray attempt {}", attempt);
                return;
            }
            let phase = state.phase;
            match phase {
                TrayPhase::Running => {
                    state.teardown();
                    info!("System tray exited");
                }
                TrayPhase::Starting => {
                    state.attach = Attach::Detached;
                    warn!(
                        "System tray exited before becoming ready, {} operations kept for retry",
                        state.pending.len()
                    );
                }
                TrayPhase::Exited => {
                    state.quit_requested = false;
                    debug!("System tray teardown confirmed");
                    return;
                }
                TrayPhase::Stopped => return,
            }
        }

        self.notify(EventType::TRAY_EXITED);
    }

    fn notify(&self, event_type: EventType) {
        if let Some(bus) = &self.inner.bus {
            // Dispatch off the native loop thread; the handle is not awaited.
            let _ = bus.emit_async(event_type, None);
        }
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tray::testing::{Call, FakeBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn controller(backend: &Arc<FakeBackend>) -> TrayController {
        TrayController::new(Arc::clone(backend) as Arc<dyn TrayBackend>)
    }

    #[test]
    fn menu_built_before_start_is_replayed_in_order() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);

        assert!(tray.add_menu_item("Show", "Show window", || {}).is_none());
        assert!(tray.add_menu_item("About", "About", || {}).is_none());
        tray.add_separator();
        assert!(tray.add_menu_item("Quit", "Exit", || {}).is_none());
        assert_eq!(tray.pending_len(), 4);

        tray.start().unwrap();
        assert_eq!(tray.phase(), TrayPhase::Starting);
        assert_eq!(backend.calls(), vec![Call::Initialize]);

        assert!(backend.fire_ready());
        assert!(tray.is_running());
        assert_eq!(tray.pending_len(), 0);
        assert_eq!(
            backend.calls(),
            vec![
                Call::Initialize,
                Call::AddMenuItem("Show".into()),
                Call::AddMenuItem("About".into()),
                Call::AddSeparator,
                Call::AddMenuItem("Quit".into()),
            ]
        );
    }

    #[test]
    fn quit_before_start_never_touches_backend() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);

        tray.quit();

        assert!(backend.calls().is_empty());
        assert_eq!(tray.phase(), TrayPhase::Stopped);
    }

    #[test]
    fn quit_twice_reaches_backend_once() {
        let backend = FakeBackend::ready_on_init();
        let tray = controller(&backend);
        tray.start().unwrap();
        assert!(tray.is_running());

        tray.quit();
        tray.quit();

        assert_eq!(backend.count(&Call::Quit), 1);
        assert_eq!(tray.phase(), TrayPhase::Exited);
    }

    #[test]
    fn icon_and_tooltip_applied_once_with_last_value() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);

        tray.set_icon(vec![1, 2, 3]);
        tray.set_tooltip("first");
        tray.set_icon(vec![9, 9]);
        tray.set_tooltip("second");
        tray.start().unwrap();
        backend.fire_ready();

        assert_eq!(
            backend.calls(),
            vec![
                Call::Initialize,
                Call::SetIcon(vec![9, 9]),
                Call::SetTooltip("second".into()),
            ]
        );
    }

    #[test]
    fn empty_icon_and_tooltip_are_not_applied() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);

        tray.set_icon(Vec::new());
        tray.set_tooltip("");
        tray.start().unwrap();
        backend.fire_ready();

        assert_eq!(backend.calls(), vec![Call::Initialize]);
    }

    #[test]
    fn title_is_reapplied_after_ready() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);

        tray.set_title("Agent");
        tray.start().unwrap();
        backend.fire_ready();

        assert_eq!(backend.count(&Call::SetTitle("Agent".into())), 1);
    }

    #[test]
    fn failed_start_keeps_queue_and_retry_drains_it() {
        let backend = FakeBackend::new();
        backend.fail_next_inits(1);
        let tray = controller(&backend);

        let err = tray.start().unwrap_err();
        assert!(matches!(err, TrayError::Backend(_)));
        assert_eq!(tray.phase(), TrayPhase::Starting);
        assert!(!tray.is_running());

        assert!(tray.add_menu_item("Show", "", || {}).is_none());
        assert_eq!(tray.pending_len(), 1);
        assert_eq!(backend.calls(), vec![Call::Initialize]);

        tray.start().unwrap();
        backend.fire_ready();

        assert_eq!(backend.menu_titles(), vec!["Show"]);
        assert_eq!(backend.count(&Call::Initialize), 2);
        assert!(tray.is_running());
    }

    #[test]
    fn calls_after_ready_are_forwarded_immediately() {
        let backend = FakeBackend::ready_on_init();
        let tray = controller(&backend);
        tray.start().unwrap();

        let item = tray.add_menu_item("Live", "", || {});
        tray.set_tooltip("now");
        tray.add_separator();

        assert!(item.is_some());
        assert_eq!(tray.pending_len(), 0);
        assert_eq!(
            backend.calls(),
            vec![
                Call::Initialize,
                Call::AddMenuItem("Live".into()),
                Call::SetTooltip("now".into()),
                Call::AddSeparator,
            ]
        );
    }

    #[test]
    fn live_item_handle_controls_backend_item() {
        let backend = FakeBackend::ready_on_init();
        let tray = controller(&backend);
        tray.start().unwrap();

        let clicks = Arc::new(AtomicUsize::new(0));
        let item = tray.add_menu_item("Toggle", "", || {}).unwrap();
        let counter = Arc::clone(&clicks);
        item.on_click(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        item.check();
        item.disable();

        assert!(backend.click("Toggle"));
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
        assert!(item.is_checked());
        assert!(!item.is_enabled());
    }

    #[test]
    fn replayed_items_keep_their_click_handlers() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);
        let clicks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&clicks);
        tray.add_menu_item("Show", "", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tray.start().unwrap();
        backend.fire_ready();

        assert!(backend.click("Show"));
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn synchronous_readiness_inside_initialize() {
        let backend = FakeBackend::ready_on_init();
        let tray = controller(&backend);
        tray.add_menu_item("Show", "", || {});

        tray.start().unwrap();

        assert!(tray.is_running());
        assert_eq!(backend.menu_titles(), vec!["Show"]);
    }

    #[test]
    fn calls_racing_the_drain_queue_behind_it() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);
        tray.add_menu_item("A", "", || {});
        tray.add_menu_item("B", "", || {});

        let racer = tray.clone();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_hook = Arc::clone(&fired);
        backend.set_hook(move |call| {
            if *call == Call::AddMenuItem("A".into()) && fired_hook.fetch_add(1, Ordering::SeqCst) == 0 {
                assert!(racer.add_menu_item("late", "", || {}).is_none());
            }
        });

        tray.start().unwrap();
        backend.fire_ready();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(backend.menu_titles(), vec!["A", "B", "late"]);
        assert_eq!(tray.pending_len(), 0);
    }

    #[test]
    fn backend_exit_stops_without_second_quit() {
        let backend = FakeBackend::ready_on_init();
        let tray = controller(&backend);
        tray.start().unwrap();

        assert!(backend.fire_exit());

        assert_eq!(tray.phase(), TrayPhase::Exited);
        assert_eq!(backend.count(&Call::Quit), 0);
        tray.quit();
        assert_eq!(backend.count(&Call::Quit), 0);
    }

    #[test]
    fn exited_tray_discards_menu_changes_and_refuses_restart() {
        let backend = FakeBackend::ready_on_init();
        let tray = controller(&backend);
        tray.start().unwrap();
        tray.quit();

        assert!(tray.add_menu_item("Late", "", || {}).is_none());
        tray.add_separator();
        assert_eq!(tray.pending_len(), 0);
        assert!(backend.menu_titles().is_empty());
        assert!(matches!(tray.start(), Err(TrayError::InvalidState(_))));
    }

    #[test]
    fn start_twice_is_rejected() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);
        tray.start().unwrap();

        assert!(matches!(tray.start(), Err(TrayError::InvalidState(_))));
        backend.fire_ready();
        assert!(matches!(tray.start(), Err(TrayError::InvalidState(_))));
        assert_eq!(backend.count(&Call::Initialize), 1);
    }

    #[test]
    fn quit_while_starting_shuts_down_on_ready() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);
        tray.add_menu_item("Show", "", || {});
        tray.start().unwrap();

        tray.quit();
        assert_eq!(tray.phase(), TrayPhase::Exited);
        assert_eq!(backend.count(&Call::Quit), 0);

        backend.fire_ready();
        assert_eq!(backend.count(&Call::Quit), 1);
        assert!(backend.menu_titles().is_empty());

        backend.fire_exit();
        assert_eq!(backend.count(&Call::Quit), 1);
    }

    #[test]
    fn ready_and_exit_are_announced_on_the_bus() {
        let backend = FakeBackend::new();
        let bus = EventBus::new();
        let (tx, rx) = mpsc::channel();
        for event_type in [EventType::TRAY_READY, EventType::TRAY_EXITED] {
            let tx = tx.clone();
            bus.on(event_type, move |event| {
                tx.send(event.event_type().clone()).unwrap();
            });
        }
        let tray = TrayController::with_events(Arc::clone(&backend) as Arc<dyn TrayBackend>, bus);

        tray.start().unwrap();
        assert!(rx.try_recv().is_err());
        backend.fire_ready();
        let timeout = Duration::from_secs(5);
        assert_eq!(rx.recv_timeout(timeout).unwrap(), EventType::TRAY_READY);

        tray.quit();
        assert_eq!(rx.recv_timeout(timeout).unwrap(), EventType::TRAY_EXITED);
    }

    #[test]
    fn controller_dropped_before_ready_ignores_callback() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);
        tray.add_menu_item("Show", "", || {});
        tray.start().unwrap();
        drop(tray);

        assert!(backend.fire_ready());
        assert!(backend.menu_titles().is_empty());
    }

    #[test]
    fn exit_before_ready_allows_retry_with_queue_kept() {
        let backend = FakeBackend::new();
        let tray = controller(&backend);
        tray.add_menu_item("Show", "", || {});

        tray.start().unwrap();
        assert!(backend.fire_exit());
        assert_eq!(tray.phase(), TrayPhase::Starting);
        assert_eq!(tray.pending_len(), 1);
        assert!(backend.menu_titles().is_empty());

        tray.start().unwrap();
        assert!(backend.fire_ready());

        assert!(tray.is_running());
        assert_eq!(backend.count(&Call::Initialize), 2);
        assert_eq!(backend.menu_titles(), vec!["Show"]);
        assert_eq!(tray.pending_len(), 0);
    }

    #[test]
    fn exit_before_ready_is_announced() {
        let backend = FakeBackend::new();
        let bus = EventBus::new();
        let (tx, rx) = mpsc::channel();
        bus.on(EventType::TRAY_EXITED, move |event| {
            tx.send(event.event_type().clone()).unwrap();
        });
        let tray = TrayController::with_events(Arc::clone(&backend) as Arc<dyn TrayBackend>, bus);

        tray.start().unwrap();
        backend.fire_exit();

        let announced = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(announced, EventType::TRAY_EXITED);
        assert_eq!(tray.phase(), TrayPhase::Starting);
    }

    #[test]
    fn quit_during_replay_drops_the_rest() {
        let backend = FakeBackend::new();
        let bus = EventBus::new();
        let (ready_tx, ready_rx) = mpsc::channel();
        let (exit_tx, exit_rx) = mpsc::channel();
        bus.on(EventType::TRAY_READY, move |_| {
            ready_tx.send(()).unwrap();
        });
        bus.on(EventType::TRAY_EXITED, move |_| {
            exit_tx.send(()).unwrap();
        });
        let tray = TrayController::with_events(Arc::clone(&backend) as Arc<dyn TrayBackend>, bus);
        tray.add_menu_item("A", "", || {});
        tray.add_separator();
        tray.add_menu_item("B", "", || {});

        let quitter = tray.clone();
        backend.set_hook(move |call| {
            if *call == Call::AddMenuItem("A".into()) {
                quitter.quit();
            }
        });

        tray.start().unwrap();
        backend.fire_ready();

        assert_eq!(tray.phase(), TrayPhase::Exited);
        assert_eq!(tray.pending_len(), 0);
        assert_eq!(backend.menu_titles(), vec!["A"]);
        assert_eq!(backend.count(&Call::AddSeparator), 0);
        assert_eq!(backend.count(&Call::Quit), 1);

        exit_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(ready_rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
