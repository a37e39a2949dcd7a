// app/shell.rs - Application Shell
//
// Wires the event bus to the tray controller and owns window/tab state.
// `start` brings the tray up and announces `app.start`; `exit` quits the
// tray and announces `app.exit`, each exactly once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use super::state::{ShellMode, ShellState};
use crate::config::ShellConfig;
use crate::event::{Event, EventBus, EventType, Payload};
use crate::tray::{TrayBackend, TrayController};

/// Closure that builds the tray menu during `Shell::start`
pub type TraySetup = Box<dyn FnOnce(&TrayMenu) + Send>;

/// Restricted view of the tray handed to the setup closure
pub struct TrayMenu {
    tray: TrayController,
}

impl TrayMenu {
    pub fn add_menu_item<F>(&self, title: &str, tooltip: &str, on_click: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.tray.add_menu_item(title, tooltip, on_click);
    }

    pub fn add_separator(&self) {
        self.tray.add_separator();
    }

    pub fn set_icon(&self, icon: impl Into<Vec<u8>>) {
        self.tray.set_icon(icon);
    }

    pub fn set_tooltip(&self, tooltip: impl Into<String>) {
        self.tray.set_tooltip(tooltip);
    }
}

/// Builder for [`Shell`]
pub struct ShellBuilder {
    config: ShellConfig,
    icon: Option<Vec<u8>>,
    backend: Option<Arc<dyn TrayBackend>>,
    tray_setup: Option<TraySetup>,
    tabs: Vec<String>,
}

impl ShellBuilder {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            icon: None,
            backend: None,
            tray_setup: None,
            tabs: Vec::new(),
        }
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    pub fn tray_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.config.tray_tooltip = tooltip.into();
        self
    }

    /// Encoded icon image applied when the shell starts
    pub fn tray_icon(mut self, icon: Vec<u8>) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn tray_enabled(mut self, enabled: bool) -> Self {
        self.config.tray_enabled = enabled;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn TrayBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn tray_setup<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&TrayMenu) + Send + 'static,
    {
        self.tray_setup = Some(Box::new(setup));
        self
    }

    pub fn tab(mut self, name: impl Into<String>) -> Self {
        self.tabs.push(name.into());
        self
    }

    pub fn build(self) -> Shell {
        let bus = EventBus::new();
        let tray = match (self.config.tray_enabled, self.backend) {
            (true, Some(backend)) => Some(TrayController::with_events(backend, bus.clone())),
            (true, None) => {
                warn!("Tray enabled but no tray backend supplied, running without tray");
                None
            }
            (false, _) => None,
        };

        let mut state = ShellState::new();
        for tab in &self.tabs {
            state.add_tab(tab);
        }

        Shell {
            inner: Arc::new(ShellInner {
                config: self.config,
                icon: self.icon,
                bus,
                tray,
                tray_setup: Mutex::new(self.tray_setup),
                state: Mutex::new(state),
            }),
        }
    }
}

struct ShellInner {
    config: ShellConfig,
    icon: Option<Vec<u8>>,
    bus: EventBus,
    tray: Option<TrayController>,
    tray_setup: Mutex<Option<TraySetup>>,
    state: Mutex<ShellState>,
}

/// Application shell handle. Clones share the same shell.
#[derive(Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

impl Shell {
    pub fn builder(config: ShellConfig) -> ShellBuilder {
        ShellBuilder::new(config)
    }

    pub fn config(&self) -> &ShellConfig {
        &self.inner.config
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }

    /// The tray controller, when the tray is enabled
    pub fn tray(&self) -> Option<&TrayController> {
        self.inner.tray.as_ref()
    }

    pub fn on_event<F>(&self, event_type: EventType, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.on(event_type, handler);
    }

    /// Set the closure that builds the tray menu. Replaces any earlier one;
    /// has no effect once the shell has started.
    pub fn register_tray<F>(&self, setup: F)
    where
        F: FnOnce(&TrayMenu) + Send + 'static,
    {
        if self.state().mode != ShellMode::Created {
            warn!("Tray setup registered after start, ignoring");
            return;
        }
        *self
            .inner
            .tray_setup
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(setup));
    }

    /// Register a tab. Returns `false` if the name is already taken.
    pub fn register_tab(&self, name: &str) -> bool {
        let added = self.state().add_tab(name);
        if added {
            debug!("Registered tab {:?}", name);
        } else {
            warn!("Tab {:?} already registered", name);
        }
        added
    }

    pub fn tabs(&self) -> Vec<String> {
        self.state().tabs.clone()
    }

    pub fn active_tab(&self) -> Option<String> {
        self.state().active_tab.clone()
    }

    /// Switch to a registered tab and emit `tab.switch` with its name.
    /// Returns `false` for an unknown tab.
    pub fn switch_tab(&self, name: &str) -> bool {
        if !self.state().select_tab(name) {
            warn!("Unknown tab {:?}", name);
            return false;
        }
        info!("Switched to tab {:?}", name);
        self.emit(EventType::TAB_SWITCHED, Some(Arc::new(name.to_string())));
        true
    }

    pub fn is_window_visible(&self) -> bool {
        self.state().window_visible
    }

    pub fn show_window(&self) {
        self.set_window_visible(true);
    }

    pub fn hide_window(&self) {
        self.set_window_visible(false);
    }

    /// Flip window visibility. The flip happens under the state lock, so
    /// concurrent toggles alternate.
    pub fn toggle_window(&self) {
        let visible = {
            let mut state = self.state();
            state.window_visible = !state.window_visible;
            state.window_visible
        };
        self.announce_visibility(visible);
    }

    /// Configure and start the tray, then announce `app.start`.
    ///
    /// A tray that fails to start is logged and the shell runs without it.
    /// Calling `start` again, or after `exit`, does nothing.
    pub fn start(&self) {
        {
            let mut state = self.state();
            if state.mode != ShellMode::Created {
                warn!("Shell already started");
                return;
            }
            state.mode = ShellMode::Started;
        }

        info!("Starting {}", self.inner.config.app_name);

        if let Some(tray) = &self.inner.tray {
            self.configure_tray(tray);
            if let Err(e) = tray.start() {
                warn!("Continuing without system tray: {}", e);
            }
        }

        self.emit(EventType::APP_STARTED, None);
    }

    /// Quit the tray and announce `app.exit`. Later calls do nothing.
    pub fn exit(&self) {
        let elapsed = {
            let mut state = self.state();
            if state.mode == ShellMode::Exited {
                return;
            }
            state.mode = ShellMode::Exited;
            state.elapsed()
        };

        info!(
            "Exiting {} after {:.1}s",
            self.inner.config.app_name,
            elapsed.as_secs_f32()
        );

        if let Some(tray) = &self.inner.tray {
            tray.quit();
        }
        self.emit(EventType::APP_EXITING, None);
    }

    pub fn is_exited(&self) -> bool {
        self.state().mode == ShellMode::Exited
    }

    fn configure_tray(&self, tray: &TrayController) {
        let config = &self.inner.config;
        if let Some(icon) = &self.inner.icon {
            tray.set_icon(icon.clone());
        }
        tray.set_tooltip(config.tray_tooltip.clone());
        if let Some(title) = &config.tray_title {
            tray.set_title(title.clone());
        }

        let setup = self
            .inner
            .tray_setup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(setup) = setup {
            setup(&TrayMenu { tray: tray.clone() });
        }
    }

    fn set_window_visible(&self, visible: bool) {
        self.state().window_visible = visible;
        self.announce_visibility(visible);
    }

    fn announce_visibility(&self, visible: bool) {
        let event_type = if visible {
            EventType::WINDOW_SHOWN
        } else {
            EventType::WINDOW_HIDDEN
        };
        self.emit(event_type, None);
    }

    fn emit(&self, event_type: EventType, payload: Option<Payload>) {
        self.inner.bus.emit(event_type, payload);
    }

    fn state(&self) -> MutexGuard<'_, ShellState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
