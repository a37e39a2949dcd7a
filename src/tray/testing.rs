// tray/testing.rs - Deterministic Tray Backend for Tests
//
// Records every backend call and lets the test decide when the native
// loop reports readiness or exit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::backend::{
    ClickHandler, ExitCallback, MenuItem, MenuItemHandle, MenuItemId, ReadyCallback, TrayBackend,
};
use super::dispatch::ClickDispatcher;
use super::error::{TrayError, TrayResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize,
    SetIcon(Vec<u8>),
    SetTitle(String),
    SetTooltip(String),
    AddMenuItem(String),
    AddSeparator,
    Quit,
}

type Hook = Box<dyn FnMut(&Call) + Send>;

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    ready: Mutex<Option<ReadyCallback>>,
    exit: Mutex<Option<ExitCallback>>,
    failing_inits: AtomicUsize,
    ready_on_init: bool,
    running: AtomicBool,
    dispatcher: ClickDispatcher,
    ids_by_title: Mutex<HashMap<String, MenuItemId>>,
    next_id: AtomicUsize,
    hook: Mutex<Option<Hook>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose readiness fires inline from `initialize`
    pub fn ready_on_init() -> Arc<Self> {
        Arc::new(Self {
            ready_on_init: true,
            ..Self::default()
        })
    }

    /// Make the next `count` initialize calls fail
    pub fn fail_next_inits(&self, count: usize) {
        self.failing_inits.store(count, Ordering::SeqCst);
    }

    /// Run `hook` after every recorded call
    pub fn set_hook(&self, hook: impl FnMut(&Call) + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn menu_titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AddMenuItem(title) => Some(title),
                _ => None,
            })
            .collect()
    }

    /// Report readiness as the native loop would. Returns `false` when no
    /// ready callback is pending.
    pub fn fire_ready(&self) -> bool {
        let Some(ready) = self.ready.lock().unwrap().take() else {
            return false;
        };
        self.running.store(true, Ordering::SeqCst);
        ready();
        true
    }

    /// Report teardown as the native loop would
    pub fn fire_exit(&self) -> bool {
        let Some(exit) = self.exit.lock().unwrap().take() else {
            return false;
        };
        self.running.store(false, Ordering::SeqCst);
        exit();
        true
    }

    /// Simulate a click on the item with `title`
    pub fn click(&self, title: &str) -> bool {
        let id = self.ids_by_title.lock().unwrap().get(title).cloned();
        id.is_some_and(|id| self.dispatcher.dispatch(&id))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call.clone());
        let hook = self.hook.lock().unwrap().take();
        if let Some(mut hook) = hook {
            hook(&call);
            let mut slot = self.hook.lock().unwrap();
            if slot.is_none() {
                *slot = Some(hook);
            }
        }
    }
}

impl TrayBackend for FakeBackend {
    fn initialize(&self, on_ready: ReadyCallback, on_exit: ExitCallback) -> TrayResult<()> {
        self.record(Call::Initialize);
        let failing = self.failing_inits.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_inits.store(failing - 1, Ordering::SeqCst);
            return Err(TrayError::backend("no tray host available"));
        }

        *self.ready.lock().unwrap() = Some(on_ready);
        *self.exit.lock().unwrap() = Some(on_exit);
        if self.ready_on_init {
            self.fire_ready();
        }
        Ok(())
    }

    fn set_icon(&self, icon: &[u8]) {
        self.record(Call::SetIcon(icon.to_vec()));
    }

    fn set_title(&self, title: &str) {
        self.record(Call::SetTitle(title.to_string()));
    }

    fn set_tooltip(&self, tooltip: &str) {
        self.record(Call::SetTooltip(tooltip.to_string()));
    }

    fn add_menu_item(
        &self,
        title: &str,
        _tooltip: &str,
        handler: Option<ClickHandler>,
    ) -> MenuItemHandle {
        let id = MenuItemId::new(format!("fake-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        if let Some(handler) = handler {
            self.dispatcher.register(id.clone(), handler);
        }
        self.ids_by_title
            .lock()
            .unwrap()
            .insert(title.to_string(), id.clone());
        self.record(Call::AddMenuItem(title.to_string()));

        Arc::new(FakeMenuItem {
            id,
            title: Mutex::new(title.to_string()),
            checked: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            dispatcher: self.dispatcher.clone(),
        })
    }

    fn add_separator(&self) {
        self.record(Call::AddSeparator);
    }

    fn quit(&self) {
        self.record(Call::Quit);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub struct FakeMenuItem {
    id: MenuItemId,
    title: Mutex<String>,
    checked: AtomicBool,
    enabled: AtomicBool,
    dispatcher: ClickDispatcher,
}

impl MenuItem for FakeMenuItem {
    fn id(&self) -> &MenuItemId {
        &self.id
    }

    fn set_title(&self, title: &str) {
        *self.title.lock().unwrap() = title.to_string();
    }

    fn check(&self) {
        self.checked.store(true, Ordering::SeqCst);
    }

    fn uncheck(&self) {
        self.checked.store(false, Ordering::SeqCst);
    }

    fn is_checked(&self) -> bool {
        self.checked.load(Ordering::SeqCst)
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn on_click(&self, handler: ClickHandler) {
        self.dispatcher.register(self.id.clone(), handler);
    }
}
