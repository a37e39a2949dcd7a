// tray/native.rs - Native Tray Backend (tray-icon + winit)
//
// The tray icon and its menu are not thread-safe, so they live in
// `NativeTrayHost` on the event loop thread. `NativeTrayBackend` is the
// thread-safe side: every call becomes a `TrayCommand` sent through the
// event loop proxy. Menu clicks come back through one muda event hook into
// the click dispatcher.
//
// Items start as plain menu items and become check items the first time
// they are checked or unchecked. Native check items toggle themselves on
// click, so the hook mirrors that flip before dispatching.
//
// On Linux tray-icon needs a running GTK main loop; the host only covers
// the winit side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem as PlainMenuItem, PredefinedMenuItem},
    Icon, TrayIcon, TrayIconBuilder,
};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::window::WindowId;

use super::backend::{
    ClickHandler, ExitCallback, MenuItem, MenuItemHandle, MenuItemId, ReadyCallback, TrayBackend,
};
use super::dispatch::{ClickDispatcher, ClickSender};
use super::error::{TrayError, TrayResult};
use crate::constants::tray as defaults;

/// Commands executed on the event loop thread
pub enum TrayCommand {
    Start {
        on_ready: ReadyCallback,
        on_exit: ExitCallback,
    },
    SetIcon(Vec<u8>),
    SetTitle(String),
    SetTooltip(String),
    AddItem { id: MenuItemId, title: String },
    AddSeparator,
    SetItemTitle { id: MenuItemId, title: String },
    SetItemEnabled { id: MenuItemId, enabled: bool },
    SetItemChecked { id: MenuItemId, checked: bool },
    Quit,
}

impl TrayCommand {
    fn name(&self) -> &'static str {
        match self {
            TrayCommand::Start { .. } => "start",
            TrayCommand::SetIcon(_) => "set-icon",
            TrayCommand::SetTitle(_) => "set-title",
            TrayCommand::SetTooltip(_) => "set-tooltip",
            TrayCommand::AddItem { .. } => "add-item",
            TrayCommand::AddSeparator => "add-separator",
            TrayCommand::SetItemTitle { .. } => "set-item-title",
            TrayCommand::SetItemEnabled { .. } => "set-item-enabled",
            TrayCommand::SetItemChecked { .. } => "set-item-checked",
            TrayCommand::Quit => "quit",
        }
    }
}

/// Thread-safe wrapper around the event loop proxy
struct CommandSender {
    proxy: Mutex<EventLoopProxy<TrayCommand>>,
}

impl CommandSender {
    fn send(&self, command: TrayCommand) -> bool {
        let name = command.name();
        let proxy = self.proxy.lock().unwrap_or_else(PoisonError::into_inner);
        if proxy.send_event(command).is_err() {
            error!("Tray event loop closed, dropping {} command", name);
            return false;
        }
        true
    }
}

/// Check state of one item, shared by its handle and the click hook
#[derive(Default)]
struct ItemState {
    checkable: AtomicBool,
    checked: AtomicBool,
}

impl ItemState {
    fn set_checked(&self, checked: bool) {
        self.checkable.store(true, Ordering::SeqCst);
        self.checked.store(checked, Ordering::SeqCst);
    }

    fn is_checked(&self) -> bool {
        self.checked.load(Ordering::SeqCst)
    }

    fn clicked(&self) {
        if self.checkable.load(Ordering::SeqCst) {
            self.checked.fetch_xor(true, Ordering::SeqCst);
        }
    }
}

type ItemStates = Arc<RwLock<HashMap<MenuItemId, Arc<ItemState>>>>;

/// Forward a native menu click to the dispatcher
fn route_click(items: &ItemStates, clicks: &ClickSender, id: MenuItemId) -> bool {
    let state = items
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned();
    if let Some(state) = state {
        state.clicked();
    }
    clicks.send(id)
}

/// Tray backend driving a `tray-icon` icon on a winit event loop
pub struct NativeTrayBackend {
    commands: Arc<CommandSender>,
    running: Arc<AtomicBool>,
    initialized: Arc<AtomicBool>,
    dispatcher: ClickDispatcher,
    items: ItemStates,
    next_id: AtomicU64,
}

impl NativeTrayBackend {
    /// Create the backend and the host that must run on `event_loop`.
    ///
    /// Must be called on the thread that owns the event loop. Starts the
    /// click dispatcher thread and installs the process-wide menu hook.
    pub fn create(event_loop: &EventLoop<TrayCommand>) -> Result<(Arc<Self>, NativeTrayHost)> {
        let dispatcher = ClickDispatcher::new();
        let (clicks, _) = dispatcher
            .spawn()
            .context("Failed to start menu click dispatcher")?;

        let items = ItemStates::default();
        let hook_items = Arc::clone(&items);
        MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
            route_click(&hook_items, &clicks, MenuItemId::new(event.id.0));
        }));

        let running = Arc::new(AtomicBool::new(false));
        let initialized = Arc::new(AtomicBool::new(false));
        let backend = Arc::new(Self {
            commands: Arc::new(CommandSender {
                proxy: Mutex::new(event_loop.create_proxy()),
            }),
            running: Arc::clone(&running),
            initialized: Arc::clone(&initialized),
            dispatcher,
            items,
            next_id: AtomicU64::new(0),
        });

        Ok((backend, NativeTrayHost::new(running, initialized)))
    }
}

impl TrayBackend for NativeTrayBackend {
    fn initialize(&self, on_ready: ReadyCallback, on_exit: ExitCallback) -> TrayResult<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(TrayError::InvalidState("native tray already initialized"));
        }
        // Fire-and-forget: the icon is built when the loop processes this.
        // A build failure arrives as `on_exit` and clears `initialized`.
        if !self.commands.send(TrayCommand::Start { on_ready, on_exit }) {
            self.initialized.store(false, Ordering::SeqCst);
            return Err(TrayError::backend("tray event loop is not running"));
        }
        Ok(())
    }

    fn set_icon(&self, icon: &[u8]) {
        self.commands.send(TrayCommand::SetIcon(icon.to_vec()));
    }

    fn set_title(&self, title: &str) {
        self.commands.send(TrayCommand::SetTitle(title.to_string()));
    }

    fn set_tooltip(&self, tooltip: &str) {
        self.commands.send(TrayCommand::SetTooltip(tooltip.to_string()));
    }

    fn add_menu_item(
        &self,
        title: &str,
        tooltip: &str,
        handler: Option<ClickHandler>,
    ) -> MenuItemHandle {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = MenuItemId::new(format!("{}{}", defaults::MENU_ID_PREFIX, n));
        if !tooltip.is_empty() {
            debug!("Menu item tooltips are not supported natively, ignoring {:?}", tooltip);
        }
        if let Some(handler) = handler {
            self.dispatcher.register(id.clone(), handler);
        }
        let state = Arc::new(ItemState::default());
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::clone(&state));
        self.commands.send(TrayCommand::AddItem {
            id: id.clone(),
            title: title.to_string(),
        });

        Arc::new(NativeMenuItem {
            id,
            commands: Arc::clone(&self.commands),
            dispatcher: self.dispatcher.clone(),
            state,
            enabled: AtomicBool::new(true),
        })
    }

    fn add_separator(&self) {
        self.commands.send(TrayCommand::AddSeparator);
    }

    fn quit(&self) {
        self.commands.send(TrayCommand::Quit);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Handle to an item in the native menu
pub struct NativeMenuItem {
    id: MenuItemId,
    commands: Arc<CommandSender>,
    dispatcher: ClickDispatcher,
    state: Arc<ItemState>,
    enabled: AtomicBool,
}

impl MenuItem for NativeMenuItem {
    fn id(&self) -> &MenuItemId {
        &self.id
    }

    fn set_title(&self, title: &str) {
        self.commands.send(TrayCommand::SetItemTitle {
            id: self.id.clone(),
            title: title.to_string(),
        });
    }

    fn check(&self) {
        self.state.set_checked(true);
        self.commands.send(TrayCommand::SetItemChecked {
            id: self.id.clone(),
            checked: true,
        });
    }

    fn uncheck(&self) {
        self.state.set_checked(false);
        self.commands.send(TrayCommand::SetItemChecked {
            id: self.id.clone(),
            checked: false,
        });
    }

    fn is_checked(&self) -> bool {
        self.state.is_checked()
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        self.commands.send(TrayCommand::SetItemEnabled {
            id: self.id.clone(),
            enabled: true,
        });
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.commands.send(TrayCommand::SetItemEnabled {
            id: self.id.clone(),
            enabled: false,
        });
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn on_click(&self, handler: ClickHandler) {
        self.dispatcher.register(self.id.clone(), handler);
    }
}

/// A native menu entry; plain until first checked or unchecked
enum NativeItem {
    Plain(PlainMenuItem),
    Check(CheckMenuItem),
}

impl NativeItem {
    fn set_text(&self, text: &str) {
        match self {
            NativeItem::Plain(item) => item.set_text(text),
            NativeItem::Check(item) => item.set_text(text),
        }
    }

    fn set_enabled(&self, enabled: bool) {
        match self {
            NativeItem::Plain(item) => item.set_enabled(enabled),
            NativeItem::Check(item) => item.set_enabled(enabled),
        }
    }
}

/// Owner of the native tray icon, driven by the winit event loop
pub struct NativeTrayHost {
    /// The tray icon, present while the tray is live
    tray_icon: Option<TrayIcon>,
    /// Context menu shared with the tray icon
    menu: Menu,
    /// Menu items by id, for later updates
    items: HashMap<MenuItemId, NativeItem>,
    /// Exit callback of the current tray, fired once on teardown
    on_exit: Option<ExitCallback>,
    running: Arc<AtomicBool>,
    /// Cleared when a start fails so the backend accepts another one
    initialized: Arc<AtomicBool>,
}

impl NativeTrayHost {
    fn new(running: Arc<AtomicBool>, initialized: Arc<AtomicBool>) -> Self {
        Self {
            tray_icon: None,
            menu: Menu::new(),
            items: HashMap::new(),
            on_exit: None,
            running,
            initialized,
        }
    }

    fn handle_command(&mut self, event_loop: &ActiveEventLoop, command: TrayCommand) {
        debug!("Tray command: {}", command.name());

        match command {
            TrayCommand::Start { on_ready, on_exit } => match self.build_tray() {
                Ok(tray_icon) => {
                    self.tray_icon = Some(tray_icon);
                    self.on_exit = Some(on_exit);
                    self.running.store(true, Ordering::SeqCst);
                    info!("System tray icon created");
                    on_ready();
                }
                Err(e) => {
                    error!("Failed to create tray icon: {:#}", e);
                    self.running.store(false, Ordering::SeqCst);
                    self.initialized.store(false, Ordering::SeqCst);
                    on_exit();
                }
            },
            TrayCommand::Quit => {
                info!("Tray quit requested");
                self.teardown();
                event_loop.exit();
            }
            command => {
                if let Err(e) = self.apply(command) {
                    error!("Tray update failed: {:#}", e);
                }
            }
        }
    }

    /// Apply a mutation to the live tray
    fn apply(&mut self, command: TrayCommand) -> Result<()> {
        match command {
            TrayCommand::SetIcon(bytes) => {
                let icon = decode_icon(&bytes)?;
                if let Some(tray_icon) = &self.tray_icon {
                    tray_icon.set_icon(Some(icon))?;
                }
            }
            TrayCommand::SetTitle(title) => {
                if let Some(tray_icon) = &self.tray_icon {
                    tray_icon.set_title(Some(title));
                }
            }
            TrayCommand::SetTooltip(tooltip) => {
                if let Some(tray_icon) = &self.tray_icon {
                    tray_icon.set_tooltip(Some(tooltip))?;
                }
            }
            TrayCommand::AddItem { id, title } => {
                let item = PlainMenuItem::with_id(MenuId::new(id.as_str()), &title, true, None);
                self.menu
                    .append(&item)
                    .with_context(|| format!("Failed to add menu item {:?}", title))?;
                self.items.insert(id, NativeItem::Plain(item));
            }
            TrayCommand::AddSeparator => {
                self.menu
                    .append(&PredefinedMenuItem::separator())
                    .context("Failed to add menu separator")?;
            }
            TrayCommand::SetItemTitle { id, title } => {
                if let Some(item) = self.item(&id) {
                    item.set_text(&title);
                }
            }
            TrayCommand::SetItemEnabled { id, enabled } => {
                if let Some(item) = self.item(&id) {
                    item.set_enabled(enabled);
                }
            }
            TrayCommand::SetItemChecked { id, checked } => match self.item(&id) {
                Some(NativeItem::Check(item)) => item.set_checked(checked),
                Some(NativeItem::Plain(_)) => self.make_checkable(id, checked)?,
                None => {}
            },
            TrayCommand::Start { .. } | TrayCommand::Quit => {}
        }
        Ok(())
    }

    /// Swap a plain item for a check item in the same menu position
    fn make_checkable(&mut self, id: MenuItemId, checked: bool) -> Result<()> {
        let plain = match self.items.remove(&id) {
            Some(NativeItem::Plain(plain)) => plain,
            Some(item) => {
                self.items.insert(id, item);
                return Ok(());
            }
            None => return Ok(()),
        };
        let position = self
            .menu
            .items()
            .iter()
            .position(|kind| kind.id() == plain.id());
        let check = CheckMenuItem::with_id(
            plain.id().clone(),
            plain.text(),
            plain.is_enabled(),
            checked,
            None,
        );
        if let Err(e) = self.menu.remove(&plain) {
            self.items.insert(id.clone(), NativeItem::Plain(plain));
            return Err(e).with_context(|| format!("Failed to replace menu item {}", id));
        }
        let added = match position {
            Some(position) => self.menu.insert(&check, position),
            None => self.menu.append(&check),
        };
        added.with_context(|| format!("Failed to add check item {}", id))?;
        self.items.insert(id, NativeItem::Check(check));
        Ok(())
    }

    fn item(&self, id: &MenuItemId) -> Option<&NativeItem> {
        let item = self.items.get(id);
        if item.is_none() {
            warn!("Unknown tray menu item {}", id);
        }
        item
    }

    fn build_tray(&self) -> Result<TrayIcon> {
        TrayIconBuilder::new()
            .with_menu(Box::new(self.menu.clone()))
            .with_tooltip(defaults::DEFAULT_TOOLTIP)
            .with_icon(placeholder_icon()?)
            .build()
            .context("Failed to build tray icon")
    }

    /// Drop the icon and report the exit once
    fn teardown(&mut self) {
        self.tray_icon = None;
        self.running.store(false, Ordering::SeqCst);
        if let Some(on_exit) = self.on_exit.take() {
            info!("System tray torn down");
            on_exit();
        }
    }
}

impl ApplicationHandler<TrayCommand> for NativeTrayHost {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _window_id: WindowId, _event: WindowEvent) {}

    fn user_event(&mut self, event_loop: &ActiveEventLoop, command: TrayCommand) {
        self.handle_command(event_loop, command);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}

/// Decode encoded image bytes (PNG, ICO) into a tray icon
fn decode_icon(bytes: &[u8]) -> Result<Icon> {
    let image = image::load_from_memory(bytes)
        .context("Failed to decode tray icon")?
        .into_rgba8();
    let (width, height) = image.dimensions();
    Ok(Icon::from_rgba(image.into_raw(), width, height)?)
}

/// Icon shown until the application sets one: a blue 'T' on a white frame
fn placeholder_icon() -> Result<Icon> {
    let size = defaults::PLACEHOLDER_ICON_SIZE;
    Ok(Icon::from_rgba(placeholder_rgba(size), size, size)?)
}

fn placeholder_rgba(size: u32) -> Vec<u8> {
    let mut data = vec![0u8; (size * size * 4) as usize];
    let mid = size / 2;

    for y in 0..size {
        for x in 0..size {
            let offset = ((y * size + x) * 4) as usize;
            let pixel: [u8; 4] = if x == 0 || x == size - 1 || y == 0 || y == size - 1 {
                [255, 255, 255, 255]
            } else if (y >= 3 && y <= 4 && x >= 3 && x <= size - 4)
                || (x + 1 >= mid && x <= mid && y >= 3 && y <= size - 4)
            {
                [50, 100, 255, 255]
            } else {
                [0, 0, 0, 0]
            };
            data[offset..offset + 4].copy_from_slice(&pixel);
        }
    }
    data
}
