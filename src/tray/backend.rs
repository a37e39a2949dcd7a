// tray/backend.rs - Tray Backend Capability
//
// The contract every native tray library wrapper satisfies. The controller
// only talks to this trait, so tests substitute a deterministic fake.

use std::fmt;
use std::sync::Arc;

use super::error::TrayResult;

/// Menu click callback
pub type ClickHandler = Arc<dyn Fn() + Send + Sync>;

/// Fired once from the native loop when the tray icon is live
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Fired once from the native loop when the tray has been torn down
pub type ExitCallback = Box<dyn FnOnce() + Send>;

/// Stable identity of a menu item inside one backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MenuItemId(String);

impl MenuItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live menu item owned by a backend
pub trait MenuItem: Send + Sync {
    fn id(&self) -> &MenuItemId;

    fn set_title(&self, title: &str);

    fn check(&self);
    fn uncheck(&self);
    fn is_checked(&self) -> bool;

    fn enable(&self);
    fn disable(&self);
    fn is_enabled(&self) -> bool;

    /// Replace the click handler. The previous handler stops firing.
    fn on_click(&self, handler: ClickHandler);
}

/// Shared handle to a backend menu item
pub type MenuItemHandle = Arc<dyn MenuItem>;

/// Native tray library wrapper.
///
/// `initialize` attaches to the native subsystem and returns without waiting
/// for the icon to appear; `on_ready` fires later from the native loop.
/// Mutations issued before `on_ready` has fired have backend-defined results,
/// which is why application code goes through [`super::TrayController`].
pub trait TrayBackend: Send + Sync {
    /// Attach to the native tray subsystem
    fn initialize(&self, on_ready: ReadyCallback, on_exit: ExitCallback) -> TrayResult<()>;

    /// Set the tray icon from encoded image bytes
    fn set_icon(&self, icon: &[u8]);

    /// Set the tray title (not shown on every platform)
    fn set_title(&self, title: &str);

    fn set_tooltip(&self, tooltip: &str);

    /// Append a menu item. The tooltip is advisory; backends without menu
    /// tooltips ignore it.
    fn add_menu_item(
        &self,
        title: &str,
        tooltip: &str,
        handler: Option<ClickHandler>,
    ) -> MenuItemHandle;

    fn add_separator(&self);

    /// Request teardown. `on_exit` fires once the subsystem is gone.
    fn quit(&self);

    fn is_running(&self) -> bool;
}
