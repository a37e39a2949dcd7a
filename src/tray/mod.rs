// tray/mod.rs - System Tray
//
// The lifecycle controller application code talks to, the backend contract
// it drives, and the native tray-icon implementation of that contract.

mod backend;
mod controller;
mod dispatch;
mod error;
mod native;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    ClickHandler, ExitCallback, MenuItem, MenuItemHandle, MenuItemId, ReadyCallback, TrayBackend,
};
pub use controller::{TrayController, TrayPhase};
pub use dispatch::{ClickDispatcher, ClickSender};
pub use error::{TrayError, TrayResult};
pub use native::{NativeMenuItem, NativeTrayBackend, NativeTrayHost, TrayCommand};
