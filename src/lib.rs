//! TrayShell - System Tray Lifecycle and Event Bus
//!
//! A lifecycle-safe controller for a system tray icon whose native loop
//! becomes ready asynchronously, plus the in-process event bus the
//! desktop shell uses to announce its lifecycle.

pub mod app;
pub mod config;
pub mod constants;
pub mod event;
pub mod tray;

// Re-export commonly used types
pub use app::{Shell, ShellBuilder, TrayMenu};
pub use config::ShellConfig;
pub use event::{Event, EventBus, EventType, Payload};
pub use tray::{
    MenuItem, MenuItemHandle, NativeTrayBackend, NativeTrayHost, TrayBackend, TrayCommand,
    TrayController, TrayError, TrayPhase, TrayResult,
};
