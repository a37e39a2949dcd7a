// app/mod.rs - Application Shell
//
// The host layer: owns the event bus and the tray controller, tracks
// window and tab state, and emits the application lifecycle events.

mod shell;
mod state;

pub use shell::{Shell, ShellBuilder, TrayMenu, TraySetup};
pub use state::{ShellMode, ShellState};
