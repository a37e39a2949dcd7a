// app/state.rs - Core Shell State
//
// Window visibility, registered tabs, and lifecycle flags. Kept free of
// any toolkit types so it can be shared behind the shell's lock.

use std::time::{Duration, Instant};

/// Lifecycle of the shell itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMode {
    /// Built, `start` not called yet
    Created,
    /// Running
    Started,
    /// `exit` has been called
    Exited,
}

/// Single source of truth for shell data
#[derive(Debug)]
pub struct ShellState {
    /// Current lifecycle mode
    pub mode: ShellMode,

    /// Tab names in registration order
    pub tabs: Vec<String>,

    /// Name of the active tab
    pub active_tab: Option<String>,

    /// Whether the main window is shown
    pub window_visible: bool,

    /// Shell creation time
    pub startup_time: Instant,
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellState {
    pub fn new() -> Self {
        Self {
            mode: ShellMode::Created,
            tabs: Vec::new(),
            active_tab: None,
            window_visible: true,
            startup_time: Instant::now(),
        }
    }

    /// Register a tab. The first tab becomes active. Returns `false` for a
    /// duplicate name.
    pub fn add_tab(&mut self, name: &str) -> bool {
        if self.has_tab(name) {
            return false;
        }
        self.tabs.push(name.to_string());
        if self.active_tab.is_none() {
            self.active_tab = Some(name.to_string());
        }
        true
    }

    pub fn has_tab(&self, name: &str) -> bool {
        self.tabs.iter().any(|tab| tab == name)
    }

    /// Make `name` the active tab. Returns `false` if it is not registered.
    pub fn select_tab(&mut self, name: &str) -> bool {
        if !self.has_tab(name) {
            return false;
        }
        self.active_tab = Some(name.to_string());
        true
    }

    /// Get elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.startup_time.elapsed()
    }
}
