// constants.rs - Application-wide Constants
//
// Centralized names, defaults, and other magic numbers.

/// Event type identifiers carried on the event bus
pub mod events {
    /// Application finished starting
    pub const APP_STARTED: &str = "app.start";
    /// Application is about to exit
    pub const APP_EXITING: &str = "app.exit";
    /// Main window became visible
    pub const WINDOW_SHOWN: &str = "window.show";
    /// Main window was hidden
    pub const WINDOW_HIDDEN: &str = "window.hide";
    /// Active tab changed (payload: tab name)
    pub const TAB_SWITCHED: &str = "tab.switch";
    /// Tray icon is live and accepts mutations
    pub const TRAY_READY: &str = "tray.ready";
    /// Tray icon was torn down
    pub const TRAY_EXITED: &str = "tray.exit";
}

/// Thread names
pub mod threads {
    /// Thread running asynchronous event dispatch
    pub const EVENT_DISPATCH: &str = "trayshell-event";
    /// Thread demultiplexing tray menu clicks
    pub const CLICK_DISPATCH: &str = "trayshell-clicks";
}

/// Tray defaults
pub mod tray {
    /// Tooltip used when the configuration does not provide one
    pub const DEFAULT_TOOLTIP: &str = "TrayShell";
    /// Edge length of the generated placeholder icon
    pub const PLACEHOLDER_ICON_SIZE: u32 = 16;
    /// Prefix for backend-generated menu item ids
    pub const MENU_ID_PREFIX: &str = "trayshell-item-";
}

/// Settings persistence
pub mod config {
    /// Directory under the platform config dir
    pub const DIR_NAME: &str = "TrayShell";
    /// Settings file name
    pub const FILE_NAME: &str = "settings.json";
    /// Default log filter
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}
