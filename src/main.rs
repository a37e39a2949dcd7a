// main.rs - TrayShell Demo Entry Point
//
// Brings up a tray icon with a small menu, logs the shell lifecycle
// events, and runs the native loop until the tray quits.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use winit::event_loop::{ControlFlow, EventLoop};

use trayshell::{
    EventType, NativeTrayBackend, Shell, ShellConfig, TrayBackend, TrayCommand, TrayPhase,
};

const TAB_HOME: &str = "Home";
const TAB_ABOUT: &str = "About";

fn main() -> Result<()> {
    let config = ShellConfig::load();

    // RUST_LOG takes precedence over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting {}", config.app_name);

    let icon = match config.load_icon() {
        Ok(icon) => icon,
        Err(e) => {
            warn!("Using placeholder tray icon: {:#}", e);
            None
        }
    };

    let event_loop = EventLoop::<TrayCommand>::with_user_event()
        .build()
        .context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let (backend, mut host) =
        NativeTrayBackend::create(&event_loop).context("Failed to create tray backend")?;

    let mut builder = Shell::builder(config)
        .backend(Arc::clone(&backend) as Arc<dyn TrayBackend>)
        .tab(TAB_HOME)
        .tab(TAB_ABOUT);
    if let Some(icon) = icon {
        builder = builder.tray_icon(icon);
    }
    let shell = builder.build();

    let menu_shell = shell.clone();
    shell.register_tray(move |menu| {
        let s = menu_shell.clone();
        menu.add_menu_item("Show/Hide", "Toggle the main window", move || s.toggle_window());

        let s = menu_shell.clone();
        menu.add_menu_item(TAB_HOME, "Go to the home tab", move || {
            s.switch_tab(TAB_HOME);
        });

        let s = menu_shell.clone();
        menu.add_menu_item(TAB_ABOUT, "Go to the about tab", move || {
            s.switch_tab(TAB_ABOUT);
        });

        menu.add_separator();

        let s = menu_shell;
        menu.add_menu_item("Quit", "Quit the application", move || s.exit());
    });

    shell.on_event(EventType::APP_STARTED, |_| info!("Application started"));
    shell.on_event(EventType::TRAY_READY, |_| info!("Tray ready"));
    shell.on_event(EventType::WINDOW_SHOWN, |_| info!("Window shown"));
    shell.on_event(EventType::WINDOW_HIDDEN, |_| info!("Window hidden"));
    shell.on_event(EventType::TAB_SWITCHED, |event| {
        if let Some(tab) = event.data::<String>() {
            info!("Switched to {}", tab);
        }
    });
    // The demo has nothing to show without a tray, so a failed start ends
    // the event loop instead of retrying.
    let exit_shell = shell.clone();
    shell.on_event(EventType::TRAY_EXITED, move |_| {
        let failed = exit_shell
            .tray()
            .is_some_and(|tray| tray.phase() == TrayPhase::Starting);
        if failed {
            warn!("Tray failed to start, stopping");
            backend.quit();
        } else {
            info!("Tray exited");
        }
    });
    shell.on_event(EventType::APP_EXITING, |_| info!("Application exiting"));

    shell.start();

    event_loop
        .run_app(&mut host)
        .context("Event loop terminated with an error")?;

    shell.exit();
    info!("Shutdown complete");
    Ok(())
}
