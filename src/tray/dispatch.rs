// tray/dispatch.rs - Menu Click Dispatch
//
// All menu clicks arrive on one channel and are routed through a table
// from item id to handler, on a single dispatcher thread.

use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use log::{debug, error, warn};

use super::backend::{ClickHandler, MenuItemId};
use crate::constants::threads;

/// Dispatch table from menu item id to click handler.
///
/// Cloning yields a handle to the same table.
#[derive(Clone, Default)]
pub struct ClickDispatcher {
    table: Arc<RwLock<HashMap<MenuItemId, ClickHandler>>>,
}

impl ClickDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `id`, replacing any previous one.
    ///
    /// Returns `true` when a handler was replaced.
    pub fn register(&self, id: MenuItemId, handler: ClickHandler) -> bool {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = table.insert(id.clone(), handler).is_some();
        if replaced {
            debug!("Replaced click handler for menu item {}", id);
        }
        replaced
    }

    pub fn unregister(&self, id: &MenuItemId) -> bool {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        table.remove(id).is_some()
    }

    pub fn contains(&self, id: &MenuItemId) -> bool {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.contains_key(id)
    }

    /// Run the handler for `id` on the calling thread.
    ///
    /// A panicking handler is logged and contained so one bad item cannot
    /// take down click delivery for the whole menu. Returns `false` when no
    /// handler is registered or the handler panicked.
    pub fn dispatch(&self, id: &MenuItemId) -> bool {
        let handler = {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            table.get(id).cloned()
        };

        let Some(handler) = handler else {
            debug!("Click on menu item {} has no handler", id);
            return false;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler())) {
            Ok(()) => true,
            Err(_) => {
                error!("Click handler for menu item {} panicked", id);
                false
            }
        }
    }

    /// Start the dispatcher thread.
    ///
    /// The thread exits once every [`ClickSender`] has been dropped.
    pub fn spawn(&self) -> io::Result<(ClickSender, JoinHandle<()>)> {
        let (tx, rx) = mpsc::channel::<MenuItemId>();
        let dispatcher = self.clone();
        let handle = thread::Builder::new()
            .name(threads::CLICK_DISPATCH.to_string())
            .spawn(move || {
                for id in rx {
                    dispatcher.dispatch(&id);
                }
                debug!("Click dispatcher stopped");
            })?;
        Ok((ClickSender(tx), handle))
    }
}

/// Producer side of the click channel, handed to the native event hook
#[derive(Clone)]
pub struct ClickSender(mpsc::Sender<MenuItemId>);

impl ClickSender {
    pub fn send(&self, id: MenuItemId) -> bool {
        match self.0.send(id) {
            Ok(()) => true,
            Err(mpsc::SendError(id)) => {
                warn!("Click dispatcher gone, dropping click on {}", id);
                false
            }
        }
    }
}
