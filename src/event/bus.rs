// event/bus.rs - Event Bus
//
// Maps event types to ordered handler lists. Dispatch snapshots the list
// and runs handlers with no lock held, so handlers may subscribe or emit.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use log::{debug, error};

use super::{Event, EventType, Payload};
use crate::constants::threads;

/// Event callback
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

type HandlerMap = HashMap<EventType, Vec<Handler>>;

/// Publish/subscribe hub shared by the shell, the tray, and the application.
///
/// Cloning is cheap and yields a handle to the same bus.
///
/// Handlers must not panic: a panic inside [`EventBus::emit`] unwinds into
/// the caller of `emit`, and the remaining handlers of that emission are
/// skipped.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<HandlerMap>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `event_type`.
    ///
    /// Registering the same handler twice makes it run twice per emission.
    pub fn on<F>(&self, event_type: EventType, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe(event_type, Arc::new(handler));
    }

    /// Like [`EventBus::on`] for an already shared handler
    pub fn subscribe(&self, event_type: EventType, handler: Handler) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.entry(event_type).or_default().push(handler);
    }

    /// Number of handlers registered for `event_type`
    pub fn handler_count(&self, event_type: &EventType) -> usize {
        self.snapshot(event_type).len()
    }

    /// Dispatch synchronously on the calling thread, in registration order.
    ///
    /// Handlers registered while this call is running are not invoked by it.
    pub fn emit(&self, event_type: EventType, payload: Option<Payload>) {
        let handlers = self.snapshot(&event_type);
        if handlers.is_empty() {
            debug!("No handlers for event {}", event_type);
            return;
        }

        let event = Event::new(event_type, payload);
        for handler in &handlers {
            handler(&event);
        }
    }

    /// Dispatch on a new thread and return immediately.
    ///
    /// Order among this emission's handlers is registration order; there is
    /// no ordering relative to other emissions. A panicking handler ends the
    /// dispatch thread and surfaces through the returned handle.
    pub fn emit_async(
        &self,
        event_type: EventType,
        payload: Option<Payload>,
    ) -> io::Result<JoinHandle<()>> {
        let bus = self.clone();
        let name = event_type.to_string();
        thread::Builder::new()
            .name(threads::EVENT_DISPATCH.to_string())
            .spawn(move || bus.emit(event_type, payload))
            .inspect_err(|e| error!("Failed to spawn dispatch thread for {}: {}", name, e))
    }

    fn snapshot(&self, event_type: &EventType) -> Vec<Handler> {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.get(event_type).cloned().unwrap_or_default()
    }
}
