// event/mod.rs - Application Events
//
// Event values and the bus that carries them between the tray, the shell,
// and application callbacks.

mod bus;

pub use bus::{EventBus, Handler};

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::constants::events;

/// Identifier of an event kind.
///
/// The predefined kinds are associated constants; applications may mint
/// their own with [`EventType::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    pub const APP_STARTED: EventType = EventType::from_static(events::APP_STARTED);
    pub const APP_EXITING: EventType = EventType::from_static(events::APP_EXITING);
    pub const WINDOW_SHOWN: EventType = EventType::from_static(events::WINDOW_SHOWN);
    pub const WINDOW_HIDDEN: EventType = EventType::from_static(events::WINDOW_HIDDEN);
    pub const TAB_SWITCHED: EventType = EventType::from_static(events::TAB_SWITCHED);
    pub const TRAY_READY: EventType = EventType::from_static(events::TRAY_READY);
    pub const TRAY_EXITED: EventType = EventType::from_static(events::TRAY_EXITED);

    /// Create an event type from a static name
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create an application-defined event type
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Opaque event data shared between all handlers of one emission
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A single emitted event
#[derive(Clone)]
pub struct Event {
    event_type: EventType,
    payload: Option<Payload>,
}

impl Event {
    pub fn new(event_type: EventType, payload: Option<Payload>) -> Self {
        Self { event_type, payload }
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Raw payload, if any
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Payload downcast to a concrete type.
    ///
    /// Returns `None` when there is no payload or it has a different type.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}
