// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    fix::Fix,
    provider::ProviderError,
    state::{ServiceState, StartMode},
    subscription::SubscriptionConfig,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use strum_macros::EnumDiscriminants;
use tokio::sync::broadcast::{Receiver, Sender, error::SendError};
use tracing::debug;

/// Represents a high-level event in the system.
///
/// Each `Event` wraps an [`EventKind`], which defines the actual type
/// and data carried by the event.
///
/// This structure is designed to be passed through an [`EventBus`]
/// between asynchronous modules.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// The inner event type and associated data.
    pub kind: EventKind,
}

impl Event {
    /// Returns the discriminant of the wrapped [`EventKind`].
    pub fn event_type(&self) -> EventKindType {
        EventKindType::from(&self.kind)
    }
}

/// A request sent by a module to another module.
///
/// `id` and `sender_addr` are echoed by the matching [`Response`], which lets
/// the sender pick its answer out of the broadcast stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Request<T> {
    pub id: u64,
    pub sender_addr: u64,
    pub data: T,
}

impl Request<()> {
    /// Creates a request without payload.
    pub fn empty_request(id: u64, sender_addr: u64) -> Arc<Request<()>> {
        Arc::new(Request {
            id,
            sender_addr,
            data: (),
        })
    }
}

/// The answer to a [`Request`].
#[derive(Clone, Debug, PartialEq)]
pub struct Response<T> {
    pub id: u64,
    pub receiver_addr: u64,
    pub data: T,
}

impl<T> Response<T> {
    pub fn new(id: u64, receiver_addr: u64, data: T) -> Response<T> {
        Response {
            id,
            receiver_addr,
            data,
        }
    }
}

/// A thread-safe, reference-counted pointer to a [`Fix`].
///
/// Allows every subscriber of the bus to share the same fix without copying it.
pub type FixPtr = Arc<Fix>;

/// A shared pointer to the error that ended a provider subscription.
pub type ProviderErrorPtr = Arc<ProviderError>;

pub type EmptyRequestPtr = Arc<Request<()>>;
pub type StartServiceRequestPtr = Arc<Request<SubscriptionConfig>>;
pub type StartServiceResponsePtr = Arc<Response<StartMode>>;

/// Enumerates the different kinds of events that can be emitted
/// and transmitted via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(EventKindType), derive(Hash))]
pub enum EventKind {
    /// Indicates that a module shall terminate.
    QuitEvent,

    /// A new location fix was reported while the reporter is running.
    FixEvent(FixPtr),

    /// The active provider subscription failed, the reporter stopped.
    ProviderFailureEvent(ProviderErrorPtr),

    /// The reporter changed its lifecycle state.
    ServiceStateEvent(ServiceState),

    /// Asks the location service to start reporting with the given configuration.
    StartServiceRequestEvent(StartServiceRequestPtr),

    /// Answer of the location service to a start request.
    StartServiceResponseEvent(StartServiceResponsePtr),

    /// Asks the location service to stop reporting.
    StopServiceRequestEvent(EmptyRequestPtr),
}

impl EventKind {
    /// Returns `(id, receiver_addr)` if this event is a response.
    pub fn response_header(&self) -> Option<(u64, u64)> {
        match self {
            EventKind::StartServiceResponseEvent(resp) => Some((resp.id, resp.receiver_addr)),
            _ => None,
        }
    }
}

/// Returns a reference to the payload of `$kind` if it is the variant `$variant`.
///
/// ```
/// use module_core::{EventKind, payload_ref};
/// use common::state::ServiceState;
///
/// let kind = EventKind::ServiceStateEvent(ServiceState::Running);
/// assert_eq!(payload_ref!(kind, EventKind::ServiceStateEvent), Some(&ServiceState::Running));
/// ```
#[macro_export]
macro_rules! payload_ref {
    ($kind:expr, $variant:path) => {
        match &$kind {
            $variant(payload) => Some(payload),
            _ => None,
        }
    };
}

static NEXT_BUS_ID: AtomicUsize = AtomicUsize::new(0);

/// A simple asynchronous event bus for publishing and subscribing to [`Event`]s.
///
/// The event bus uses a [`tokio::sync::broadcast::channel`] under the hood,
/// allowing multiple receivers to listen for the same stream of events.
///
/// Each published event is cloned and distributed to all active subscribers.
/// If no subscribers exist at the time of publication, the event is discarded silently.
pub struct EventBus {
    /// The broadcast sender used internally to distribute events.
    sender: Sender<Event>,
    id: usize,
}

impl EventBus {
    /// Creates a new [`EventBus`] with a fixed buffer capacity of 100 messages.
    ///
    /// When the buffer is full, the oldest messages are dropped automatically
    /// as new ones are published.
    pub fn new() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(100);
        EventBus {
            sender,
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Subscribes to the event bus and returns a [`Receiver`].
    ///
    /// The returned receiver will receive all future events published after the
    /// subscription is created.
    pub fn subscribe(&self) -> Receiver<Event> {
        self.sender.subscribe()
    }

    /// Returns a sender that publishes into this bus.
    ///
    /// Used by components that emit events from outside a module loop.
    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    /// Publishes an [`Event`] to all active subscribers.
    ///
    /// If no subscribers exist, the event is discarded silently.
    pub fn publish(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }

    /// Creates a [`ModuleCtx`] bound to this [`EventBus`].
    pub fn context(&self) -> ModuleCtx {
        ModuleCtx::new(self)
    }
}

/// Provides a default instance of [`EventBus`].
impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Defines the common interface for an asynchronous module
/// that can be executed and communicate via the [`EventBus`].
#[async_trait::async_trait]
pub trait Module {
    /// Runs the module asynchronously until completion.
    ///
    /// This function typically contains the module's main event loop,
    /// reacting to messages received through the [`ModuleCtx`].
    async fn run(&mut self) -> Result<(), ()>;
}

/// Provides a module-scoped context for interacting with the [`EventBus`].
///
/// Each `ModuleCtx` owns both a sender and a receiver, allowing the module
/// to both publish and listen for events concurrently.
pub struct ModuleCtx {
    /// The broadcast sender used to publish events.
    pub sender: Sender<Event>,

    /// The broadcast receiver used to listen for events.
    pub receiver: Receiver<Event>,

    bus_id: usize,
}

impl ModuleCtx {
    /// Constructs a new [`ModuleCtx`] from the given [`EventBus`].
    ///
    /// Clones the internal broadcast sender and creates a new receiver.
    pub fn new(event_bus: &EventBus) -> Self {
        ModuleCtx {
            sender: event_bus.sender.clone(),
            receiver: event_bus.subscribe(),
            bus_id: event_bus.id,
        }
    }

    /// Identifies the bus this context belongs to.
    pub fn bus_id(&self) -> usize {
        self.bus_id
    }

    /// Publishes `kind` on the bus.
    ///
    /// Fails only if nobody is listening.
    pub fn publish_event(&self, kind: EventKind) -> Result<(), SendError<Event>> {
        self.sender.send(Event { kind }).map(|_| ())
    }

    /// Waits for the response of type `exp_event` that answers the request `id`
    /// sent from `addr`.
    ///
    /// Returns `None` if the bus is closed before the response arrives. Other
    /// events are skipped.
    pub async fn wait_for_event(&mut self, id: u64, addr: u64, exp_event: &EventKindType) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if event.event_type() == *exp_event && event.kind.response_header() == Some((id, addr)) {
                        return Some(event);
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Receiver lagged behind, {skipped} events skipped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

pub mod test_helper;
