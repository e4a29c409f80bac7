// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{Event, EventBus, EventKind, EventKindType, ModuleCtx};
use std::{
    collections::HashMap,
    io::ErrorKind,
    sync::{LazyLock, RwLock},
    time::Duration,
};
use tokio::{sync::broadcast::Receiver, time::timeout};
use tracing::{debug, error};

/// Sends a quit signal to a running module and waits for it to stop gracefully.
///
/// Publishes a [`QuitEvent`](EventKind::QuitEvent) through the given [`EventBus`]
/// and waits up to 100ms for the module's task to finish.
///
/// # Panics
/// This function panics if:
/// - The module does not stop within the timeout.
/// - The task panicked or returned `Err(())`.
pub async fn stop_module(event_bus: &EventBus, handle: &mut tokio::task::JoinHandle<Result<(), ()>>) {
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    timeout(Duration::from_millis(100), handle)
        .await
        .expect("Module doesn't handle quit event in timeout")
        .expect("Module task panicked")
        .expect("Module returned an error");
}

/// Waits for an [`Event`] of type `exp_event` on `rx` within `duration`.
///
/// The total waiting time is divided into ten polling steps so that a slow
/// stream of unrelated events can't stall the wait beyond `duration`.
///
/// # Panics
///
/// Panics if no matching event is received within `duration`.
pub async fn wait_for_event(rx: &mut Receiver<Event>, duration: Duration, exp_event: EventKindType) -> Event {
    let step_duration = duration / 10;
    for _ in 0..10 {
        let deadline = tokio::time::Instant::now() + step_duration;
        while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            if event.event_type() == exp_event {
                return event;
            }
        }
    }
    panic!("Failed to receive event of type {:?}", exp_event);
}

/// Asserts that no [`Event`] of type `event_type` arrives on `rx` within `duration`.
///
/// # Panics
///
/// Panics with the offending event if one is received.
pub async fn assert_no_event(rx: &mut Receiver<Event>, duration: Duration, event_type: EventKindType) {
    let deadline = tokio::time::Instant::now() + duration;
    while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        if event.event_type() == event_type {
            panic!("Unexpected event received: {:?}", event);
        }
    }
}

static RESPONSE_HANDLERS_CACHE: LazyLock<RwLock<HashMap<(usize, EventKindType), ResponseHandler>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Registers an automatic response handler for a given request event type.
///
/// When an incoming event whose discriminant matches `request_type` is received on `ctx`,
/// the predefined `response_event` is sent back through the same context.
///
/// Returns an error of kind `AlreadyExists` if a handler for `request_type` is
/// already registered on the same bus.
pub fn register_response_event(
    request_type: EventKindType,
    response_event: Event,
    ctx: ModuleCtx,
) -> Result<(), std::io::Error> {
    let bus_id = ctx.bus_id();
    let mut cache = RESPONSE_HANDLERS_CACHE
        .write()
        .unwrap_or_else(|cache| cache.into_inner());
    if cache.contains_key(&(bus_id, request_type)) {
        error!("Response handler for request type {:?} already exists", (bus_id, request_type));
        return Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("Response handler for request type {:?} already exists", request_type),
        ));
    }
    cache.insert((bus_id, request_type), ResponseHandler::new(ctx, request_type, response_event));
    debug!("Registered response handler for request type {:?}", request_type);
    Ok(())
}

/// Removes a previously registered automatic response handler.
///
/// If no handler exists for `request_type` on bus `bus_id`, this is a no-op.
pub fn unregister_response_event(bus_id: usize, request_type: &EventKindType) {
    let mut cache = RESPONSE_HANDLERS_CACHE
        .write()
        .unwrap_or_else(|cache| cache.into_inner());
    if cache.remove(&(bus_id, *request_type)).is_some() {
        debug!("Unregistered response handler for request type {:?}", request_type);
    }
}

/// Answers requests of one type with a canned response.
///
/// When the handler is dropped, its background task is aborted.
#[derive(Debug)]
struct ResponseHandler {
    handle: tokio::task::JoinHandle<()>,
}

impl ResponseHandler {
    fn new(mut ctx: ModuleCtx, request_type: EventKindType, response: Event) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                match ctx.receiver.recv().await {
                    Ok(event) => {
                        if event.event_type() == request_type {
                            debug!("ResponseHandler sending response for request type {:?}", request_type);
                            let _ = ctx.sender.send(response.clone());
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(e) => error!("Failed to receive request. Error: {}", e),
                }
            }
        });
        ResponseHandler { handle }
    }
}

impl Drop for ResponseHandler {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("ResponseHandler dropped and background task aborted.");
    }
}
