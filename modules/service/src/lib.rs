// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use async_trait::async_trait;
use common::{
    notifier::{LOCATION_NOTIFICATION_ID, Notifier},
    provider::ProviderError,
    state::StartMode,
    subscription::SubscriptionConfig,
};
use module_core::{
    Event, EventKind, Module, ModuleCtx, ProviderErrorPtr, Response, StartServiceRequestPtr,
    StartServiceResponsePtr,
};
use reporter::LocationReporter;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// The foreground service hosting a [`LocationReporter`].
///
/// Translates the host lifecycle (create, start command, destroy) into
/// reporter calls and answers start requests from the event bus with the
/// [`StartMode`] the host expects.
pub struct LocationService {
    ctx: ModuleCtx,
    reporter: LocationReporter,
    notifier: Arc<dyn Notifier>,
}

impl LocationService {
    pub const NOTIFICATION_TITLE: &'static str = "Location Service";
    pub const NOTIFICATION_TEXT: &'static str = "Running service to find your location";

    pub fn new(ctx: ModuleCtx, reporter: LocationReporter, notifier: Arc<dyn Notifier>) -> Self {
        LocationService {
            ctx,
            reporter,
            notifier,
        }
    }

    pub fn reporter(&self) -> &LocationReporter {
        &self.reporter
    }

    /// Shows the persistent notification a foreground service must carry.
    pub fn on_create(&self) {
        self.notifier.show(
            LOCATION_NOTIFICATION_ID,
            Self::NOTIFICATION_TITLE,
            Self::NOTIFICATION_TEXT,
            true,
        );
    }

    /// Starts the reporter and tells the host whether to keep the service alive.
    pub fn on_start_command(&self, config: SubscriptionConfig) -> StartMode {
        match self.reporter.start(config) {
            Ok(()) => StartMode::Sticky,
            Err(e) => {
                warn!("Location service start command failed. Error: {e}");
                StartMode::NotSticky
            }
        }
    }

    /// Stops the reporter and removes the foreground notification.
    pub fn on_destroy(&self) {
        self.reporter.stop();
        self.notifier.cancel(LOCATION_NOTIFICATION_ID);
    }

    fn on_start_request(&self, request: StartServiceRequestPtr) {
        info!(
            "Received start request. id: {}, sender id: {}",
            request.id, request.sender_addr
        );
        let mode = self.on_start_command(request.data);
        let response = StartServiceResponsePtr::new(Response::new(request.id, request.sender_addr, mode));
        let _ = self.ctx.publish_event(EventKind::StartServiceResponseEvent(response));
    }

    fn on_provider_failure(&self, failure: ProviderErrorPtr) {
        let text = match *failure {
            ProviderError::StreamClosed => "Location provider stopped".to_string(),
            ref failure => format!("Location unavailable: {failure}"),
        };
        self.notifier.update(LOCATION_NOTIFICATION_ID, &text);
    }
}

#[async_trait]
impl Module for LocationService {
    async fn run(&mut self) -> Result<(), ()> {
        self.on_create();
        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(Event { kind }) => match kind {
                            EventKind::QuitEvent => {
                                self.on_destroy();
                                run = false;
                            }
                            EventKind::StartServiceRequestEvent(request) => self.on_start_request(request),
                            EventKind::StopServiceRequestEvent(request) => {
                                debug!("Received stop request. id: {}, sender id: {}", request.id, request.sender_addr);
                                self.reporter.stop();
                            }
                            EventKind::ProviderFailureEvent(failure) => self.on_provider_failure(failure),
                            _ => (),
                        },
                        Err(RecvError::Lagged(skipped)) => {
                            error!("LocationService lagged behind, {skipped} events skipped");
                        }
                        Err(RecvError::Closed) => {
                            error!("Event bus closed, LocationService stops");
                            self.on_destroy();
                            return Err(());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
