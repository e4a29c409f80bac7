// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Location reporter
//!
//! Subscribes to a location provider and reports every fix through the
//! persistent status notification, the log and the event bus.

use common::{
    fix::Fix,
    notifier::{LOCATION_NOTIFICATION_ID, Notifier},
    permission::{PermissionChecker, PermissionScope},
    provider::{
        Accuracy, FixCallback, LocationProvider, PowerUsage, ProviderError, ProviderId,
        ProviderUpdate, SubscriptionHandle,
    },
    state::ServiceState,
    subscription::SubscriptionConfig,
};
use module_core::{Event, EventKind};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::broadcast::Sender;
use tracing::{debug, error, info, trace, warn};

/// Errors returned by [`LocationReporter::start`].
///
/// None of them is fatal, the caller decides whether to prompt or retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReporterError {
    #[error("location permission `{0}` is not granted")]
    PermissionDenied(PermissionScope),
    #[error("no location provider is available")]
    NoProviderAvailable,
    #[error(transparent)]
    ProviderFailure(#[from] ProviderError),
}

#[derive(Clone, Debug)]
struct ActiveSubscription {
    generation: u64,
    handle: SubscriptionHandle,
    provider: ProviderId,
    config: SubscriptionConfig,
}

#[derive(Debug, Default)]
struct ReporterState {
    service_state: ServiceState,
    subscription: Option<ActiveSubscription>,
    /// Incremented for every subscription attempt, tags the callbacks.
    generation: u64,
}

impl ReporterState {
    fn accepts(&self, generation: Option<u64>) -> Option<&ActiveSubscription> {
        if self.service_state != ServiceState::Running {
            return None;
        }
        self.subscription
            .as_ref()
            .filter(|sub| generation.is_none_or(|g| g == sub.generation))
    }
}

struct ReporterInner {
    provider: Arc<dyn LocationProvider>,
    notifier: Arc<dyn Notifier>,
    permissions: Arc<dyn PermissionChecker>,
    sender: Sender<Event>,
    state: Mutex<ReporterState>,
}

impl ReporterInner {
    fn lock(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(|state| state.into_inner())
    }

    fn transition(&self, state: &mut ReporterState, next: ServiceState) {
        debug!("Reporter state {:?} -> {:?}", state.service_state, next);
        state.service_state = next;
        let _ = self.sender.send(Event {
            kind: EventKind::ServiceStateEvent(next),
        });
    }

    fn check_permissions(&self) -> Result<(), ReporterError> {
        match PermissionScope::REQUIRED
            .into_iter()
            .find(|scope| !self.permissions.is_granted(*scope))
        {
            Some(scope) => Err(ReporterError::PermissionDenied(scope)),
            None => Ok(()),
        }
    }

    /// Negotiates the provider: the most accurate one first, then whatever
    /// the platform picks for a coarse, low power request.
    fn select_provider(&self) -> Result<ProviderId, ReporterError> {
        if let Some(id) = self.provider.best_provider_for(Accuracy::Fine, PowerUsage::High) {
            return Ok(id);
        }
        debug!("No high accuracy location provider, falling back to the platform choice");
        self.provider
            .best_provider_for(Accuracy::Coarse, PowerUsage::Low)
            .ok_or(ReporterError::NoProviderAvailable)
    }

    fn subscribe(
        self: &Arc<Self>,
        provider: ProviderId,
        generation: u64,
        config: &SubscriptionConfig,
    ) -> Result<ActiveSubscription, ReporterError> {
        let reporter = Arc::downgrade(self);
        let handle = self
            .provider
            .subscribe(&provider, config, fix_callback(reporter, generation))?;
        Ok(ActiveSubscription {
            generation,
            handle,
            provider,
            config: *config,
        })
    }

    fn on_fix(&self, generation: Option<u64>, fix: Fix) {
        let state = self.lock();
        let Some(subscription) = state.accepts(generation) else {
            trace!("Ignoring fix, reporter is {:?}", state.service_state);
            return;
        };
        info!(
            latitude = fix.latitude(),
            longitude = fix.longitude(),
            provider = %subscription.provider,
            "Location update"
        );
        self.notifier
            .update(LOCATION_NOTIFICATION_ID, &fix.coordinates_text());
        let _ = self.sender.send(Event {
            kind: EventKind::FixEvent(Arc::new(fix)),
        });
    }

    fn on_provider_failure(&self, generation: Option<u64>, failure: ProviderError) {
        let mut state = self.lock();
        let Some(subscription) = state.accepts(generation).cloned() else {
            trace!("Ignoring provider failure, reporter is {:?}", state.service_state);
            return;
        };
        error!(
            "Location provider {} failed, reporter stops. Error: {}",
            subscription.provider, failure
        );
        self.transition(&mut state, ServiceState::Stopping);
        state.subscription = None;
        self.provider.unsubscribe(subscription.handle);
        self.transition(&mut state, ServiceState::Stopped);
        let _ = self.sender.send(Event {
            kind: EventKind::ProviderFailureEvent(Arc::new(failure)),
        });
    }

    fn stop(&self) {
        let mut state = self.lock();
        if state.service_state == ServiceState::Stopped {
            debug!("Reporter already stopped");
            return;
        }
        self.transition(&mut state, ServiceState::Stopping);
        if let Some(subscription) = state.subscription.take() {
            self.provider.unsubscribe(subscription.handle);
            info!("Unsubscribed from location provider {}", subscription.provider);
        }
        self.transition(&mut state, ServiceState::Stopped);
    }
}

/// Builds the callback registered at the provider.
///
/// Only a weak reference is captured, the provider must not keep the
/// reporter alive.
fn fix_callback(reporter: Weak<ReporterInner>, generation: u64) -> FixCallback {
    Arc::new(move |update| {
        let Some(reporter) = reporter.upgrade() else {
            return;
        };
        match update {
            ProviderUpdate::Fix(fix) => reporter.on_fix(Some(generation), fix),
            ProviderUpdate::Failure(failure) => reporter.on_provider_failure(Some(generation), failure),
        }
    })
}

/// Periodically reports the device location.
///
/// Once started the reporter keeps exactly one subscription at the
/// negotiated [`LocationProvider`]. Every fix is logged, shown in the
/// persistent notification and published as [`EventKind::FixEvent`]. State
/// changes are published as [`EventKind::ServiceStateEvent`], a failing
/// provider as [`EventKind::ProviderFailureEvent`].
///
/// Fixes may arrive on any thread. The state check and the side effects of a
/// fix happen under the same lock that [`stop`](Self::stop) takes, so once
/// `stop` returned no fix changes anything anymore.
pub struct LocationReporter {
    inner: Arc<ReporterInner>,
}

impl LocationReporter {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        notifier: Arc<dyn Notifier>,
        permissions: Arc<dyn PermissionChecker>,
        sender: Sender<Event>,
    ) -> Self {
        LocationReporter {
            inner: Arc::new(ReporterInner {
                provider,
                notifier,
                permissions,
                sender,
                state: Mutex::default(),
            }),
        }
    }

    /// Starts reporting with `config`.
    ///
    /// Starting a running reporter is a no-op and succeeds.
    ///
    /// # Errors
    ///
    /// * [`ReporterError::PermissionDenied`] if a location scope is not
    ///   granted. The provider is not contacted.
    /// * [`ReporterError::NoProviderAvailable`] if neither a high accuracy nor
    ///   a fallback provider exists. No state change is published.
    /// * [`ReporterError::ProviderFailure`] if the provider rejects the
    ///   subscription.
    ///
    /// The reporter stays stopped in every error case.
    pub fn start(&self, config: SubscriptionConfig) -> Result<(), ReporterError> {
        let mut state = self.inner.lock();
        if state.service_state == ServiceState::Running {
            debug!("Reporter already running, start request ignored");
            return Ok(());
        }
        let provider = match self
            .inner
            .check_permissions()
            .and_then(|()| self.inner.select_provider())
        {
            Ok(provider) => provider,
            Err(e) => {
                warn!("Location reporting not started. Error: {e}");
                return Err(e);
            }
        };
        self.inner.transition(&mut state, ServiceState::Starting);
        state.generation += 1;
        match self.inner.subscribe(provider, state.generation, &config) {
            Ok(subscription) => {
                info!(
                    "Subscribed to location provider {} (interval {:?}, distance {}m)",
                    subscription.provider,
                    config.min_interval(),
                    config.min_distance_meters()
                );
                state.subscription = Some(subscription);
                self.inner.transition(&mut state, ServiceState::Running);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start location reporting. Error: {e}");
                self.inner.transition(&mut state, ServiceState::Stopped);
                Err(e)
            }
        }
    }

    /// Stops reporting and unsubscribes from the provider.
    ///
    /// Stopping a stopped reporter is a no-op.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Reports `fix` as if it was delivered by the active subscription.
    ///
    /// Ignored unless the reporter is running.
    pub fn on_fix(&self, fix: Fix) {
        self.inner.on_fix(None, fix);
    }

    /// Reports a failure of the active subscription.
    ///
    /// Stops the reporter and publishes the failure. Ignored unless running.
    pub fn on_provider_failure(&self, failure: ProviderError) {
        self.inner.on_provider_failure(None, failure);
    }

    pub fn state(&self) -> ServiceState {
        self.inner.lock().service_state
    }

    /// Returns the provider of the active subscription.
    pub fn active_provider(&self) -> Option<ProviderId> {
        self.inner
            .lock()
            .subscription
            .as_ref()
            .map(|sub| sub.provider.clone())
    }

    /// Returns the configuration of the active subscription.
    pub fn active_config(&self) -> Option<SubscriptionConfig> {
        self.inner.lock().subscription.as_ref().map(|sub| sub.config)
    }
}

impl Drop for LocationReporter {
    fn drop(&mut self) {
        self.inner.stop();
    }
}
