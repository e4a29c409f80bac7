// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    fix::Fix,
    provider::{
        Accuracy, FixCallback, LocationProvider, PowerUsage, ProviderDescriptor, ProviderError,
        ProviderId, ProviderUpdate, SubscriptionHandle, select_best_provider,
    },
    subscription::SubscriptionConfig,
};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

/// A subscription as seen by the [`FakeLocationProvider`].
#[derive(Clone)]
pub struct FakeSubscription {
    pub provider: ProviderId,
    pub config: SubscriptionConfig,
    pub callback: FixCallback,
}

#[derive(Default)]
struct FakeProviderState {
    next_handle: u64,
    active: HashMap<SubscriptionHandle, FakeSubscription>,
    last_callback: Option<FixCallback>,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
    subscribe_error: Option<ProviderError>,
}

/// A [`LocationProvider`] for tests.
///
/// Fixes are delivered synchronously on the calling thread by
/// [`deliver_fix`](Self::deliver_fix), which keeps tests deterministic.
#[derive(Default)]
pub struct FakeLocationProvider {
    providers: Vec<ProviderDescriptor>,
    state: Mutex<FakeProviderState>,
}

impl FakeLocationProvider {
    pub fn new(providers: Vec<ProviderDescriptor>) -> Self {
        FakeLocationProvider {
            providers,
            state: Mutex::default(),
        }
    }

    /// A provider exposing one fine `gps` and one coarse `network` source.
    pub fn with_fine_and_coarse() -> Self {
        FakeLocationProvider::new(vec![
            ProviderDescriptor::new("network", Accuracy::Coarse, PowerUsage::Low),
            ProviderDescriptor::new("gps", Accuracy::Fine, PowerUsage::High),
        ])
    }

    /// A provider exposing only a coarse `network` source.
    pub fn with_coarse_only() -> Self {
        FakeLocationProvider::new(vec![ProviderDescriptor::new(
            "network",
            Accuracy::Coarse,
            PowerUsage::Low,
        )])
    }

    /// Makes every following `subscribe` call fail with `error`.
    pub fn fail_subscribe_with(&self, error: ProviderError) {
        self.lock().subscribe_error = Some(error);
    }

    pub fn subscribe_calls(&self) -> usize {
        self.lock().subscribe_calls
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.lock().unsubscribe_calls
    }

    pub fn active_subscriptions(&self) -> Vec<FakeSubscription> {
        self.lock().active.values().cloned().collect()
    }

    /// Delivers `fix` to every active subscription and returns how many were notified.
    pub fn deliver_fix(&self, fix: Fix) -> usize {
        self.deliver(ProviderUpdate::Fix(fix))
    }

    /// Delivers a failure to every active subscription.
    pub fn deliver_failure(&self, error: ProviderError) -> usize {
        self.deliver(ProviderUpdate::Failure(error))
    }

    /// Invokes the most recently registered callback even if it was unsubscribed.
    ///
    /// Simulates a platform callback that was already in flight when the
    /// subscription ended.
    pub fn deliver_late_fix(&self, fix: Fix) {
        let callback = self.lock().last_callback.clone();
        if let Some(callback) = callback {
            callback(ProviderUpdate::Fix(fix));
        }
    }

    fn deliver(&self, update: ProviderUpdate) -> usize {
        // Callbacks run without holding the lock, they may unsubscribe.
        let callbacks: Vec<FixCallback> = self
            .lock()
            .active
            .values()
            .map(|s| s.callback.clone())
            .collect();
        for callback in &callbacks {
            callback(update.clone());
        }
        callbacks.len()
    }

    fn lock(&self) -> MutexGuard<'_, FakeProviderState> {
        self.state.lock().unwrap_or_else(|state| state.into_inner())
    }
}

impl LocationProvider for FakeLocationProvider {
    fn subscribe(
        &self,
        id: &ProviderId,
        config: &SubscriptionConfig,
        callback: FixCallback,
    ) -> Result<SubscriptionHandle, ProviderError> {
        let mut state = self.lock();
        state.subscribe_calls += 1;
        if let Some(error) = state.subscribe_error.clone() {
            return Err(error);
        }
        if !self.providers.iter().any(|p| &p.id == id) {
            return Err(ProviderError::UnknownProvider(id.clone()));
        }
        state.next_handle += 1;
        let handle = SubscriptionHandle(state.next_handle);
        state.last_callback = Some(callback.clone());
        state.active.insert(
            handle,
            FakeSubscription {
                provider: id.clone(),
                config: *config,
                callback,
            },
        );
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut state = self.lock();
        state.unsubscribe_calls += 1;
        state.active.remove(&handle);
    }

    fn best_provider_for(&self, accuracy: Accuracy, power: PowerUsage) -> Option<ProviderId> {
        select_best_provider(&self.providers, accuracy, power).map(|d| d.id.clone())
    }
}
