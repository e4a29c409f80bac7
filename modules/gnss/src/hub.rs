// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{FixSource, throttle::FixThrottle};
use common::{
    provider::{
        Accuracy, FixCallback, LocationProvider, PowerUsage, ProviderDescriptor, ProviderError,
        ProviderId, ProviderUpdate, SubscriptionHandle, select_best_provider,
    },
    subscription::SubscriptionConfig,
};
use futures::StreamExt;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, error, info};

/// A [`LocationProvider`] serving subscriptions from a set of [`FixSource`]s.
///
/// Every subscription runs as its own task on the runtime the hub was created
/// with, so `subscribe` and `unsubscribe` can be called from synchronous code.
pub struct ProviderHub {
    sources: Vec<Arc<dyn FixSource>>,
    descriptors: Vec<ProviderDescriptor>,
    runtime: Handle,
    subscriptions: Mutex<HashMap<SubscriptionHandle, JoinHandle<()>>>,
    next_handle: AtomicU64,
}

impl ProviderHub {
    /// Creates an empty hub spawning its subscriptions on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        ProviderHub {
            sources: vec![],
            descriptors: vec![],
            runtime,
            subscriptions: Mutex::default(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Adds a source. If two sources share an id, the first one is used.
    pub fn with_source(mut self, source: impl FixSource + 'static) -> Self {
        self.descriptors.push(source.descriptor().clone());
        self.sources.push(Arc::new(source));
        self
    }

    pub fn descriptors(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    /// Number of subscriptions whose task is still running.
    pub fn active_subscriptions(&self) -> usize {
        self.lock().values().filter(|task| !task.is_finished()).count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriptionHandle, JoinHandle<()>>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|subscriptions| subscriptions.into_inner())
    }
}

impl LocationProvider for ProviderHub {
    fn subscribe(
        &self,
        id: &ProviderId,
        config: &SubscriptionConfig,
        callback: FixCallback,
    ) -> Result<SubscriptionHandle, ProviderError> {
        let Some(source) = self.sources.iter().find(|s| &s.descriptor().id == id) else {
            return Err(ProviderError::UnknownProvider(id.clone()));
        };
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let task = self
            .runtime
            .spawn(forward_fixes(source.clone(), *config, callback));
        self.lock().insert(handle, task);
        info!("Subscription {} to provider {} created", handle.0, id);
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(task) = self.lock().remove(&handle) {
            task.abort();
            debug!("Subscription {} removed", handle.0);
        }
    }

    fn best_provider_for(&self, accuracy: Accuracy, power: PowerUsage) -> Option<ProviderId> {
        select_best_provider(&self.descriptors, accuracy, power).map(|d| d.id.clone())
    }
}

impl Drop for ProviderHub {
    fn drop(&mut self) {
        for (_, task) in self.lock().drain() {
            task.abort();
        }
    }
}

async fn forward_fixes(source: Arc<dyn FixSource>, config: SubscriptionConfig, callback: FixCallback) {
    let id = source.descriptor().id.clone();
    let mut stream = match source.open().await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to open location provider {id}. Error: {e}");
            callback(ProviderUpdate::Failure(e));
            return;
        }
    };
    let mut throttle = FixThrottle::new(config);
    while let Some(item) = stream.next().await {
        match item {
            Ok(fix) => {
                if throttle.admit(&fix) {
                    callback(ProviderUpdate::Fix(fix));
                }
            }
            Err(e) => {
                error!("Location provider {id} failed. Error: {e}");
                callback(ProviderUpdate::Failure(e));
                return;
            }
        }
    }
    error!("Location provider {id} ended its fix stream");
    callback(ProviderUpdate::Failure(ProviderError::StreamClosed));
}
