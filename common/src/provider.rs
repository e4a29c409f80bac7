// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! The location provider capability.
//!
//! A location provider is the host subsystem that produces [`Fix`]es. The
//! reporter never talks to hardware directly, it negotiates a provider by
//! accuracy and power hints and subscribes a callback to it.

use crate::{fix::Fix, subscription::SubscriptionConfig};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Accuracy class of a provider or of a provider request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accuracy {
    /// Satellite based or fused positioning, a few meters.
    Fine,
    /// Network or cell based positioning, hundreds of meters.
    Coarse,
}

impl Accuracy {
    /// Returns `true` if a provider of this accuracy can serve a request for `requested`.
    pub fn satisfies(&self, requested: Accuracy) -> bool {
        matches!((self, requested), (Accuracy::Fine, _) | (Accuracy::Coarse, Accuracy::Coarse))
    }
}

/// Power usage of a provider, or the power budget of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerUsage {
    Low,
    Medium,
    High,
}

/// Name of a provider, e.g. `gpsd` or `route`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(name: impl Into<String>) -> Self {
        ProviderId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one active subscription at a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// The profile a provider declares about itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub accuracy: Accuracy,
    pub power: PowerUsage,
}

impl ProviderDescriptor {
    pub fn new(id: impl Into<String>, accuracy: Accuracy, power: PowerUsage) -> Self {
        ProviderDescriptor {
            id: ProviderId::new(id),
            accuracy,
            power,
        }
    }
}

/// Errors reported by a location provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("unknown location provider `{0}`")]
    UnknownProvider(ProviderId),
    #[error("failed to connect to the location provider: {0}")]
    Connection(String),
    #[error("the location provider closed the fix stream")]
    StreamClosed,
    #[error("malformed data from the location provider: {0}")]
    Protocol(String),
}

/// Everything a provider delivers to a subscribed callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderUpdate {
    /// A new position.
    Fix(Fix),
    /// The subscription broke down, no further updates follow.
    Failure(ProviderError),
}

/// Callback registered at a provider.
///
/// It may be invoked on any thread, so it has to be `Send + Sync`.
pub type FixCallback = Arc<dyn Fn(ProviderUpdate) + Send + Sync>;

/// Common interface that every location provider must support.
pub trait LocationProvider: Send + Sync {
    /// Subscribes `callback` to the fixes of provider `id`.
    ///
    /// `config` limits how often a fix is delivered. The returned handle stays
    /// valid until [`unsubscribe`](Self::unsubscribe) is called or a
    /// [`ProviderUpdate::Failure`] is delivered. The callback must not be
    /// invoked from within `subscribe` itself.
    fn subscribe(
        &self,
        id: &ProviderId,
        config: &SubscriptionConfig,
        callback: FixCallback,
    ) -> Result<SubscriptionHandle, ProviderError>;

    /// Ends a subscription. Unknown handles are ignored.
    ///
    /// Must not wait for a callback that is currently executing.
    fn unsubscribe(&self, handle: SubscriptionHandle);

    /// Returns the provider that fits the accuracy and power hints best.
    fn best_provider_for(&self, accuracy: Accuracy, power: PowerUsage) -> Option<ProviderId>;
}

/// Picks the best provider out of `providers` for the given hints.
///
/// Candidates must satisfy the requested accuracy and stay within the power
/// budget. Among those the finer and then the cheaper provider wins. A
/// [`Accuracy::Coarse`] request relaxes the power budget when nothing fits,
/// so it only yields `None` if no provider exists at all. A
/// [`Accuracy::Fine`] request is never relaxed.
pub fn select_best_provider(
    providers: &[ProviderDescriptor],
    accuracy: Accuracy,
    power: PowerUsage,
) -> Option<&ProviderDescriptor> {
    let rank = |d: &&ProviderDescriptor| (d.accuracy != Accuracy::Fine, d.power);
    let within_budget = providers
        .iter()
        .filter(|d| d.accuracy.satisfies(accuracy) && d.power <= power)
        .min_by_key(rank);
    match (within_budget, accuracy) {
        (Some(best), _) => Some(best),
        (None, Accuracy::Coarse) => providers.iter().min_by_key(rank),
        (None, Accuracy::Fine) => None,
    }
}
