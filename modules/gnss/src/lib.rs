// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! GNSS Modul for the location reporter
//!
//! Provides the [`ProviderHub`], a [`LocationProvider`](common::provider::LocationProvider)
//! for linux based systems, and the fix sources it can serve from.

use common::{
    fix::Fix,
    provider::{ProviderDescriptor, ProviderError},
};
use futures::stream::BoxStream;

/// A stream of fixes produced by an opened [`FixSource`].
///
/// An `Err` item ends the subscription, so does the end of the stream.
pub type FixStream = BoxStream<'static, Result<Fix, ProviderError>>;

/// Common interface that every fix source must support.
#[async_trait::async_trait]
pub trait FixSource: Send + Sync {
    /// The id and the accuracy/power profile of this source.
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Opens a new, independent stream of fixes.
    async fn open(&self) -> Result<FixStream, ProviderError>;
}

pub mod gpsd_source;
pub mod hub;
pub mod route_source;
pub mod throttle;

pub use hub::ProviderHub;
