// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::serde::duration_millis;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Errors for an invalid [`SubscriptionConfig`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("minimum distance must be a finite, non negative number of meters, got {0}")]
    InvalidDistance(f64),
}

/// Parameters of one provider subscription.
///
/// The configuration is fixed when the subscription is created and stays the
/// same until it ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSubscriptionConfig")]
pub struct SubscriptionConfig {
    #[serde(with = "duration_millis", rename = "min_interval_ms")]
    min_interval: Duration,
    min_distance_meters: f64,
}

impl SubscriptionConfig {
    pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);
    pub const DEFAULT_MIN_DISTANCE_M: f64 = 1.0;

    /// Creates a new [`SubscriptionConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDistance`] if `min_distance_meters` is
    /// negative, NaN or infinite.
    pub fn new(min_interval: Duration, min_distance_meters: f64) -> Result<Self, ConfigError> {
        if !min_distance_meters.is_finite() || min_distance_meters < 0.0 {
            return Err(ConfigError::InvalidDistance(min_distance_meters));
        }
        Ok(SubscriptionConfig {
            min_interval,
            min_distance_meters,
        })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn min_distance_meters(&self) -> f64 {
        self.min_distance_meters
    }
}

/// Wire form of [`SubscriptionConfig`], validated on conversion.
#[derive(Deserialize)]
struct RawSubscriptionConfig {
    #[serde(with = "duration_millis", rename = "min_interval_ms")]
    min_interval: Duration,
    min_distance_meters: f64,
}

impl TryFrom<RawSubscriptionConfig> for SubscriptionConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSubscriptionConfig) -> Result<Self, Self::Error> {
        SubscriptionConfig::new(raw.min_interval, raw.min_distance_meters)
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        SubscriptionConfig {
            min_interval: Self::DEFAULT_MIN_INTERVAL,
            min_distance_meters: Self::DEFAULT_MIN_DISTANCE_M,
        }
    }
}
