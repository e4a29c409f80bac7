// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single position reported by a location provider.
///
/// A `Fix` is produced by a [`LocationProvider`](crate::provider::LocationProvider)
/// and is superseded by the next one, it is never stored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
}

impl Fix {
    /// Creates a new [`Fix`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use common::fix::Fix;
    ///
    /// let fix = Fix::new(37.7749, -122.4194, chrono::Utc::now());
    /// assert_eq!(fix.latitude(), 37.7749);
    /// ```
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Fix {
        Fix {
            latitude,
            longitude,
            timestamp,
        }
    }

    /// Creates a [`Fix`] stamped with the current time.
    pub fn now(latitude: f64, longitude: f64) -> Fix {
        Fix::new(latitude, longitude, Utc::now())
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Returns the latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns the longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns the moment the fix was taken.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn position(&self) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Formats the coordinates the way they are shown in the status notification.
    ///
    /// ```rust
    /// use common::fix::Fix;
    ///
    /// let fix = Fix::now(37.7749, -122.4194);
    /// assert_eq!(fix.coordinates_text(), "37.7749, -122.4194");
    /// ```
    pub fn coordinates_text(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}
