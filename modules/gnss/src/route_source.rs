// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{FixSource, FixStream};
use common::{
    fix::Fix,
    position::Position,
    provider::{Accuracy, PowerUsage, ProviderDescriptor, ProviderError},
};
use futures::{StreamExt, stream};
use std::{
    io::{Error, ErrorKind},
    sync::Arc,
    time::Duration,
};
use tokio::time::{MissedTickBehavior, interval};
use utm::{lat_lon_to_zone_number, lat_to_zone_letter, to_utm_wgs84, wsg84_utm_to_lat_lon};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct UtmPoint {
    easting: f64,
    northing: f64,
}

/// The projection every waypoint of a route is converted with.
#[derive(Debug, Clone, Copy)]
struct UtmZone {
    number: u8,
    letter: char,
}

/// Moves along the route at a constant velocity.
struct RouteRuntime {
    points: Arc<Vec<UtmPoint>>,
    zone: UtmZone,
    current: UtmPoint,
    next_point: usize,
    step_m: f64,
}

impl RouteRuntime {
    /// Returns the current position as a fix and advances by one tick.
    fn next_fix(&mut self) -> Result<Fix, ProviderError> {
        let (lat, lon) = wsg84_utm_to_lat_lon(
            self.current.easting,
            self.current.northing,
            self.zone.number,
            self.zone.letter,
        )
        .map_err(|_| ProviderError::Protocol("UTM position can't be converted to WGS84".to_string()))?;
        self.advance();
        Ok(Fix::now(lat, lon))
    }

    fn advance(&mut self) {
        if self.points.len() < 2 {
            return;
        }
        let mut remaining = self.step_m;
        // Bounded so that a route of identical points can't spin forever.
        for _ in 0..self.points.len() * 2 {
            let target = self.points[self.next_point];
            let dx = target.easting - self.current.easting;
            let dy = target.northing - self.current.northing;
            let length = (dx * dx + dy * dy).sqrt();
            if length > remaining {
                self.current.easting += dx / length * remaining;
                self.current.northing += dy / length * remaining;
                return;
            }
            remaining -= length;
            self.current = target;
            self.next_point = (self.next_point + 1) % self.points.len();
        }
    }
}

fn convert_route_points(positions: &[Position]) -> Result<(UtmZone, Vec<UtmPoint>), Error> {
    let first = positions
        .first()
        .ok_or_else(|| Error::new(ErrorKind::InvalidData, "positions parameter is empty"))?;
    let number = lat_lon_to_zone_number(first.latitude, first.longitude);
    let letter = lat_to_zone_letter(first.latitude).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!(
                "Position lat: {}, long: {} can't be converted to a UTM zone",
                first.latitude, first.longitude
            ),
        )
    })?;
    let points = positions
        .iter()
        .map(|pos| {
            let (northing, easting, _) = to_utm_wgs84(pos.latitude, pos.longitude, number);
            UtmPoint { easting, northing }
        })
        .collect();
    Ok((UtmZone { number, letter }, points))
}

/// A simulated fix source that drives along a route at a constant velocity.
///
/// A fix is emitted every `tick`. After the last waypoint the route starts
/// again at the first one, a single waypoint gives a stationary source.
pub struct RouteSource {
    descriptor: ProviderDescriptor,
    zone: UtmZone,
    points: Arc<Vec<UtmPoint>>,
    velocity: f64,
    tick: Duration,
}

impl RouteSource {
    pub const PROVIDER_ID: &'static str = "route";

    /// Creates a route source.
    ///
    /// `velocity` is in meters per second. The source declares itself as a
    /// coarse, low power provider unless [`with_profile`](Self::with_profile)
    /// says otherwise.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidData` if `positions` is empty, a position can't be
    /// projected, `velocity` is negative or not finite or `tick` is zero.
    pub fn new(positions: &[Position], velocity: f64, tick: Duration) -> Result<Self, Error> {
        if tick.is_zero() {
            return Err(Error::new(ErrorKind::InvalidData, "tick must not be zero"));
        }
        if !velocity.is_finite() || velocity < 0.0 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("velocity must be a finite, non negative number, got {velocity}"),
            ));
        }
        let (zone, points) = convert_route_points(positions)?;
        Ok(RouteSource {
            descriptor: ProviderDescriptor::new(Self::PROVIDER_ID, Accuracy::Coarse, PowerUsage::Low),
            zone,
            points: Arc::new(points),
            velocity,
            tick,
        })
    }

    /// Overrides the declared accuracy and power profile.
    pub fn with_profile(mut self, accuracy: Accuracy, power: PowerUsage) -> Self {
        self.descriptor.accuracy = accuracy;
        self.descriptor.power = power;
        self
    }

    /// Overrides the provider id.
    pub fn with_id(mut self, id: &str) -> Self {
        self.descriptor.id = common::provider::ProviderId::new(id);
        self
    }
}

#[async_trait::async_trait]
impl FixSource for RouteSource {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn open(&self) -> Result<FixStream, ProviderError> {
        let runtime = RouteRuntime {
            points: self.points.clone(),
            zone: self.zone,
            current: self.points[0],
            next_point: 1 % self.points.len(),
            step_m: self.velocity * self.tick.as_secs_f64(),
        };
        let mut timer = interval(self.tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let fixes = stream::unfold((timer, runtime), |(mut timer, mut runtime)| async move {
            timer.tick().await;
            let fix = runtime.next_fix();
            Some((fix, (timer, runtime)))
        });
        Ok(fixes.boxed())
    }
}
