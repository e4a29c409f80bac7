// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, str::FromStr};

/// A location permission scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionScope {
    FineLocation,
    CoarseLocation,
}

impl PermissionScope {
    /// The scopes a location reporter needs, all of them must be granted.
    pub const REQUIRED: [PermissionScope; 2] =
        [PermissionScope::FineLocation, PermissionScope::CoarseLocation];
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionScope::FineLocation => f.write_str("fine"),
            PermissionScope::CoarseLocation => f.write_str("coarse"),
        }
    }
}

impl FromStr for PermissionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fine" => Ok(PermissionScope::FineLocation),
            "coarse" => Ok(PermissionScope::CoarseLocation),
            other => Err(format!("unknown permission scope `{other}`, expected fine or coarse")),
        }
    }
}

/// Common interface to query the authorization of the caller.
pub trait PermissionChecker: Send + Sync {
    fn is_granted(&self, scope: PermissionScope) -> bool;
}

/// A [`PermissionChecker`] backed by a fixed set of granted scopes.
#[derive(Clone, Debug, Default)]
pub struct StaticPermissions {
    granted: HashSet<PermissionScope>,
}

impl StaticPermissions {
    /// Grants exactly the given scopes.
    pub fn new(granted: impl IntoIterator<Item = PermissionScope>) -> Self {
        StaticPermissions {
            granted: granted.into_iter().collect(),
        }
    }

    /// Grants every location scope.
    pub fn all_granted() -> Self {
        StaticPermissions::new(PermissionScope::REQUIRED)
    }

    /// Grants nothing.
    pub fn none_granted() -> Self {
        StaticPermissions::default()
    }

    /// Withdraws `scope`.
    pub fn revoke(mut self, scope: PermissionScope) -> Self {
        self.granted.remove(&scope);
        self
    }
}

impl PermissionChecker for StaticPermissions {
    fn is_granted(&self, scope: PermissionScope) -> bool {
        self.granted.contains(&scope)
    }
}
