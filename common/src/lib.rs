// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the location reporter
//!
//! Provides the data types and the platform capabilities (location provider,
//! notifier, permissions) that are shared by every modul.

pub mod fix;
pub mod notifier;
pub mod permission;
pub mod position;
pub mod provider;
pub mod serde;
pub mod state;
pub mod subscription;
pub mod test_helper;
