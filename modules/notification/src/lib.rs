// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{DateTime, Utc};
use common::notifier::{NotificationId, Notifier};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::info;

/// The latest state of one status notification.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub persistent: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CenterState {
    notifications: BTreeMap<NotificationId, Notification>,
    update_count: usize,
}

/// An in-memory notification surface for headless hosts.
///
/// Keeps the latest state of every notification and writes each change to
/// the log, which is where a headless user sees it.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    state: RwLock<CenterState>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        NotificationCenter::default()
    }

    /// Returns the current state of notification `id`.
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.read().notifications.get(&id).cloned()
    }

    /// Number of notifications currently shown.
    pub fn len(&self) -> usize {
        self.read().notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of [`Notifier::update`] calls received so far.
    pub fn update_count(&self) -> usize {
        self.read().update_count
    }

    /// Removes notification `id` and returns it.
    pub fn dismiss(&self, id: NotificationId) -> Option<Notification> {
        let removed = self.write().notifications.remove(&id);
        if removed.is_some() {
            info!("Notification {id} dismissed");
        }
        removed
    }

    fn read(&self) -> RwLockReadGuard<'_, CenterState> {
        self.state.read().unwrap_or_else(|state| state.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CenterState> {
        self.state.write().unwrap_or_else(|state| state.into_inner())
    }
}

impl Notifier for NotificationCenter {
    fn show(&self, id: NotificationId, title: &str, body: &str, persistent: bool) {
        info!("Notification {id} [{title}] {body}");
        self.write().notifications.insert(
            id,
            Notification {
                title: title.to_string(),
                body: body.to_string(),
                persistent,
                updated_at: Utc::now(),
            },
        );
    }

    fn update(&self, id: NotificationId, body: &str) {
        let mut state = self.write();
        state.update_count += 1;
        let notification = state.notifications.entry(id).or_insert_with(|| Notification {
            title: String::new(),
            body: String::new(),
            persistent: false,
            updated_at: Utc::now(),
        });
        notification.body = body.to_string();
        notification.updated_at = Utc::now();
        info!("Notification {id} [{}] {body}", notification.title);
    }

    fn cancel(&self, id: NotificationId) {
        self.dismiss(id);
    }
}
