// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

/// Identifier of a status notification.
///
/// Showing or updating the same id replaces the notification instead of
/// stacking a new one.
pub type NotificationId = u32;

/// The notification id used for the persistent location status.
pub const LOCATION_NOTIFICATION_ID: NotificationId = 1;

/// Common interface of a notification surface.
///
/// All calls are fire-and-forget, implementations must not block.
pub trait Notifier: Send + Sync {
    /// Creates or replaces the notification `id`.
    ///
    /// A `persistent` notification can't be dismissed by the user while the
    /// service is active.
    fn show(&self, id: NotificationId, title: &str, body: &str, persistent: bool);

    /// Replaces the body text of the notification `id`.
    fn update(&self, id: NotificationId, body: &str);

    /// Removes the notification `id`. Unknown ids are ignored.
    fn cancel(&self, id: NotificationId);
}
