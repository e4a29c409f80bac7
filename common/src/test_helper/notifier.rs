// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::notifier::{NotificationId, Notifier};
use std::sync::Mutex;

/// A call received by the [`RecordingNotifier`].
#[derive(Clone, Debug, PartialEq)]
pub enum NotifierCall {
    Show {
        id: NotificationId,
        title: String,
        body: String,
        persistent: bool,
    },
    Update {
        id: NotificationId,
        body: String,
    },
    Cancel {
        id: NotificationId,
    },
}

/// A [`Notifier`] that only records the calls it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<NotifierCall>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<NotifierCall> {
        self.calls
            .lock()
            .unwrap_or_else(|calls| calls.into_inner())
            .clone()
    }

    /// Returns the bodies of all `update` calls in order.
    pub fn updates(&self) -> Vec<(NotificationId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NotifierCall::Update { id, body } => Some((id, body)),
                NotifierCall::Show { .. } | NotifierCall::Cancel { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: NotifierCall) {
        self.calls
            .lock()
            .unwrap_or_else(|calls| calls.into_inner())
            .push(call);
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, id: NotificationId, title: &str, body: &str, persistent: bool) {
        self.record(NotifierCall::Show {
            id,
            title: title.to_string(),
            body: body.to_string(),
            persistent,
        });
    }

    fn update(&self, id: NotificationId, body: &str) {
        self.record(NotifierCall::Update {
            id,
            body: body.to_string(),
        });
    }

    fn cancel(&self, id: NotificationId) {
        self.record(NotifierCall::Cancel { id });
    }
}
