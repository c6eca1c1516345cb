//! Recording notification sink for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::ports::{Notification, NotificationOutcome, Notifier};

/// Captures every notification so tests can assert on the fanout.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Notifications addressed to one user.
    pub fn sent_to(&self, user_id: &UserId) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| &n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> NotificationOutcome {
        self.sent.lock().unwrap().push(notification);
        NotificationOutcome::Delivered
    }
}
