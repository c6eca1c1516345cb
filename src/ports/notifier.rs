//! Notification sink port.
//!
//! Push-notification delivery is an external collaborator; this crate only
//! consumes it as a fire-and-forget capability. Delivery failures never fail
//! the calling workflow.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::UserId;

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Recipient.
    pub user_id: UserId,

    /// Short title.
    pub title: String,

    /// Body text.
    pub body: String,

    /// Structured payload for the client app.
    pub data: Value,
}

impl Notification {
    /// Creates a notification with an empty data payload.
    pub fn new(user_id: UserId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            body: body.into(),
            data: Value::Null,
        }
    }

    /// Attaches a structured payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Result of a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Pushed to at least one registered device.
    Delivered,

    /// The user has no registered device; silently skipped.
    Skipped,
}

/// Port for pushing user-facing events.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a notification, returning whether it reached a device.
    ///
    /// Implementations must not propagate transport errors as failures of
    /// the calling workflow; an undeliverable notification is `Skipped`.
    async fn notify(&self, notification: Notification) -> NotificationOutcome;
}
