//! Log-only notification sink.
//!
//! Push delivery goes through the platform's device-registry service, which
//! sits outside this crate. This sink records the fanout in the logs so a
//! deployment without that service still runs end to end.

use async_trait::async_trait;
use tracing::info;

use crate::ports::{Notification, NotificationOutcome, Notifier};

#[derive(Debug, Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, notification: Notification) -> NotificationOutcome {
        info!(
            user_id = %notification.user_id,
            title = %notification.title,
            body = %notification.body,
            "Notification"
        );
        NotificationOutcome::Delivered
    }
}
