/// Notification publishing service
///
/// Composes the builder with the subscription registry: every accepted
/// publish request produces one notification and exactly one broadcast.
use crate::error::Result;
use crate::models::{CreateNotificationRequest, PublishAccepted};
use crate::services::NotificationBuilder;
use crate::websocket::SubscriptionRegistry;
use std::sync::Arc;

pub struct NotificationService {
    builder: NotificationBuilder,
    registry: Arc<SubscriptionRegistry>,
}

impl NotificationService {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            builder: NotificationBuilder::new(),
            registry,
        }
    }

    /// Validate, build and broadcast a notification
    ///
    /// Delivery is best-effort; the result only reflects validation.
    pub async fn publish(&self, req: CreateNotificationRequest) -> Result<PublishAccepted> {
        let publication = self.builder.build(req)?;
        let notification = &publication.envelope.notification;

        for channel in publication.deferred_channels() {
            tracing::info!(
                notification_id = %notification.id,
                channel = %channel,
                "delivery channel recorded, not executed by this service"
            );
        }

        self.registry.broadcast(&publication.envelope).await;

        Ok(PublishAccepted::new(notification.id))
    }
}
