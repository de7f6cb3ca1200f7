/// Turns a publish request into an immutable notification envelope
use crate::error::Result;
use crate::models::{
    BroadcastEnvelope, CreateNotificationRequest, DeliveryChannel, Notification, NotificationType,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

/// A validated notification plus the channels the publisher asked for
#[derive(Debug, Clone)]
pub struct Publication {
    pub envelope: BroadcastEnvelope,
    pub channels: Vec<DeliveryChannel>,
}

impl Publication {
    /// Channels that are recorded but not executed by this service
    pub fn deferred_channels(&self) -> impl Iterator<Item = DeliveryChannel> + '_ {
        self.channels
            .iter()
            .copied()
            .filter(|c| *c != DeliveryChannel::InApp)
    }
}

pub struct NotificationBuilder {
    // wall clock can step backwards; createdAt must not
    last_created_at: Mutex<Option<DateTime<Utc>>>,
}

impl NotificationBuilder {
    pub fn new() -> Self {
        Self {
            last_created_at: Mutex::new(None),
        }
    }

    pub fn build(&self, req: CreateNotificationRequest) -> Result<Publication> {
        let notification_type: NotificationType = req.notification_type.parse()?;
        let channels = req
            .channels
            .unwrap_or_default()
            .iter()
            .map(|c| c.parse::<DeliveryChannel>())
            .collect::<Result<Vec<_>>>()?;

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: req.user_id,
            order_id: req.order_id,
            notification_type,
            title: req.title,
            body: req.body,
            data: req.data,
            read: false,
            created_at: self.next_timestamp(),
        };

        Ok(Publication {
            envelope: BroadcastEnvelope::new(notification, req.topic),
            channels,
        })
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self.last_created_at.lock();
        let now = Utc::now();
        let stamp = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}

impl Default for NotificationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;
    use std::collections::HashSet;
    use tokio_test::{assert_err, assert_ok};

    fn request(value: serde_json::Value) -> CreateNotificationRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_build_minimal_notification() {
        let builder = NotificationBuilder::new();
        let publication = assert_ok!(builder.build(request(json!({
            "type": "system",
            "title": "hi"
        }))));

        let n = &publication.envelope.notification;
        assert_eq!(n.notification_type, NotificationType::System);
        assert_eq!(n.title, "hi");
        assert!(!n.read);
        assert!(n.user_id.is_none());
        assert!(publication.envelope.topic.is_none());
        assert!(publication.channels.is_empty());
    }

    #[test]
    fn test_build_copies_routing_fields() {
        let builder = NotificationBuilder::new();
        let publication = assert_ok!(builder.build(request(json!({
            "userId": "u1",
            "topic": "orders",
            "orderId": "o-42",
            "type": "order_update",
            "title": "Shipped",
            "body": "Your order is on its way",
            "data": {"carrier": "dhl"},
            "channels": ["in_app", "email"]
        }))));

        let envelope = &publication.envelope;
        assert_eq!(envelope.user_id(), Some("u1"));
        assert_eq!(envelope.topic.as_deref(), Some("orders"));
        assert_eq!(envelope.notification.order_id.as_deref(), Some("o-42"));
        assert_eq!(envelope.notification.data.as_ref().unwrap()["carrier"], json!("dhl"));
        assert_eq!(
            publication.channels,
            vec![DeliveryChannel::InApp, DeliveryChannel::Email]
        );
        assert_eq!(
            publication.deferred_channels().collect::<Vec<_>>(),
            vec![DeliveryChannel::Email]
        );
    }

    #[test]
    fn test_rejects_unknown_type() {
        let builder = NotificationBuilder::new();
        let err = assert_err!(builder.build(request(json!({"type": "like", "title": "x"}))));
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_rejects_unknown_channel() {
        let builder = NotificationBuilder::new();
        let err = assert_err!(builder.build(request(json!({
            "type": "promotion",
            "title": "x",
            "channels": ["in_app", "fax"]
        }))));
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_ids_are_unique_and_timestamps_monotonic() {
        let builder = NotificationBuilder::new();
        let mut ids = HashSet::new();
        let mut previous = None;

        for _ in 0..100 {
            let publication = builder
                .build(request(json!({"type": "system", "title": "tick"})))
                .unwrap();
            let n = publication.envelope.notification;
            assert!(ids.insert(n.id));
            if let Some(prev) = previous {
                assert!(n.created_at >= prev);
            }
            previous = Some(n.created_at);
        }
    }

    #[test]
    fn test_timestamp_never_goes_backwards() {
        let builder = NotificationBuilder::new();
        let future = Utc::now() + chrono::Duration::seconds(60);
        *builder.last_created_at.lock() = Some(future);

        assert_eq!(builder.next_timestamp(), future);
    }
}
