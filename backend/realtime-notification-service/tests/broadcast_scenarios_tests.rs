/// End-to-end broadcast scenarios against the public service API
///
/// Streams are registered directly with the registry (no socket), then
/// notifications go through `NotificationService::publish` exactly as the
/// HTTP handler does it.
use realtime_notification_service::models::{BroadcastEnvelope, CreateNotificationRequest};
use realtime_notification_service::websocket::StreamReceiver;
use realtime_notification_service::{
    NotificationService, StreamHandle, StreamId, Subscription, SubscriptionRegistry,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn request(value: Value) -> CreateNotificationRequest {
    serde_json::from_value(value).unwrap()
}

fn subscribe(
    registry: &SubscriptionRegistry,
    user_id: Option<&str>,
    topic: Option<&str>,
) -> (StreamId, StreamReceiver) {
    let (handle, rx) = registry.stream_channel();
    let id = handle.id();
    registry.connect(
        handle,
        Subscription::new(user_id.map(String::from), topic.map(String::from)),
    );
    (id, rx)
}

fn titles(rx: &mut StreamReceiver) -> Vec<String> {
    let mut titles = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        let envelope: BroadcastEnvelope = serde_json::from_str(&frame).unwrap();
        titles.push(envelope.notification.title);
    }
    titles
}

#[tokio::test]
async fn test_user_filter_then_disconnect() {
    let registry = Arc::new(SubscriptionRegistry::default());
    let service = NotificationService::new(registry.clone());
    let (a, mut a_rx) = subscribe(&registry, Some("u1"), None);
    let (_b, mut b_rx) = subscribe(&registry, None, None);

    let hi = json!({"userId": "u1", "type": "system", "title": "hi"});
    service.publish(request(hi.clone())).await.unwrap();

    assert_eq!(titles(&mut a_rx), vec!["hi"]);
    assert_eq!(titles(&mut b_rx), vec!["hi"]);

    registry.disconnect(a);
    service.publish(request(hi)).await.unwrap();

    assert!(titles(&mut a_rx).is_empty());
    assert_eq!(titles(&mut b_rx), vec!["hi"]);
}

#[tokio::test]
async fn test_topic_filter_uses_data_topic() {
    let registry = Arc::new(SubscriptionRegistry::default());
    let service = NotificationService::new(registry.clone());
    let (_c, mut c_rx) = subscribe(&registry, None, Some("orders"));

    service
        .publish(request(json!({
            "type": "order_update",
            "title": "x",
            "data": {"topic": "orders"}
        })))
        .await
        .unwrap();
    service
        .publish(request(json!({
            "type": "order_update",
            "title": "y",
            "data": {"topic": "promo"}
        })))
        .await
        .unwrap();

    assert_eq!(titles(&mut c_rx), vec!["x"]);
}

#[tokio::test]
async fn test_top_level_topic_overrides_data_topic() {
    let registry = Arc::new(SubscriptionRegistry::default());
    let service = NotificationService::new(registry.clone());
    let (_orders, mut orders_rx) = subscribe(&registry, None, Some("orders"));
    let (_promo, mut promo_rx) = subscribe(&registry, None, Some("promo"));

    service
        .publish(request(json!({
            "topic": "orders",
            "type": "order_update",
            "title": "routed",
            "data": {"topic": "promo"}
        })))
        .await
        .unwrap();

    assert_eq!(titles(&mut orders_rx), vec!["routed"]);
    assert!(titles(&mut promo_rx).is_empty());
}

#[tokio::test]
async fn test_topicless_envelope_only_reaches_unfiltered_topics() {
    let registry = Arc::new(SubscriptionRegistry::default());
    let service = NotificationService::new(registry.clone());
    let (_firehose, mut firehose_rx) = subscribe(&registry, None, None);
    let (_topic, mut topic_rx) = subscribe(&registry, None, Some("orders"));

    service
        .publish(request(json!({"type": "promotion", "title": "sale"})))
        .await
        .unwrap();

    assert_eq!(titles(&mut firehose_rx), vec!["sale"]);
    assert!(titles(&mut topic_rx).is_empty());
}

#[tokio::test]
async fn test_unfiltered_subscriber_receives_everything_in_order() {
    let registry = Arc::new(SubscriptionRegistry::default());
    let service = NotificationService::new(registry.clone());
    let (_all, mut all_rx) = subscribe(&registry, None, None);

    let sent = vec![
        json!({"type": "system", "title": "1"}),
        json!({"userId": "u7", "type": "promotion", "title": "2"}),
        json!({"topic": "orders", "type": "order_update", "title": "3"}),
        json!({"type": "review_event", "title": "4", "data": {"topic": "reviews"}}),
    ];
    for body in sent {
        service.publish(request(body)).await.unwrap();
    }

    assert_eq!(titles(&mut all_rx), vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_failed_streams_are_reaped_exactly() {
    let registry = Arc::new(SubscriptionRegistry::new(Duration::from_millis(20)));
    let service = NotificationService::new(registry.clone());

    let mut alive = Vec::new();
    for _ in 0..3 {
        alive.push(subscribe(&registry, None, None));
    }
    let mut dead = Vec::new();
    for _ in 0..2 {
        let (id, rx) = subscribe(&registry, None, None);
        drop(rx);
        dead.push(id);
    }
    let before = registry.live_count();

    service
        .publish(request(json!({"type": "system", "title": "ping"})))
        .await
        .unwrap();

    assert_eq!(registry.live_count(), before - dead.len());
    for id in dead {
        assert!(!registry.contains(id));
    }
    for (id, rx) in &mut alive {
        assert!(registry.contains(*id));
        assert_eq!(titles(rx), vec!["ping"]);
    }
}

#[tokio::test]
async fn test_registration_guard_and_explicit_disconnect_compose() {
    let registry = Arc::new(SubscriptionRegistry::default());
    let (handle, _rx) = StreamHandle::channel(1);

    let registration = registry.register(handle, Subscription::default());
    let id = registration.id();
    registry.disconnect(id);
    drop(registration);

    assert!(!registry.contains(id));
    assert_eq!(registry.live_count(), 0);
}
