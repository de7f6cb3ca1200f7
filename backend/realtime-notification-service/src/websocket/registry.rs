/// Subscription registry and broadcaster
///
/// Tracks every live stream together with its subscription filters and fans
/// published envelopes out to the matching ones.
///
/// Locking:
/// - `streams` is the only shared mutable state. Connect, disconnect and the
///   snapshot/prune steps of a broadcast each take it once, briefly, and never
///   across an `.await`.
/// - `dispatch` serializes broadcast passes so every stream sees messages in
///   publish order. Connect/disconnect never touch it.
/// - A pass, once its snapshot is taken, runs on its own task and always
///   finishes, even if the publishing caller is dropped.
use super::subscription::Subscription;
use crate::error::DeliveryFailure;
use crate::metrics;
use crate::models::BroadcastEnvelope;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Default upper bound for one send during a broadcast pass
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(250);

/// Default capacity of a stream's outbound queue
pub const DEFAULT_STREAM_BUFFER: usize = 32;

/// Outbound half of a stream: serialized envelopes, shared between recipients
pub type StreamSender = mpsc::Sender<Arc<str>>;
pub type StreamReceiver = mpsc::Receiver<Arc<str>>;

/// Unique identifier for a connected stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(Uuid);

impl StreamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A connected stream as the registry sees it
#[derive(Debug, Clone)]
pub struct StreamHandle {
    id: StreamId,
    sender: StreamSender,
}

impl StreamHandle {
    pub fn new(id: StreamId, sender: StreamSender) -> Self {
        Self { id, sender }
    }

    /// Creates a fresh stream id with a bounded outbound queue
    pub fn channel(capacity: usize) -> (Self, StreamReceiver) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(StreamId::new(), sender), receiver)
    }

    pub fn id(&self) -> StreamId {
        self.id
    }
}

struct StreamEntry {
    sender: StreamSender,
    subscription: Subscription,
}

pub struct SubscriptionRegistry {
    streams: Mutex<HashMap<StreamId, StreamEntry>>,
    dispatch: Arc<tokio::sync::Mutex<()>>,
    send_timeout: Duration,
    buffer_size: usize,
}

impl SubscriptionRegistry {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            dispatch: Arc::new(tokio::sync::Mutex::new(())),
            send_timeout,
            buffer_size: DEFAULT_STREAM_BUFFER,
        }
    }

    /// Capacity used by `stream_channel`; zero is bumped to one
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// A fresh stream handle sized for this registry
    pub fn stream_channel(&self) -> (StreamHandle, StreamReceiver) {
        StreamHandle::channel(self.buffer_size)
    }

    /// Register an already-accepted stream
    ///
    /// Connecting an id that is already live replaces its entry.
    pub fn connect(&self, stream: StreamHandle, subscription: Subscription) {
        let StreamHandle { id, sender } = stream;
        let mut streams = self.streams.lock();
        let replaced = streams
            .insert(
                id,
                StreamEntry {
                    sender,
                    subscription: subscription.clone(),
                },
            )
            .is_some();
        let live = streams.len();
        metrics::set_live_streams(live);
        drop(streams);

        tracing::debug!(
            stream_id = %id,
            user_id = ?subscription.user_id(),
            topic = ?subscription.topic(),
            replaced,
            live,
            "stream connected"
        );
    }

    /// Connect and return a guard that disconnects the stream when dropped
    pub fn register(
        self: &Arc<Self>,
        stream: StreamHandle,
        subscription: Subscription,
    ) -> Registration {
        let id = stream.id();
        self.connect(stream, subscription);
        Registration {
            id,
            registry: Arc::clone(self),
        }
    }

    /// Remove a stream; unknown ids are ignored
    pub fn disconnect(&self, id: StreamId) {
        let mut streams = self.streams.lock();
        let removed = streams.remove(&id).is_some();
        let live = streams.len();
        if removed {
            metrics::set_live_streams(live);
        }
        drop(streams);

        if removed {
            tracing::debug!(stream_id = %id, live, "stream disconnected");
        }
    }

    /// Deliver an envelope to every stream whose subscription matches
    ///
    /// Best-effort and at most once per recipient. Streams whose send fails
    /// (closed, or not accepting within the send timeout) are removed.
    pub async fn broadcast(self: &Arc<Self>, envelope: &BroadcastEnvelope) {
        let notification_id = envelope.notification.id;
        let payload: Arc<str> = match envelope.to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!(
                    notification_id = %notification_id,
                    error = %e,
                    "failed to serialize notification, dropping broadcast"
                );
                return;
            }
        };

        let turn = Arc::clone(&self.dispatch).lock_owned().await;
        metrics::record_broadcast();
        let recipients = self.snapshot(envelope);

        let registry = Arc::clone(self);
        let pass = tokio::spawn(async move {
            let _turn = turn;
            registry.deliver(notification_id, payload, recipients).await;
        });

        if let Err(e) = pass.await {
            tracing::error!(
                notification_id = %notification_id,
                error = %e,
                "broadcast pass aborted"
            );
        }
    }

    /// Sends one payload to every snapshotted recipient, then reaps failures
    async fn deliver(
        &self,
        notification_id: Uuid,
        payload: Arc<str>,
        recipients: Vec<(StreamId, StreamSender)>,
    ) {
        let candidates = recipients.len();

        let timeout = self.send_timeout;
        let sends = recipients.into_iter().map(|(id, sender)| {
            let payload = Arc::clone(&payload);
            async move {
                let outcome = sender
                    .send_timeout(payload, timeout)
                    .await
                    .map_err(|e| DeliveryFailure::from_send_error(e, timeout));
                (id, sender, outcome)
            }
        });

        let mut failed = Vec::new();
        for (id, sender, outcome) in join_all(sends).await {
            match outcome {
                Ok(()) => metrics::record_delivery("delivered"),
                Err(failure) => {
                    metrics::record_delivery(failure.as_label());
                    tracing::debug!(stream_id = %id, reason = %failure, "delivery failed");
                    failed.push((id, sender));
                }
            }
        }

        let reaped = self.reap(&failed);

        tracing::info!(
            notification_id = %notification_id,
            candidates,
            delivered = candidates - failed.len(),
            reaped,
            "broadcast complete"
        );
    }

    fn snapshot(&self, envelope: &BroadcastEnvelope) -> Vec<(StreamId, StreamSender)> {
        self.streams
            .lock()
            .iter()
            .filter(|(_, entry)| entry.subscription.matches_envelope(envelope))
            .map(|(id, entry)| (*id, entry.sender.clone()))
            .collect()
    }

    /// Removes failed streams, skipping any id that was re-connected with a
    /// different channel after the snapshot.
    fn reap(&self, failed: &[(StreamId, StreamSender)]) -> usize {
        if failed.is_empty() {
            return 0;
        }

        let mut streams = self.streams.lock();
        let mut reaped = 0;
        for (id, sender) in failed {
            let same = streams
                .get(id)
                .is_some_and(|entry| entry.sender.same_channel(sender));
            if same {
                streams.remove(id);
                reaped += 1;
            }
        }
        metrics::set_live_streams(streams.len());
        reaped
    }

    /// Drop every stream; their sessions see the outbound channel end and close
    pub fn close_all(&self) {
        let mut streams = self.streams.lock();
        let closed = streams.len();
        streams.clear();
        metrics::set_live_streams(0);
        drop(streams);

        tracing::info!(closed, "closed all notification streams");
    }

    pub fn live_count(&self) -> usize {
        self.streams.lock().len()
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.streams.lock().contains_key(&id)
    }

    pub fn subscription(&self, id: StreamId) -> Option<Subscription> {
        self.streams
            .lock()
            .get(&id)
            .map(|entry| entry.subscription.clone())
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_TIMEOUT)
    }
}

/// Live registration of one stream; disconnects on drop
pub struct Registration {
    id: StreamId,
    registry: Arc<SubscriptionRegistry>,
}

impl Registration {
    pub fn id(&self) -> StreamId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.disconnect(self.id);
    }
}
