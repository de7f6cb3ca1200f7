/// WebSocket real-time notification streams
///
/// Architecture:
/// 1. Subscription: per-stream userId/topic filter and the match predicate
/// 2. SubscriptionRegistry: live streams, connect/disconnect, filtered fan-out
/// 3. NotificationSession: one actor per socket, registers on start and
///    disconnects on close

pub mod registry;
pub mod session;
pub mod subscription;

pub use registry::{
    Registration, StreamHandle, StreamId, StreamReceiver, StreamSender, SubscriptionRegistry,
    DEFAULT_SEND_TIMEOUT, DEFAULT_STREAM_BUFFER,
};
pub use session::NotificationSession;
pub use subscription::Subscription;
