/// WebSocket session for one notification stream
///
/// Registers itself with the subscription registry when the actor starts
/// (the handshake has already been answered by then), forwards broadcast
/// frames to the socket, and disconnects when the socket or the registry side
/// of the channel goes away.
use super::registry::{Registration, SubscriptionRegistry};
use super::subscription::Subscription;
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

pub struct NotificationSession {
    subscription: Subscription,
    registry: Arc<SubscriptionRegistry>,
    registration: Option<Registration>,
}

impl NotificationSession {
    pub fn new(subscription: Subscription, registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            subscription,
            registry,
            registration: None,
        }
    }
}

impl Actor for NotificationSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (handle, receiver) = self.registry.stream_channel();
        let registration = self.registry.register(handle, self.subscription.clone());

        tracing::info!(
            stream_id = %registration.id(),
            user_id = ?self.subscription.user_id(),
            topic = ?self.subscription.topic(),
            "notification stream opened"
        );

        self.registration = Some(registration);
        ctx.add_stream(ReceiverStream::new(receiver));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Registration disconnects on drop
        if let Some(registration) = self.registration.take() {
            tracing::info!(stream_id = %registration.id(), "notification stream closed");
        }
    }
}

// Outbound: serialized envelopes from the registry
impl StreamHandler<Arc<str>> for NotificationSession {
    fn handle(&mut self, frame: Arc<str>, ctx: &mut Self::Context) {
        ctx.text(String::from(&*frame));
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // The registry dropped our sender: reaped after a failed send, or shutdown
        ctx.close(Some(ws::CloseCode::Away.into()));
        ctx.stop();
    }
}

// Inbound: only used to detect liveness and close
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for NotificationSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(bytes)) => ctx.pong(&bytes),
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(_)) | Ok(ws::Message::Binary(_)) => {
                tracing::trace!("ignoring inbound frame on notification stream");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(?reason, "client closed notification stream");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!(error = %e, "websocket protocol error, closing stream");
                ctx.stop();
            }
        }
    }
}
