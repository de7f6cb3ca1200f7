/// WebSocket upgrade handler for notification streams
///
/// Connect with `ws://host:port/notifications/stream?userId=<id>&topic=<topic>`.
/// Both filters are optional and fixed for the lifetime of the connection.
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::websocket::{NotificationSession, Subscription, SubscriptionRegistry};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamParams {
    pub user_id: Option<String>,
    pub topic: Option<String>,
}

/// Open a notification stream
///
/// Endpoint: GET /notifications/stream
///
/// The handshake is answered before the session starts, so the stream is
/// only registered once the upgrade has been accepted.
pub async fn stream_notifications(
    req: HttpRequest,
    payload: web::Payload,
    query: web::Query<StreamParams>,
    registry: web::Data<Arc<SubscriptionRegistry>>,
) -> Result<HttpResponse, AppError> {
    let mut response = ws::handshake(&req).map_err(|e| {
        tracing::debug!(error = %e, "rejected non-websocket request on stream endpoint");
        AppError::BadRequest(
            "This endpoint is a WebSocket upgrade path. Use a WebSocket client to connect."
                .to_string(),
        )
    })?;

    let params = query.into_inner();
    let session = NotificationSession::new(
        Subscription::new(params.user_id, params.topic),
        registry.get_ref().clone(),
    );

    Ok(response.streaming(ws::WebsocketContext::create(session, payload)))
}

/// Register WebSocket routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/notifications/stream", web::get().to(stream_notifications));
}
