use crate::error::AppError;
use crate::models::CreateNotificationRequest;
use crate::services::NotificationService;
/// Notification publish handler
use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

/// Publish a notification to connected stream clients
///
/// POST /notifications
///
/// Returns `202 Accepted` with `{"status": "accepted", "id": "<uuid>"}`.
/// Only in-app (WebSocket) delivery is executed; other requested channels
/// are recorded.
pub async fn publish_notification(
    service: web::Data<Arc<NotificationService>>,
    req: web::Json<CreateNotificationRequest>,
) -> ActixResult<HttpResponse> {
    let accepted = service.publish(req.into_inner()).await?;
    Ok(HttpResponse::Accepted().json(accepted))
}

/// Malformed or incomplete bodies are validation failures, not generic 400s
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(err.to_string()).into()
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error_handler)
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/notifications")
            .app_data(json_config())
            .route(web::post().to(publish_notification)),
    );
}
