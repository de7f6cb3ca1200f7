use actix_web::{web, HttpResponse};
use serde_json::json;

/// Version of the public notification API, independent of the crate version
pub const API_VERSION: &str = "1.0.0";

pub async fn service_info() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "name": "Notification Service API",
        "version": API_VERSION,
        "status": "ok",
    }))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(service_info))
        .route("/health", web::get().to(health));
}
