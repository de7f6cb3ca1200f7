/// HTTP handlers for the realtime notification API
pub mod health;
pub mod notifications;
pub mod websocket;

use actix_web::web;

/// Every route the service exposes except `/metrics`
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    health::register_routes(cfg);
    notifications::register_routes(cfg);
    websocket::register_routes(cfg);
}
