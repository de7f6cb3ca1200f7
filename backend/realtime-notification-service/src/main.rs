use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use realtime_notification_service::{
    handlers::register_routes, metrics, Config, NotificationService, SubscriptionRegistry,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn cors(config: &Config) -> Cors {
    match config.allowed_origins() {
        None => Cors::permissive(),
        Some(origins) => origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting realtime notification service");

    let config = Config::from_env().context("invalid configuration")?;

    let registry = Arc::new(
        SubscriptionRegistry::new(config.send_timeout())
            .with_buffer_size(config.stream_buffer_size),
    );
    let notification_service = Arc::new(NotificationService::new(registry.clone()));
    tracing::info!(
        send_timeout_ms = config.stream_send_timeout_ms,
        buffer_size = config.stream_buffer_size,
        "subscription registry initialized"
    );

    let addr = config.bind_address();
    tracing::info!("Starting HTTP server on {}", addr);

    let server_registry = registry.clone();
    let server_config = config.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(server_registry.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .wrap(cors(&server_config))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(register_routes)
    })
    .disable_signals()
    .bind(&addr)
    .with_context(|| format!("failed to bind {}", addr))?
    .run();

    // Streams never finish on their own, so close them before draining
    let handle = server.handle();
    let shutdown_registry = registry.clone();
    actix_rt::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, closing notification streams");
        shutdown_registry.close_all();
        handle.stop(true).await;
    });

    server.await.context("HTTP server terminated with an error")?;
    tracing::info!("Realtime notification service stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
