use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_api::config::Config;
use chat_api::gateway::hub::Hub;
use chat_api::notifier::{NotificationClient, Notifier};
use chat_api::AppState;

#[tokio::main]
async fn main() {
    // Env vars may also be set externally, so a missing .env is not an error.
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let db = chat_api::db::pool::connect(&config.database_url).await;

    let notifier: Arc<dyn Notifier> = Arc::new(
        NotificationClient::new(
            &config.notification_service_url,
            Duration::from_secs(config.notification_timeout_secs),
        )
        .expect("failed to build notification client"),
    );

    let hub = Hub::spawn(config.hub_queue_capacity);

    tracing::info!(
        notification_service_url = %config.notification_service_url,
        hub_queue_capacity = config.hub_queue_capacity,
        "chat-api configured"
    );

    let state = AppState {
        db,
        config: Arc::new(config),
        hub: hub.clone(),
        notifier,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(chat_api::routes::router())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(chat_api::routes::request_span::<axum::body::Body>),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "chat-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
        .expect("server error");
}

async fn shutdown_signal(hub: Hub) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutting down, closing realtime connections");
    if let Err(err) = hub.shutdown().await {
        tracing::warn!(%err, "connection hub already stopped");
    }
}
