use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hub_server::config::Config;
use hub_server::store::MemoryStore;
use hub_server::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing — env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    // In-memory store for now. Replace with the MongoDB-backed store when a
    // durable deployment is wired up.
    let state = AppState::new(config, Arc::new(MemoryStore::new()));

    // Ring-timeout sweeper: calls nobody answers must not ring forever.
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let timeout = Duration::from_secs(sweep_state.config.ring_timeout_secs);
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            let ended = sweep_state
                .calls
                .sweep_ring_timeouts(&sweep_state.registry, timeout);
            if ended > 0 {
                tracing::info!(ended, "ring-timeout sweep ended unanswered calls");
            }
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = hub_server::routes::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "hub-server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
