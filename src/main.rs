use migrant_portal::{
    AppState,
    api::{ApiState, HttpPortalApi},
    config::{AppConfig, Env},
    create_router,
    session::{FileSessionStore, MemorySessionStore, SessionState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the session store and the API client,
/// then serves the portal.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise development defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "migrant_portal=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Portal starting in {:?} mode", config.env);

    // 3. Session store: file-backed when configured, in-memory otherwise.
    let sessions: SessionState = match &config.session_file {
        Some(path) => {
            let store = FileSessionStore::open(path)
                .await
                .expect("FATAL: Failed to open the session file. Check PORTAL_SESSION_FILE.")
                .with_ttl(config.session_ttl);
            tracing::info!(path = %path.display(), "sessions persisted to file");
            Arc::new(store)
        }
        None => {
            tracing::info!("sessions kept in memory");
            Arc::new(MemorySessionStore::with_ttl(config.session_ttl))
        }
    };

    // 4. External verification API client.
    let api = HttpPortalApi::new(&config.api_base_url, config.http_timeout)
        .expect("FATAL: Failed to build the HTTP client for the verification API.");
    tracing::info!(base_url = %api.base_url(), "verification API configured");
    let api = Arc::new(api) as ApiState;

    let bind_addr = config.bind_addr;
    let app = create_router(AppState { api, sessions });

    // 5. Serve.
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the portal address. Check PORTAL_BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: The portal server stopped unexpectedly.");
}
