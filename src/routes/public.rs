use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Pages reachable without any session. Sign-in and sign-out live here since
/// they are how a session acquires or drops credentials.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::landing))
        // GET /home
        // General home page; also where guard redirects and confirmations land.
        .route("/home", get(handlers::home))
        // GET/POST /signin/{role}
        // The POST records credentials issued by the external auth service.
        .route(
            "/signin/{role}",
            get(handlers::sign_in_page).post(handlers::sign_in),
        )
        .route("/signout/{role}", post(handlers::sign_out))
        .route("/signup/{role}", get(handlers::sign_up_page))
        // GET /agency-dashboard
        // Agency staff have no guard of their own; the page renders for anyone.
        .route("/agency-dashboard", get(handlers::agency_dashboard))
}
