use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Staff Router Module
///
/// Department and government dashboards. Mounted behind the access-guard
/// middleware: the department dashboard needs both the department token and
/// the department name, the government dashboard needs the government token.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/department-dashboard", get(handlers::department_dashboard))
        // GET /government-dashboard?status=&search=
        // Counts and filtered list, both derived from one roster fetch.
        .route("/government-dashboard", get(handlers::government_dashboard))
        // POST /government-dashboard/agencies/{id}/{action}
        // `action` is `verify` or `reject`; the roster is re-fetched afterwards.
        .route(
            "/government-dashboard/agencies/{id}/{action}",
            post(handlers::government_agency_action),
        )
}
