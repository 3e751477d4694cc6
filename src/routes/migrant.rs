use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Migrant Router Module
///
/// Every route here is mounted behind the access-guard middleware, which
/// applies the migrant rules:
/// - `/verify` only before migrant status is confirmed;
/// - `/select-agency` once confirmed, while agency verification is pending;
/// - `/submit-complaint`, `/user-complaints` only after agency verification.
pub fn migrant_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /select-agency
        // Browse agencies, then confirm one to file a verification request.
        .route(
            "/select-agency",
            get(handlers::select_agency_page).post(handlers::select_agency_submit),
        )
        .route("/verify", get(handlers::verify_page))
        .route("/submit-complaint", get(handlers::submit_complaint_page))
        .route("/user-complaints", get(handlers::user_complaints_page))
}
