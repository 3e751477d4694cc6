use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core portal services and components.
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod navigation;
pub mod session;

// Route table segregation (Public, Migrant, Staff).
pub mod routes;
use routes::{migrant, public, staff};

// --- Public Re-exports ---

pub use api::{ApiState, HttpPortalApi, PortalApi};
pub use config::AppConfig;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionState, SessionStore};

/// ApiDoc
///
/// OpenAPI document for the portal's own HTTP surface, served at
/// `/api-docs/openapi.json` and browsable through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::landing, handlers::home, handlers::sign_in_page, handlers::sign_in,
        handlers::sign_out, handlers::sign_up_page, handlers::agency_dashboard,
        handlers::select_agency_page, handlers::select_agency_submit, handlers::verify_page,
        handlers::submit_complaint_page, handlers::user_complaints_page,
        handlers::department_dashboard, handlers::government_dashboard,
        handlers::government_agency_action
    ),
    components(
        schemas(
            models::MigrantProfile, models::AgencySummary, models::Agency, models::AgencyStats,
            models::AgencyAction, models::StatusFilter, models::SignInRequest,
            models::SelectAgencyForm, models::LandingView, models::HomeView, models::SignInView,
            models::SignUpView, models::SelectAgencyView, models::MigrantPageView,
            models::DepartmentDashboardView, models::GovernmentDashboardView,
            models::AgencyDashboardView, models::NotFoundView, models::ErrorBody,
            navigation::SubjectKind,
        )
    ),
    tags(
        (name = "migrant-portal", description = "Migrant Verification Portal")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a request needs: the external API client and the session store.
/// Cloned per request; both are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Client for the external verification API.
    pub api: ApiState,
    /// Per-browser session areas.
    pub sessions: SessionState,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ApiState {
    fn from_ref(app_state: &AppState) -> ApiState {
        app_state.api.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

/// create_router
///
/// Assembles the route table, mounts the guarded groups behind the access
/// guard, and applies the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(auth::SESSION_HEADER)]);

    let x_request_id = HeaderName::from_static("x-request-id");

    let guarded = Router::new()
        .merge(migrant::migrant_routes())
        .merge(staff::staff_routes())
        // route_layer: unmatched paths fall through to the 404 fallback unguarded.
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::guard_middleware,
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(guarded)
        .fallback(handlers::not_found)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one portal request, correlated by `x-request-id`. The session id is
/// recorded too, so a subject's navigation can be followed across requests.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_string()
    };

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %header("x-request-id"),
        session = %header(auth::SESSION_HEADER),
    )
}
