mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use common::{MockPortalApi, TestPortal, agency, migrant_session, profile};
use migrant_portal::{
    create_router,
    guard::ALREADY_VERIFIED_NOTICE,
    models::{
        GovernmentDashboardView, HomeView, LandingView, NotFoundView, SelectAgencyView,
        SignInView,
    },
    navigation::SubjectKind,
    session::{MemorySessionStore, Session, SessionStore},
};
use std::{sync::Arc, time::Duration};
use tower::util::ServiceExt;
use uuid::Uuid;

const SESSION: &str = "x-session-id";

async fn send(portal: &TestPortal, request: Request<Body>) -> Response {
    create_router(portal.state.clone())
        .oneshot(request)
        .await
        .unwrap()
}

fn get(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(id) = session {
        builder = builder.header(SESSION, id);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, session: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION, id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn session_id(response: &Response) -> String {
    response
        .headers()
        .get(SESSION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("session header on every portal response")
}

async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Public Pages ---

#[tokio::test]
async fn health_check() {
    let portal = TestPortal::new(MockPortalApi::default());
    let response = send(&portal, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_paths_render_not_found() {
    let portal = TestPortal::new(MockPortalApi::default());

    for path in ["/nowhere", "/signin/wizard", "/signup/government"] {
        let response = send(&portal, get(path, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
        let body: NotFoundView = json(response).await;
        assert_eq!(body.path, path);
    }
}

#[tokio::test]
async fn anonymous_request_gets_a_session_id() {
    let portal = TestPortal::new(MockPortalApi::default());
    let response = send(&portal, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(Uuid::parse_str(&session_id(&response)).is_ok());
}

// --- Guard Middleware ---

#[tokio::test]
async fn signed_out_migrant_is_sent_to_sign_in_and_returned_after() {
    let portal = TestPortal::new(MockPortalApi {
        profile: Some(profile(true, true)),
        ..Default::default()
    });

    let response = send(&portal, get("/submit-complaint", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signin/migrant");

    let id = session_id(&response);
    let stored = portal.session(&id).await.unwrap();
    assert_eq!(stored.return_to(), Some("/submit-complaint"));

    let page = send(&portal, get("/signin/migrant", Some(&id))).await;
    let view: SignInView = json(page).await;
    assert_eq!(view.return_to.as_deref(), Some("/submit-complaint"));

    let response = send(
        &portal,
        post_json("/signin/migrant", Some(&id), serde_json::json!({ "token": "t-1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/submit-complaint");

    let stored = portal.session(&id).await.unwrap();
    assert_eq!(stored.migrant_token(), Some("t-1"));
    assert_eq!(stored.user_id(), Some("user-1"));
    assert!(stored.return_to().is_none());

    let response = send(&portal, get("/submit-complaint", Some(&id))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unconfirmed_subject_requesting_complaints_goes_home() {
    let portal = TestPortal::new(MockPortalApi::default());
    let id = portal.seed(&migrant_session(false, false)).await;

    let response = send(&portal, get("/submit-complaint", Some(&id))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/home");
}

#[tokio::test]
async fn confirmed_migrant_on_intake_sees_notice_on_home() {
    let portal = TestPortal::new(MockPortalApi::default());
    let id = portal.seed(&migrant_session(true, true)).await;

    let response = send(&portal, get("/verify", Some(&id))).await;
    assert_eq!(location(&response), "/home");

    let home: HomeView = json(send(&portal, get("/home", Some(&id))).await).await;
    assert_eq!(home.notice.as_deref(), Some(ALREADY_VERIFIED_NOTICE));

    // Shown once.
    let again: HomeView = json(send(&portal, get("/home", Some(&id))).await).await;
    assert!(again.notice.is_none());
}

#[tokio::test]
async fn department_dashboard_requires_name_and_token() {
    let portal = TestPortal::new(MockPortalApi::default());

    let mut partial = Session::new(Uuid::new_v4());
    partial.sign_in_department("dept-token", "");
    let id = portal.seed(&partial).await;
    let response = send(&portal, get("/department-dashboard", Some(&id))).await;
    assert_eq!(location(&response), "/signin/department");

    let response = send(
        &portal,
        post_json(
            "/signin/department",
            Some(&id),
            serde_json::json!({ "token": "dept-token", "departmentName": "Labour" }),
        ),
    )
    .await;
    assert_eq!(location(&response), "/department-dashboard");

    let response = send(&portal, get("/department-dashboard", Some(&id))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn department_sign_in_without_name_is_refused() {
    let portal = TestPortal::new(MockPortalApi::default());
    let response = send(
        &portal,
        post_json("/signin/department", None, serde_json::json!({ "token": "dept-token" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let view: SignInView = json(response).await;
    assert!(view.error.is_some());
}

#[tokio::test]
async fn rejected_migrant_token_stays_on_sign_in() {
    let portal = TestPortal::new(MockPortalApi::default());
    let response = send(
        &portal,
        post_json("/signin/migrant", None, serde_json::json!({ "token": "bad" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// --- Agency Selection ---

#[tokio::test]
async fn pending_migrant_sees_agency_list() {
    let portal = TestPortal::new(MockPortalApi {
        profile: Some(profile(true, false)),
        agencies: vec![agency("a-1", "North Desk", true)],
        ..Default::default()
    });
    let id = portal.seed(&migrant_session(true, false)).await;

    let response = send(&portal, get("/select-agency", Some(&id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let view: SelectAgencyView = json(response).await;
    assert_eq!(view.agencies.len(), 1);
    assert!(view.error.is_none());
}

#[tokio::test]
async fn agency_list_failure_renders_retryable_error() {
    let portal = TestPortal::new(MockPortalApi {
        profile: Some(profile(true, false)),
        fail_agency_list: true,
        ..Default::default()
    });
    let id = portal.seed(&migrant_session(true, false)).await;

    let response = send(&portal, get("/select-agency", Some(&id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let view: SelectAgencyView = json(response).await;
    assert_eq!(
        view.error.as_deref(),
        Some("Failed to load agencies. Please try again.")
    );
}

#[tokio::test]
async fn submitting_a_request_redirects_home_with_confirmation() {
    let api = Arc::new(MockPortalApi {
        profile: Some(profile(true, false)),
        agencies: vec![agency("a-1", "North Desk", true)],
        ..Default::default()
    });
    let portal = TestPortal::with_api(api.clone());
    let id = portal.seed(&migrant_session(true, false)).await;

    let response = send(
        &portal,
        post_json("/select-agency", Some(&id), serde_json::json!({ "agencyId": "a-1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/home");
    assert_eq!(api.sent_requests().len(), 1);

    let home: HomeView = json(send(&portal, get("/home", Some(&id))).await).await;
    assert_eq!(
        home.notice.as_deref(),
        Some("Verification request sent to North Desk!")
    );
}

#[tokio::test]
async fn profile_refresh_updates_the_cached_snapshot() {
    let portal = TestPortal::new(MockPortalApi {
        profile: Some(profile(true, true)),
        ..Default::default()
    });
    let id = portal.seed(&migrant_session(true, false)).await;

    send(&portal, get("/select-agency", Some(&id))).await;

    let stored = portal.session(&id).await.unwrap();
    assert!(stored.migrant_profile().unwrap().agency_verified);
    let response = send(&portal, get("/user-complaints", Some(&id))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// --- Government Dashboard ---

fn gov_session() -> Session {
    let mut session = Session::new(Uuid::new_v4());
    session.sign_in_government("gov-token");
    session
}

#[tokio::test]
async fn government_verify_action_is_reflected_in_counts_and_list() {
    let portal = TestPortal::new(MockPortalApi::with_roster(vec![
        agency("x", "Harbour Agency", false),
        agency("y", "Inland Agency", true),
    ]));
    let id = portal.seed(&gov_session()).await;

    let before: GovernmentDashboardView =
        json(send(&portal, get("/government-dashboard", Some(&id))).await).await;
    assert_eq!(before.stats.pending, 1);
    assert_eq!(before.agencies.len(), 1);

    let response = send(
        &portal,
        post_json(
            "/government-dashboard/agencies/x/verify",
            Some(&id),
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let after: GovernmentDashboardView = json(response).await;
    assert_eq!(after.stats.verified, 2);
    assert_eq!(after.stats.pending, 0);
    assert!(after.agencies.is_empty());
}

#[tokio::test]
async fn government_filter_comes_from_query() {
    let portal = TestPortal::new(MockPortalApi::with_roster(vec![
        agency("x", "Harbour Agency", false),
        agency("y", "Inland Agency", true),
    ]));
    let id = portal.seed(&gov_session()).await;

    let view: GovernmentDashboardView = json(
        send(&portal, get("/government-dashboard?status=all&search=inland", Some(&id))).await,
    )
    .await;
    assert_eq!(view.agencies.len(), 1);
    assert_eq!(view.agencies[0].id, "y");
    assert_eq!(view.stats.total, 2);
}

#[tokio::test]
async fn rejected_government_token_signs_out() {
    let portal = TestPortal::new(MockPortalApi {
        reject_government_token: true,
        ..Default::default()
    });
    let id = portal.seed(&gov_session()).await;

    let response = send(&portal, get("/government-dashboard", Some(&id))).await;
    assert_eq!(location(&response), "/signin/government");
    let stored = portal.session(&id).await.unwrap();
    assert!(stored.government_token().is_none());
}

#[tokio::test]
async fn unknown_government_action_is_not_found() {
    let portal = TestPortal::new(MockPortalApi::with_roster(vec![]));
    let id = portal.seed(&gov_session()).await;

    let response = send(
        &portal,
        post_json(
            "/government-dashboard/agencies/x/promote",
            Some(&id),
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn government_sign_out_clears_token() {
    let portal = TestPortal::new(MockPortalApi::default());
    let id = portal.seed(&gov_session()).await;

    let response = send(&portal, post_json("/signout/government", Some(&id), serde_json::json!({}))).await;
    assert_eq!(location(&response), "/signin/government");

    let response = send(&portal, get("/government-dashboard", Some(&id))).await;
    assert_eq!(location(&response), "/signin/government");
}

#[tokio::test]
async fn government_action_fetches_the_roster_once() {
    let api = Arc::new(MockPortalApi::with_roster(vec![
        agency("x", "Harbour Agency", false),
        agency("y", "Inland Agency", true),
    ]));
    let portal = TestPortal::with_api(api.clone());
    let id = portal.seed(&gov_session()).await;

    let response = send(
        &portal,
        post_json(
            "/government-dashboard/agencies/y/reject?status=all",
            Some(&id),
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(api.fetch_count(), 1);

    let view: GovernmentDashboardView = json(response).await;
    assert_eq!(view.stats.pending, 2);
    assert_eq!(view.agencies.len(), 2);
}

#[tokio::test]
async fn failed_government_action_renders_roster_with_error() {
    let api = Arc::new(MockPortalApi {
        fail_update: true,
        ..MockPortalApi::with_roster(vec![agency("x", "Harbour Agency", false)])
    });
    let portal = TestPortal::with_api(api.clone());
    let id = portal.seed(&gov_session()).await;

    let response = send(
        &portal,
        post_json(
            "/government-dashboard/agencies/x/verify",
            Some(&id),
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(api.fetch_count(), 1);

    let view: GovernmentDashboardView = json(response).await;
    assert_eq!(view.agencies.len(), 1);
    assert_eq!(
        view.error.as_deref(),
        Some("Failed to verify agency. Please try again.")
    );
}

// --- Wire Format ---

async fn raw(response: Response) -> serde_json::Value {
    json(response).await
}

#[tokio::test]
async fn page_views_use_camel_case_keys() {
    let portal = TestPortal::new(MockPortalApi::default());

    let landing = raw(send(&portal, get("/", None)).await).await;
    assert!(landing.get("signIn").is_some());
    assert!(landing.get("signedIn").is_some());
    assert!(landing.get("sign_in").is_none());

    let redirected = send(&portal, get("/select-agency", None)).await;
    let id = session_id(&redirected);
    let sign_in = raw(send(&portal, get("/signin/migrant", Some(&id))).await).await;
    assert_eq!(sign_in["returnTo"], "/select-agency");

    let agency = raw(send(&portal, get("/agency-dashboard", None)).await).await;
    assert_eq!(agency["signedIn"], false);
}

#[tokio::test]
async fn landing_lists_signed_in_kinds() {
    let portal = TestPortal::new(MockPortalApi::default());
    let id = portal.seed(&gov_session()).await;

    let landing: LandingView = json(send(&portal, get("/", Some(&id))).await).await;
    assert_eq!(landing.signed_in, vec![SubjectKind::Government]);
    assert_eq!(landing.sign_in.len(), 4);
}

// --- Session Lifetime ---

#[tokio::test]
async fn overlapping_requests_keep_each_others_keys() {
    let portal = TestPortal::new(MockPortalApi::default());
    let id = portal.seed(&migrant_session(true, true)).await;

    // Leaves a notice behind.
    send(&portal, get("/verify", Some(&id))).await;
    let mut stale_snapshot = portal.session(&id).await.unwrap();

    send(
        &portal,
        post_json("/signin/government", Some(&id), serde_json::json!({ "token": "gov" })),
    )
    .await;

    // An older snapshot consuming the notice must not drop the new token.
    stale_snapshot.take_notice();
    portal.store.save(&stale_snapshot).await.unwrap();

    let stored = portal.session(&id).await.unwrap();
    assert_eq!(stored.government_token(), Some("gov"));
    assert_eq!(stored.migrant_token(), Some("migrant-token"));
}

#[tokio::test]
async fn anonymous_redirects_expire() {
    let store = Arc::new(MemorySessionStore::with_ttl(Duration::from_millis(50)));
    let portal = TestPortal::with_store(Arc::new(MockPortalApi::default()), store.clone());

    for _ in 0..20 {
        let response = send(&portal, get("/select-agency", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
    assert_eq!(store.len().await, 20);

    tokio::time::sleep(Duration::from_millis(120)).await;
    send(&portal, get("/select-agency", None)).await;
    assert_eq!(store.len().await, 1);
}
