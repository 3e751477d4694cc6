use crate::{
    AppState,
    auth::{CurrentSession, session_header},
    error::PortalError,
    flows::{
        gov_dashboard::GovernmentDashboard,
        select_agency::{LoadOutcome, REQUEST_FAILED, SelectAgencyFlow, Submission},
    },
    models::{
        AgencyAction, AgencyDashboardView, DashboardQuery, DepartmentDashboardView,
        GovernmentDashboardView, HomeView, LandingView, MigrantPageView, NotFoundView,
        SelectAgencyForm, SelectAgencyView, SignInRequest, SignInView, SignUpView,
    },
    navigation::{Route, SubjectKind},
    session::Session,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

pub const SIGN_IN_FAILED: &str = "Sign-in failed. Please check your credentials and try again.";

// --- Response Helpers ---

/// Renders a page view model, echoing the session id.
fn page<T: Serialize>(session: &Session, status: StatusCode, view: T) -> Response {
    (status, session_header(session), Json(view)).into_response()
}

fn redirect(session: &Session, to: &str) -> Response {
    (session_header(session), Redirect::to(to)).into_response()
}

fn not_found_page(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundView {
            path: path.to_string(),
        }),
    )
        .into_response()
}

/// Sends the subject back to the sign-in page of `kind`, remembering `from`.
async fn send_to_sign_in(
    state: &AppState,
    mut session: Session,
    kind: SubjectKind,
    from: Route,
) -> Result<Response, PortalError> {
    session.set_return_to(from.path());
    state.sessions.save(&session).await?;
    Ok(redirect(&session, Route::SignIn(kind).path()))
}

/// Drops government credentials the API has rejected and asks for sign-in again.
async fn expire_government(state: &AppState, mut session: Session) -> Result<Response, PortalError> {
    tracing::info!(session = %session.id(), "government token rejected; signing out");
    session.sign_out(SubjectKind::Government);
    send_to_sign_in(state, session, SubjectKind::Government, Route::GovernmentDashboard).await
}

// --- Public Pages ---

/// landing
///
/// [Public Route] Entry page listing the sign-in points for every subject kind.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Landing page", body = LandingView))
)]
pub async fn landing(CurrentSession(session): CurrentSession) -> Response {
    let view = LandingView {
        title: "Migrant Verification Portal".to_string(),
        sign_in: SubjectKind::ALL
            .into_iter()
            .map(|kind| Route::SignIn(kind).path().to_string())
            .collect(),
        signed_in: session.signed_in(),
    };
    page(&session, StatusCode::OK, view)
}

/// home
///
/// [Public Route] General home page. Shows (and consumes) the notice left by
/// the previous navigation.
#[utoipa::path(
    get,
    path = "/home",
    responses((status = 200, description = "Home page", body = HomeView))
)]
pub async fn home(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
) -> Result<Response, PortalError> {
    let notice = session.take_notice();
    if notice.is_some() {
        state.sessions.save(&session).await?;
    }

    let view = HomeView {
        notice,
        profile: session.migrant_profile(),
    };
    Ok(page(&session, StatusCode::OK, view))
}

/// sign_in_page
///
/// [Public Route] Sign-in page for one subject kind.
#[utoipa::path(
    get,
    path = "/signin/{role}",
    params(("role" = String, Path, description = "migrant | agency | department | government")),
    responses(
        (status = 200, description = "Sign-in page", body = SignInView),
        (status = 404, description = "Unknown role", body = NotFoundView)
    )
)]
pub async fn sign_in_page(
    CurrentSession(session): CurrentSession,
    Path(role): Path<String>,
    uri: Uri,
) -> Response {
    let Some(kind) = SubjectKind::from_slug(&role) else {
        return not_found_page(uri.path());
    };

    let view = SignInView {
        role: kind,
        return_to: session.return_to().map(str::to_string),
        error: None,
    };
    page(&session, StatusCode::OK, view)
}

/// sign_in
///
/// [Public Route] Records credentials already issued by the auth service.
///
/// *Migrant*: the token is used to fetch the profile, which is cached alongside it.
/// *Department*: `departmentName` is mandatory.
/// On success the subject is sent to the preserved destination (when it belongs
/// to this kind) or to the kind's landing page.
#[utoipa::path(
    post,
    path = "/signin/{role}",
    params(("role" = String, Path, description = "migrant | agency | department | government")),
    request_body = SignInRequest,
    responses(
        (status = 303, description = "Signed in; redirected"),
        (status = 400, description = "Missing credentials", body = SignInView),
        (status = 401, description = "Credentials rejected", body = SignInView)
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Path(role): Path<String>,
    uri: Uri,
    Json(payload): Json<SignInRequest>,
) -> Result<Response, PortalError> {
    let Some(kind) = SubjectKind::from_slug(&role) else {
        return Ok(not_found_page(uri.path()));
    };

    let failed = |session: &Session, status: StatusCode, message: &str| {
        let view = SignInView {
            role: kind,
            return_to: session.return_to().map(str::to_string),
            error: Some(message.to_string()),
        };
        page(session, status, view)
    };

    let token = payload.token.trim();
    if token.is_empty() {
        return Ok(failed(&session, StatusCode::BAD_REQUEST, "A sign-in token is required."));
    }

    match kind {
        SubjectKind::Migrant => match state.api.current_user(token).await {
            Ok(profile) => session.sign_in_migrant(token, &profile)?,
            Err(e) => {
                tracing::warn!(error = %e, "migrant sign-in rejected");
                return Ok(failed(&session, StatusCode::UNAUTHORIZED, SIGN_IN_FAILED));
            }
        },
        SubjectKind::Department => {
            let name = payload
                .department_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty());
            let Some(name) = name else {
                return Ok(failed(&session, StatusCode::BAD_REQUEST, "Department name is required."));
            };
            session.sign_in_department(token, name);
        }
        SubjectKind::Government => session.sign_in_government(token),
        SubjectKind::Agency => session.sign_in_agency(token),
    }

    let target = session
        .take_return_to()
        .map(|path| Route::from_path(&path))
        .filter(|route| kind.may_return_to(*route))
        .unwrap_or_else(|| kind.landing());

    state.sessions.save(&session).await?;
    tracing::info!(session = %session.id(), role = kind.slug(), to = target.path(), "signed in");

    Ok(redirect(&session, target.path()))
}

/// sign_out
///
/// [Public Route] Clears one subject kind's credentials and returns to its sign-in page.
#[utoipa::path(
    post,
    path = "/signout/{role}",
    params(("role" = String, Path, description = "migrant | agency | department | government")),
    responses((status = 303, description = "Signed out; redirected to sign-in"))
)]
pub async fn sign_out(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Path(role): Path<String>,
    uri: Uri,
) -> Result<Response, PortalError> {
    let Some(kind) = SubjectKind::from_slug(&role) else {
        return Ok(not_found_page(uri.path()));
    };

    session.sign_out(kind);
    state.sessions.save(&session).await?;
    tracing::info!(session = %session.id(), role = kind.slug(), "signed out");

    Ok(redirect(&session, Route::SignIn(kind).path()))
}

/// sign_up_page
///
/// [Public Route] Registration page. Registration itself is handled by the auth service.
#[utoipa::path(
    get,
    path = "/signup/{role}",
    params(("role" = String, Path, description = "migrant | agency | department")),
    responses(
        (status = 200, description = "Sign-up page", body = SignUpView),
        (status = 404, description = "No sign-up for this role", body = NotFoundView)
    )
)]
pub async fn sign_up_page(
    CurrentSession(session): CurrentSession,
    Path(role): Path<String>,
    uri: Uri,
) -> Response {
    match SubjectKind::from_slug(&role).filter(|kind| kind.can_sign_up()) {
        Some(kind) => page(&session, StatusCode::OK, SignUpView { role: kind }),
        None => not_found_page(uri.path()),
    }
}

#[utoipa::path(
    get,
    path = "/agency-dashboard",
    responses((status = 200, description = "Agency dashboard", body = AgencyDashboardView))
)]
pub async fn agency_dashboard(CurrentSession(session): CurrentSession) -> Response {
    let view = AgencyDashboardView {
        title: "Agency Verification Portal".to_string(),
        subtitle: "Manage migrant verification requests".to_string(),
        signed_in: session.agency_token().is_some(),
    };
    page(&session, StatusCode::OK, view)
}

/// not_found
///
/// Catch-all for paths outside the route table.
pub async fn not_found(uri: Uri) -> Response {
    not_found_page(uri.path())
}

// --- Migrant Pages (behind the migrant guard) ---

/// select_agency_page
///
/// [Migrant Route] Lists verification agencies. The profile fetch refreshes the
/// cached snapshot; a failed agency fetch renders with a retryable error.
#[utoipa::path(
    get,
    path = "/select-agency",
    responses(
        (status = 200, description = "Agency list", body = SelectAgencyView),
        (status = 303, description = "Redirected by the access guard or to sign-in")
    )
)]
pub async fn select_agency_page(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
) -> Result<Response, PortalError> {
    let mut flow = SelectAgencyFlow::new();

    if flow.load(state.api.as_ref(), session.migrant_token()).await == LoadOutcome::SignIn {
        return send_to_sign_in(&state, session, SubjectKind::Migrant, Route::SelectAgency).await;
    }

    if let Some(profile) = flow.profile() {
        session.refresh_profile(profile)?;
        state.sessions.save(&session).await?;
    }

    Ok(page(&session, StatusCode::OK, flow.view()))
}

/// select_agency_submit
///
/// [Migrant Route] Confirms the chosen agency and files the verification request.
/// Success redirects home with a confirmation notice; failure re-renders the
/// page with a retryable error.
#[utoipa::path(
    post,
    path = "/select-agency",
    request_body = SelectAgencyForm,
    responses(
        (status = 303, description = "Request sent; redirected home"),
        (status = 200, description = "Request failed", body = SelectAgencyView)
    )
)]
pub async fn select_agency_submit(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Json(form): Json<SelectAgencyForm>,
) -> Result<Response, PortalError> {
    let mut flow = SelectAgencyFlow::new();

    if flow.load(state.api.as_ref(), session.migrant_token()).await == LoadOutcome::SignIn {
        return send_to_sign_in(&state, session, SubjectKind::Migrant, Route::SelectAgency).await;
    }

    if !flow.select(&form.agency_id) {
        tracing::warn!(agency = %form.agency_id, "selected agency is not in the list");
        flow.fail(REQUEST_FAILED);
        return Ok(page(&session, StatusCode::OK, flow.view()));
    }

    let user_id = session.user_id().map(str::to_string);
    match flow.confirm(state.api.as_ref(), user_id.as_deref()).await {
        Submission::Sent { to, notice } => {
            session.push_notice(&notice);
            state.sessions.save(&session).await?;
            Ok(redirect(&session, to.path()))
        }
        Submission::Failed | Submission::NothingSelected => {
            Ok(page(&session, StatusCode::OK, flow.view()))
        }
    }
}

fn migrant_page(session: &Session, route: Route) -> Response {
    let view = MigrantPageView {
        page: route.path().trim_start_matches('/').to_string(),
        profile: session.migrant_profile(),
    };
    page(session, StatusCode::OK, view)
}

/// verify_page
///
/// [Migrant Route] Verification intake, reachable only before migrant status is confirmed.
#[utoipa::path(
    get,
    path = "/verify",
    responses((status = 200, description = "Verification intake", body = MigrantPageView))
)]
pub async fn verify_page(CurrentSession(session): CurrentSession) -> Response {
    migrant_page(&session, Route::Verify)
}

#[utoipa::path(
    get,
    path = "/submit-complaint",
    responses((status = 200, description = "Complaint form", body = MigrantPageView))
)]
pub async fn submit_complaint_page(CurrentSession(session): CurrentSession) -> Response {
    migrant_page(&session, Route::SubmitComplaint)
}

#[utoipa::path(
    get,
    path = "/user-complaints",
    responses((status = 200, description = "Filed complaints", body = MigrantPageView))
)]
pub async fn user_complaints_page(CurrentSession(session): CurrentSession) -> Response {
    migrant_page(&session, Route::UserComplaints)
}

// --- Department & Government Dashboards ---

#[utoipa::path(
    get,
    path = "/department-dashboard",
    responses(
        (status = 200, description = "Department dashboard", body = DepartmentDashboardView),
        (status = 303, description = "Redirected to department sign-in")
    )
)]
pub async fn department_dashboard(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, PortalError> {
    match session.department() {
        Some(identity) => {
            let view = DepartmentDashboardView {
                department_name: identity.department_name,
            };
            Ok(page(&session, StatusCode::OK, view))
        }
        None => {
            send_to_sign_in(&state, session, SubjectKind::Department, Route::DepartmentDashboard)
                .await
        }
    }
}

/// government_dashboard
///
/// [Government Route] Aggregate counts plus the filtered agency list, both
/// derived from one roster fetch.
#[utoipa::path(
    get,
    path = "/government-dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard", body = GovernmentDashboardView),
        (status = 303, description = "Redirected to government sign-in")
    )
)]
pub async fn government_dashboard(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, PortalError> {
    let Some(token) = session.government_token().map(str::to_string) else {
        return send_to_sign_in(&state, session, SubjectKind::Government, Route::GovernmentDashboard)
            .await;
    };

    let mut dashboard = GovernmentDashboard::new(query.into());
    if let Err(e) = dashboard.refresh(state.api.as_ref(), &token).await {
        if e.is_session_failure() {
            return expire_government(&state, session).await;
        }
    }

    Ok(page(&session, StatusCode::OK, dashboard.view()))
}

/// government_agency_action
///
/// [Government Route] Verifies or rejects one agency, then re-renders the
/// dashboard from a fresh roster with the same filter.
#[utoipa::path(
    post,
    path = "/government-dashboard/agencies/{id}/{action}",
    params(
        ("id" = String, Path, description = "Agency ID"),
        ("action" = String, Path, description = "verify | reject"),
        DashboardQuery
    ),
    responses(
        (status = 200, description = "Dashboard after the action", body = GovernmentDashboardView),
        (status = 303, description = "Redirected to government sign-in"),
        (status = 404, description = "Unknown action", body = NotFoundView)
    )
)]
pub async fn government_agency_action(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path((agency_id, action)): Path<(String, String)>,
    Query(query): Query<DashboardQuery>,
    uri: Uri,
) -> Result<Response, PortalError> {
    let Some(action) = AgencyAction::from_slug(&action) else {
        return Ok(not_found_page(uri.path()));
    };
    let Some(token) = session.government_token().map(str::to_string) else {
        return send_to_sign_in(&state, session, SubjectKind::Government, Route::GovernmentDashboard)
            .await;
    };

    let mut dashboard = GovernmentDashboard::new(query.into());
    if let Err(e) = dashboard
        .apply(state.api.as_ref(), &token, &agency_id, action)
        .await
    {
        if e.is_session_failure() {
            return expire_government(&state, session).await;
        }
    }

    Ok(page(&session, StatusCode::OK, dashboard.view()))
}
