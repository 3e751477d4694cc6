use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderName, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::{
    error::PortalError,
    guard::{self, Decision},
    session::{Session, SessionState},
};

/// Header carrying the browser's session id. Every portal response echoes it.
pub const SESSION_HEADER: &str = "x-session-id";

/// CurrentSession Extractor Result
///
/// The requesting browser's session area, loaded from the session store.
/// A request without a (valid) session id gets a fresh, empty session whose id
/// is handed back on the response.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

/// CurrentSession Extractor Implementation
///
/// Resolution order:
/// 1. A session already attached to the request by the guard middleware.
/// 2. The session stored under the `x-session-id` header.
/// 3. A new empty session (under the requested id if it parses, else a new one).
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(CurrentSession(session.clone()));
        }

        let store = SessionState::from_ref(state);

        let requested = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());

        let session = match requested {
            Some(id) => store.load(id).await?.unwrap_or_else(|| Session::new(id)),
            None => Session::new(Uuid::new_v4()),
        };

        Ok(CurrentSession(session))
    }
}

/// The response header that tells the browser which session it holds.
pub fn session_header(session: &Session) -> [(HeaderName, String); 1] {
    [(HeaderName::from_static(SESSION_HEADER), session.id().to_string())]
}

/// guard_middleware
///
/// Runs the access guard for the requested path before the page handler.
///
/// *Allow*: the loaded session is attached to the request so the handler's
/// `CurrentSession` extractor reuses it.
/// *Redirect*: the origin (for sign-in redirects) and any notice are written to
/// the session, which is saved, and a `303 See Other` is returned.
pub async fn guard_middleware(
    State(sessions): State<SessionState>,
    CurrentSession(mut session): CurrentSession,
    mut request: Request,
    next: Next,
) -> Result<Response, PortalError> {
    let path = request.uri().path().to_string();

    match guard::decide(&session, &path) {
        Decision::Allow => {
            request.extensions_mut().insert(session);
            Ok(next.run(request).await)
        }
        Decision::Redirect(redirect) => {
            tracing::info!(
                session = %session.id(),
                path = %path,
                to = redirect.to.path(),
                "navigation redirected by access guard"
            );

            if let Some(from) = &redirect.from {
                session.set_return_to(from);
            }
            if let Some(notice) = &redirect.notice {
                session.push_notice(notice);
            }
            sessions.save(&session).await?;

            Ok((session_header(&session), Redirect::to(redirect.to.path())).into_response())
        }
    }
}
