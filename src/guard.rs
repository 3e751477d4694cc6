//! Access guards.
//!
//! Pure decisions over a [`Session`] snapshot and a requested path. The guard
//! middleware in `auth` consults [`decide`] before any guarded page runs.

use crate::navigation::{Access, MigrantTier, Route, SubjectKind};
use crate::session::Session;

pub const ALREADY_VERIFIED_NOTICE: &str = "You are already verified as a migrant";

/// Redirect
///
/// Where to send the subject instead. `from` is the originally requested path,
/// kept so that sign-in can return there; `notice` is a message for the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: Route,
    pub from: Option<String>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Redirect),
}

impl Decision {
    fn to(route: Route) -> Self {
        Decision::Redirect(Redirect {
            to: route,
            from: None,
            notice: None,
        })
    }

    fn sign_in(kind: SubjectKind, from: &str) -> Self {
        Decision::Redirect(Redirect {
            to: Route::SignIn(kind),
            from: Some(from.to_string()),
            notice: None,
        })
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// The redirect target, if any.
    pub fn target(&self) -> Option<Route> {
        match self {
            Decision::Allow => None,
            Decision::Redirect(redirect) => Some(redirect.to),
        }
    }
}

pub trait AccessGuard: Send + Sync {
    fn check(&self, session: &Session, path: &str) -> Decision;
}

/// MigrantGuard
///
/// Gates the migrant pages on sign-in, migrant status and agency verification.
pub struct MigrantGuard;

impl AccessGuard for MigrantGuard {
    fn check(&self, session: &Session, path: &str) -> Decision {
        let route = Route::from_path(path);
        if route.is_public() {
            return Decision::Allow;
        }

        let Some(identity) = session.migrant() else {
            return Decision::sign_in(SubjectKind::Migrant, path);
        };

        let tier = match route.access() {
            Access::Migrant(tier) => Some(tier),
            _ => None,
        };

        if !identity.profile.is_migrant {
            // Unconfirmed subjects may only reach the intake page.
            return match tier {
                Some(MigrantTier::Intake) => Decision::Allow,
                _ => Decision::to(Route::Home),
            };
        }

        match tier {
            Some(MigrantTier::Intake) => Decision::Redirect(Redirect {
                to: Route::Home,
                from: None,
                notice: Some(ALREADY_VERIFIED_NOTICE.to_string()),
            }),
            Some(MigrantTier::FullyProtected) if !identity.profile.agency_verified => {
                Decision::to(Route::SelectAgency)
            }
            _ => Decision::Allow,
        }
    }
}

/// DepartmentGuard
///
/// Admits only when both the department token and the department name are held.
pub struct DepartmentGuard;

impl AccessGuard for DepartmentGuard {
    fn check(&self, session: &Session, path: &str) -> Decision {
        if Route::from_path(path).is_public() || session.department().is_some() {
            Decision::Allow
        } else {
            Decision::sign_in(SubjectKind::Department, path)
        }
    }
}

pub struct GovernmentGuard;

impl AccessGuard for GovernmentGuard {
    fn check(&self, session: &Session, path: &str) -> Decision {
        if Route::from_path(path).is_public() || session.government_token().is_some() {
            Decision::Allow
        } else {
            Decision::sign_in(SubjectKind::Government, path)
        }
    }
}

/// The guard responsible for a given access requirement; public routes have none.
pub fn guard_for(access: Access) -> Option<&'static dyn AccessGuard> {
    match access {
        Access::Public => None,
        Access::Migrant(_) => Some(&MigrantGuard),
        Access::Department => Some(&DepartmentGuard),
        Access::Government => Some(&GovernmentGuard),
    }
}

/// Decides whether `path` may be rendered for `session`.
pub fn decide(session: &Session, path: &str) -> Decision {
    match guard_for(Route::from_path(path).access()) {
        Some(guard) => guard.check(session, path),
        None => Decision::Allow,
    }
}
