use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// SubjectKind
///
/// The kinds of actor that can sign in to the portal. Each kind has its own
/// sign-in page and its own credentials in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Migrant,
    Agency,
    Department,
    Government,
}

impl SubjectKind {
    pub const ALL: [SubjectKind; 4] = [
        SubjectKind::Migrant,
        SubjectKind::Agency,
        SubjectKind::Department,
        SubjectKind::Government,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            SubjectKind::Migrant => "migrant",
            SubjectKind::Agency => "agency",
            SubjectKind::Department => "department",
            SubjectKind::Government => "government",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Where a subject of this kind lands after signing in, absent a preserved destination.
    pub fn landing(self) -> Route {
        match self {
            SubjectKind::Migrant => Route::Home,
            SubjectKind::Agency => Route::AgencyDashboard,
            SubjectKind::Department => Route::DepartmentDashboard,
            SubjectKind::Government => Route::GovernmentDashboard,
        }
    }

    /// Government accounts are provisioned out of band and have no sign-up page.
    pub fn can_sign_up(self) -> bool {
        self != SubjectKind::Government
    }

    /// Whether a destination preserved before sign-in makes sense for this kind.
    pub fn may_return_to(self, route: Route) -> bool {
        match route.access() {
            Access::Public => route != Route::NotFound && !matches!(route, Route::SignIn(_)),
            Access::Migrant(_) => self == SubjectKind::Migrant,
            Access::Department => self == SubjectKind::Department,
            Access::Government => self == SubjectKind::Government,
        }
    }
}

/// MigrantTier
///
/// How far through verification a migrant must be to open a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrantTier {
    /// The verification intake page, meant for subjects not yet confirmed as migrants.
    Intake,
    /// Pages for confirmed migrants still waiting on agency verification.
    MigrantOnly,
    /// Pages that require completed agency verification.
    FullyProtected,
}

/// Access
///
/// The requirement a route places on the session before it may be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Migrant(MigrantTier),
    Department,
    Government,
}

/// Route
///
/// The portal's route table. Every path the portal answers maps to exactly one
/// variant; anything else is `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Home,
    SelectAgency,
    Verify,
    SubmitComplaint,
    UserComplaints,
    SignIn(SubjectKind),
    SignUp(SubjectKind),
    AgencyDashboard,
    DepartmentDashboard,
    GovernmentDashboard,
    NotFound,
}

impl Route {
    /// Every addressable route, in the order the composition root declares them.
    pub const ALL: [Route; 17] = [
        Route::Landing,
        Route::Home,
        Route::SelectAgency,
        Route::Verify,
        Route::SubmitComplaint,
        Route::UserComplaints,
        Route::SignIn(SubjectKind::Migrant),
        Route::SignIn(SubjectKind::Agency),
        Route::SignIn(SubjectKind::Department),
        Route::SignIn(SubjectKind::Government),
        Route::SignUp(SubjectKind::Migrant),
        Route::SignUp(SubjectKind::Agency),
        Route::SignUp(SubjectKind::Department),
        Route::AgencyDashboard,
        Route::DepartmentDashboard,
        Route::GovernmentDashboard,
        Route::NotFound,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Home => "/home",
            Route::SelectAgency => "/select-agency",
            Route::Verify => "/verify",
            Route::SubmitComplaint => "/submit-complaint",
            Route::UserComplaints => "/user-complaints",
            Route::SignIn(SubjectKind::Migrant) => "/signin/migrant",
            Route::SignIn(SubjectKind::Agency) => "/signin/agency",
            Route::SignIn(SubjectKind::Department) => "/signin/department",
            Route::SignIn(SubjectKind::Government) => "/signin/government",
            Route::SignUp(SubjectKind::Migrant) => "/signup/migrant",
            Route::SignUp(SubjectKind::Agency) => "/signup/agency",
            Route::SignUp(SubjectKind::Department) => "/signup/department",
            // No government sign-up page exists; send them to sign-in instead.
            Route::SignUp(SubjectKind::Government) => "/signin/government",
            Route::AgencyDashboard => "/agency-dashboard",
            Route::DepartmentDashboard => "/department-dashboard",
            Route::GovernmentDashboard => "/government-dashboard",
            Route::NotFound => "/404",
        }
    }

    /// Resolves a request path to the route that owns it.
    ///
    /// Trailing slashes are ignored. Government dashboard actions
    /// (`/government-dashboard/agencies/{id}/verify`) belong to the dashboard
    /// route so that they share its guard.
    pub fn from_path(path: &str) -> Route {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Landing,
            ["home"] => Route::Home,
            ["select-agency"] => Route::SelectAgency,
            ["verify"] => Route::Verify,
            ["submit-complaint"] => Route::SubmitComplaint,
            ["user-complaints"] => Route::UserComplaints,
            ["signin", role] => SubjectKind::from_slug(role)
                .map(Route::SignIn)
                .unwrap_or(Route::NotFound),
            ["signup", role] => SubjectKind::from_slug(role)
                .filter(|kind| kind.can_sign_up())
                .map(Route::SignUp)
                .unwrap_or(Route::NotFound),
            ["agency-dashboard"] => Route::AgencyDashboard,
            ["department-dashboard"] => Route::DepartmentDashboard,
            ["government-dashboard", ..] => Route::GovernmentDashboard,
            _ => Route::NotFound,
        }
    }

    pub fn access(self) -> Access {
        match self {
            Route::Verify => Access::Migrant(MigrantTier::Intake),
            Route::SelectAgency => Access::Migrant(MigrantTier::MigrantOnly),
            Route::SubmitComplaint | Route::UserComplaints => {
                Access::Migrant(MigrantTier::FullyProtected)
            }
            Route::DepartmentDashboard => Access::Department,
            Route::GovernmentDashboard => Access::Government,
            Route::Landing
            | Route::Home
            | Route::SignIn(_)
            | Route::SignUp(_)
            | Route::AgencyDashboard
            | Route::NotFound => Access::Public,
        }
    }

    pub fn is_public(self) -> bool {
        self.access() == Access::Public
    }
}
