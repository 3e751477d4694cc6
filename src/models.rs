use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::navigation::SubjectKind;

// --- External API Schemas (Mirrored from the verification API) ---

/// AgencySummary
///
/// The agency reference embedded in a migrant's profile once a verification
/// request has been filed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct AgencySummary {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// MigrantProfile
///
/// Snapshot of the subject's server-side profile (GET /api/auth/user).
/// Cached in the session at sign-in and refreshed whenever it is re-fetched;
/// between fetches it may be stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct MigrantProfile {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Set once the intake verification (`/verify`) has confirmed migrant status.
    #[serde(default)]
    pub is_migrant: bool,
    /// Set once the chosen agency has completed its verification.
    #[serde(default)]
    pub agency_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<AgencySummary>,
}

/// Agency
///
/// A verification agency as listed by both the agency and government endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Agency {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_verification_time: Option<String>,
}

/// GovernmentAgencies
///
/// Envelope returned by GET /api/government/agencies.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GovernmentAgencies {
    #[serde(default)]
    pub agencies: Vec<Agency>,
}

/// VerificationRequest
///
/// Body of POST /api/agency/request-verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub user_id: String,
    pub agency_id: String,
}

/// AgencyAction
///
/// The two status mutations a government officer can apply to an agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AgencyAction {
    Verify,
    Reject,
}

impl AgencyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AgencyAction::Verify => "verify",
            AgencyAction::Reject => "reject",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "verify" => Some(AgencyAction::Verify),
            "reject" => Some(AgencyAction::Reject),
            _ => None,
        }
    }
}

/// Body of PUT /api/government/agencies/:id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencyActionRequest {
    pub action: AgencyAction,
}

// --- Dashboard Filtering & Aggregates ---

/// StatusFilter
///
/// Which agencies the government dashboard lists. Pending agencies are shown by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    Verified,
    #[default]
    Unverified,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Verified => "verified",
            StatusFilter::Unverified => "unverified",
        }
    }

    pub fn matches(self, agency: &Agency) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Verified => agency.is_verified,
            StatusFilter::Unverified => !agency.is_verified,
        }
    }
}

/// AgencyFilter
///
/// Status plus free-text search. The search term is matched case-insensitively
/// against name, email, department and location; an empty term matches everything.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgencyFilter {
    pub status: StatusFilter,
    pub search: String,
}

impl AgencyFilter {
    pub fn new(status: StatusFilter, search: impl Into<String>) -> Self {
        Self {
            status,
            search: search.into(),
        }
    }

    pub fn matches(&self, agency: &Agency) -> bool {
        if !self.status.matches(agency) {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            Some(agency.name.as_str()),
            agency.email.as_deref(),
            agency.department.as_deref(),
            agency.location.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// DashboardQuery
///
/// Query parameters accepted by the government dashboard routes.
#[derive(Debug, Clone, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// One of `all`, `verified`, `unverified` (default).
    pub status: Option<StatusFilter>,
    /// Case-insensitive search over name, email, department and location.
    pub search: Option<String>,
}

impl From<DashboardQuery> for AgencyFilter {
    fn from(query: DashboardQuery) -> Self {
        AgencyFilter::new(query.status.unwrap_or_default(), query.search.unwrap_or_default())
    }
}

/// AgencyStats
///
/// Aggregate counts shown on the government dashboard. Always derived from the
/// same roster the dashboard lists, so the two never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
pub struct AgencyStats {
    pub total: usize,
    pub verified: usize,
    pub pending: usize,
}

impl AgencyStats {
    pub fn from_agencies(agencies: &[Agency]) -> Self {
        let verified = agencies.iter().filter(|a| a.is_verified).count();
        Self {
            total: agencies.len(),
            verified,
            pending: agencies.len() - verified,
        }
    }
}

// --- Request Payloads (Portal Surface) ---

/// SignInRequest
///
/// Credentials already issued by the external auth service. `departmentName`
/// is only read for department sign-in, where it is mandatory.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub token: String,
    #[serde(default)]
    pub department_name: Option<String>,
}

/// SelectAgencyForm
///
/// Confirmation of the agency chosen in the selection dialog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectAgencyForm {
    pub agency_id: String,
}

// --- Page View Models (Output Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LandingView {
    pub title: String,
    /// Sign-in entry points, one per subject kind.
    pub sign_in: Vec<String>,
    /// Subject kinds this browser currently holds credentials for.
    pub signed_in: Vec<SubjectKind>,
}

/// HomeView
///
/// `notice` carries the one-shot message left by the previous navigation
/// (request confirmation, "already verified" notice).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub notice: Option<String>,
    pub profile: Option<MigrantProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInView {
    pub role: SubjectKind,
    pub return_to: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpView {
    pub role: SubjectKind,
}

/// SelectAgencyView
///
/// `error` is retryable: reloading the page (or resubmitting) repeats the failed call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectAgencyView {
    pub profile: Option<MigrantProfile>,
    pub agencies: Vec<Agency>,
    pub error: Option<String>,
    /// The agency awaiting confirmation, while the dialog is open.
    pub confirming: Option<Agency>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrantPageView {
    pub page: String,
    pub profile: Option<MigrantProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDashboardView {
    pub department_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GovernmentDashboardView {
    pub stats: AgencyStats,
    pub agencies: Vec<Agency>,
    pub status: StatusFilter,
    pub search: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgencyDashboardView {
    pub title: String,
    pub subtitle: String,
    pub signed_in: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundView {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
}
