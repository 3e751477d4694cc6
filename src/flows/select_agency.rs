use crate::api::PortalApi;
use crate::models::{Agency, MigrantProfile, SelectAgencyView, VerificationRequest};
use crate::navigation::Route;

pub const AGENCIES_LOAD_FAILED: &str = "Failed to load agencies. Please try again.";
pub const REQUEST_FAILED: &str = "Failed to send request. Please try again.";

/// Outcome of loading the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The profile is available; the agency list may still have failed (see `error`).
    Ready,
    /// No usable credentials: the subject must sign in again.
    SignIn,
}

/// Outcome of confirming the selected agency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The request was filed; navigate to `to` and show `notice` there.
    Sent { to: Route, notice: String },
    /// The request failed; the dialog stays open with an inline error.
    Failed,
    /// Confirm was pressed with no agency selected.
    NothingSelected,
}

/// SelectAgencyFlow
///
/// State of the agency selection page: the subject's profile, the agency
/// list, the confirmation dialog, and the latest inline error.
#[derive(Debug, Clone, Default)]
pub struct SelectAgencyFlow {
    profile: Option<MigrantProfile>,
    agencies: Vec<Agency>,
    error: Option<String>,
    selected: Option<Agency>,
    confirm_open: bool,
}

impl SelectAgencyFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the profile and the agency list concurrently.
    ///
    /// A missing token or a failed profile fetch asks for sign-in. A failed
    /// agency fetch leaves an inline error and an empty list.
    pub async fn load(&mut self, api: &dyn PortalApi, token: Option<&str>) -> LoadOutcome {
        let Some(token) = token else {
            return LoadOutcome::SignIn;
        };

        let (profile, agencies) =
            tokio::join!(api.current_user(token), api.verification_agencies());

        match agencies {
            Ok(agencies) => self.agencies = agencies,
            Err(e) => {
                tracing::warn!(error = %e, "agency list fetch failed");
                self.agencies.clear();
                self.error = Some(AGENCIES_LOAD_FAILED.to_string());
            }
        }

        match profile {
            Ok(profile) => {
                self.profile = Some(profile);
                LoadOutcome::Ready
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed");
                LoadOutcome::SignIn
            }
        }
    }

    /// Opens the confirmation dialog for `agency_id`. Unknown ids are ignored.
    pub fn select(&mut self, agency_id: &str) -> bool {
        match self.agencies.iter().find(|a| a.id == agency_id) {
            Some(agency) => {
                self.selected = Some(agency.clone());
                self.confirm_open = true;
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self) {
        self.confirm_open = false;
    }

    /// Files the verification request for the selected agency.
    pub async fn confirm(&mut self, api: &dyn PortalApi, user_id: Option<&str>) -> Submission {
        let Some(agency) = self.selected.clone().filter(|_| self.confirm_open) else {
            return Submission::NothingSelected;
        };

        let Some(user_id) = user_id else {
            tracing::warn!(agency = %agency.id, "verification request without a user id");
            self.error = Some(REQUEST_FAILED.to_string());
            return Submission::Failed;
        };

        let request = VerificationRequest {
            user_id: user_id.to_string(),
            agency_id: agency.id.clone(),
        };

        match api.request_verification(&request).await {
            Ok(()) => {
                tracing::info!(user = %user_id, agency = %agency.id, "verification request sent");
                self.confirm_open = false;
                self.error = None;
                Submission::Sent {
                    to: Route::Home,
                    notice: format!("Verification request sent to {}!", agency.name),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, agency = %agency.id, "verification request failed");
                self.error = Some(REQUEST_FAILED.to_string());
                Submission::Failed
            }
        }
    }

    /// Records a failure that happened outside the flow's own calls.
    pub fn fail(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    pub fn profile(&self) -> Option<&MigrantProfile> {
        self.profile.as_ref()
    }

    pub fn agencies(&self) -> &[Agency] {
        &self.agencies
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_confirm_open(&self) -> bool {
        self.confirm_open
    }

    pub fn view(&self) -> SelectAgencyView {
        SelectAgencyView {
            profile: self.profile.clone(),
            agencies: self.agencies.clone(),
            error: self.error.clone(),
            confirming: self.selected.clone().filter(|_| self.confirm_open),
        }
    }
}
