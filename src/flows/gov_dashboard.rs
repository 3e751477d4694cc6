use crate::api::PortalApi;
use crate::error::ApiError;
use crate::models::{Agency, AgencyAction, AgencyFilter, AgencyStats, GovernmentDashboardView};

pub const ROSTER_LOAD_FAILED: &str = "Failed to load agencies. Please try again.";

/// GovernmentDashboard
///
/// Holds the single authoritative agency roster. Aggregate counts and the
/// filtered list are both derived from it, so after any refresh they agree.
#[derive(Debug, Clone, Default)]
pub struct GovernmentDashboard {
    roster: Vec<Agency>,
    filter: AgencyFilter,
    load_error: Option<String>,
    action_error: Option<String>,
}

impl GovernmentDashboard {
    pub fn new(filter: AgencyFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Re-fetches the full roster. On failure the previous roster is kept and
    /// an inline error recorded; the error is also returned so the caller can
    /// tell a rejected session apart.
    pub async fn refresh(&mut self, api: &dyn PortalApi, token: &str) -> Result<(), ApiError> {
        match api.government_agencies(token, None).await {
            Ok(roster) => {
                tracing::debug!(agencies = roster.len(), "government roster refreshed");
                self.roster = roster;
                self.load_error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "government roster fetch failed");
                self.load_error = Some(ROSTER_LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Applies `action` to one agency, then re-fetches the roster once.
    ///
    /// The roster is re-fetched after a failed action too, so the page always
    /// shows current state next to the action's error. A rejected token stops
    /// before the fetch.
    pub async fn apply(
        &mut self,
        api: &dyn PortalApi,
        token: &str,
        agency_id: &str,
        action: AgencyAction,
    ) -> Result<(), ApiError> {
        let update = api.update_agency(token, agency_id, action).await;
        match &update {
            Ok(()) => {
                tracing::info!(agency = %agency_id, action = action.as_str(), "agency status updated");
                self.action_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, agency = %agency_id, action = action.as_str(), "agency update failed");
                self.action_error = Some(format!(
                    "Failed to {} agency. Please try again.",
                    action.as_str()
                ));
                if e.is_session_failure() {
                    return update;
                }
            }
        }

        let refreshed = self.refresh(api, token).await;
        update.and(refreshed)
    }

    pub fn set_filter(&mut self, filter: AgencyFilter) {
        self.filter = filter;
    }

    pub fn roster(&self) -> &[Agency] {
        &self.roster
    }

    pub fn stats(&self) -> AgencyStats {
        AgencyStats::from_agencies(&self.roster)
    }

    pub fn visible(&self) -> Vec<Agency> {
        self.roster
            .iter()
            .filter(|agency| self.filter.matches(agency))
            .cloned()
            .collect()
    }

    /// The failed action's message wins over a failed roster load.
    pub fn error(&self) -> Option<&str> {
        self.action_error.as_deref().or(self.load_error.as_deref())
    }

    pub fn view(&self) -> GovernmentDashboardView {
        GovernmentDashboardView {
            stats: self.stats(),
            agencies: self.visible(),
            status: self.filter.status,
            search: self.filter.search.clone(),
            error: self.error().map(str::to_string),
        }
    }
}
