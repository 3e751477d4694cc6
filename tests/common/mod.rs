#![allow(dead_code)]

use async_trait::async_trait;
use migrant_portal::{
    AppState,
    api::{ApiState, PortalApi},
    error::ApiError,
    models::{Agency, AgencyAction, AgencyFilter, MigrantProfile, VerificationRequest},
    session::{MemorySessionStore, Session, SessionState, SessionStore},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use uuid::Uuid;

// --- Mock Verification API ---

/// In-memory stand-in for the external API. Each knob switches one call to
/// failure; the government roster is mutable so actions can be observed.
#[derive(Default)]
pub struct MockPortalApi {
    /// Returned by `current_user`; `None` means the token is rejected.
    pub profile: Option<MigrantProfile>,
    pub agencies: Vec<Agency>,
    pub fail_agency_list: bool,
    pub fail_request: bool,
    pub roster: Mutex<Vec<Agency>>,
    pub reject_government_token: bool,
    pub fail_update: bool,

    pub requests: Mutex<Vec<VerificationRequest>>,
    pub roster_fetches: AtomicUsize,
}

impl MockPortalApi {
    pub fn with_roster(roster: Vec<Agency>) -> Self {
        Self {
            roster: Mutex::new(roster),
            ..Self::default()
        }
    }

    pub fn sent_requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.roster_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortalApi for MockPortalApi {
    async fn current_user(&self, _token: &str) -> Result<MigrantProfile, ApiError> {
        self.profile.clone().ok_or(ApiError::Unauthorized)
    }

    async fn verification_agencies(&self) -> Result<Vec<Agency>, ApiError> {
        if self.fail_agency_list {
            return Err(ApiError::Status(500));
        }
        Ok(self.agencies.clone())
    }

    async fn request_verification(&self, request: &VerificationRequest) -> Result<(), ApiError> {
        if self.fail_request {
            return Err(ApiError::Status(500));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn government_agencies(
        &self,
        _token: &str,
        filter: Option<&AgencyFilter>,
    ) -> Result<Vec<Agency>, ApiError> {
        if self.reject_government_token {
            return Err(ApiError::Unauthorized);
        }
        self.roster_fetches.fetch_add(1, Ordering::SeqCst);
        let roster = self.roster.lock().unwrap().clone();
        Ok(match filter {
            Some(filter) => roster.into_iter().filter(|a| filter.matches(a)).collect(),
            None => roster,
        })
    }

    async fn update_agency(
        &self,
        _token: &str,
        agency_id: &str,
        action: AgencyAction,
    ) -> Result<(), ApiError> {
        if self.reject_government_token {
            return Err(ApiError::Unauthorized);
        }
        if self.fail_update {
            return Err(ApiError::Status(500));
        }
        let mut roster = self.roster.lock().unwrap();
        let agency = roster
            .iter_mut()
            .find(|a| a.id == agency_id)
            .ok_or(ApiError::Status(404))?;
        agency.is_verified = action == AgencyAction::Verify;
        Ok(())
    }
}

// --- Fixtures ---

pub fn agency(id: &str, name: &str, verified: bool) -> Agency {
    Agency {
        id: id.to_string(),
        name: name.to_string(),
        is_verified: verified,
        ..Default::default()
    }
}

pub fn profile(is_migrant: bool, agency_verified: bool) -> MigrantProfile {
    MigrantProfile {
        id: "user-1".to_string(),
        name: Some("Asha".to_string()),
        is_migrant,
        agency_verified,
        ..Default::default()
    }
}

pub fn migrant_session(is_migrant: bool, agency_verified: bool) -> Session {
    let mut session = Session::new(Uuid::new_v4());
    session
        .sign_in_migrant("migrant-token", &profile(is_migrant, agency_verified))
        .unwrap();
    session
}

pub struct TestPortal {
    pub state: AppState,
    pub store: Arc<MemorySessionStore>,
}

impl TestPortal {
    pub fn new(api: MockPortalApi) -> Self {
        Self::with_api(Arc::new(api))
    }

    pub fn with_api(api: Arc<MockPortalApi>) -> Self {
        Self::with_store(api, Arc::new(MemorySessionStore::new()))
    }

    pub fn with_store(api: Arc<MockPortalApi>, store: Arc<MemorySessionStore>) -> Self {
        let state = AppState {
            api: api as ApiState,
            sessions: store.clone() as SessionState,
        };
        Self { state, store }
    }

    /// Stores `session` and returns its id for the `x-session-id` header.
    pub async fn seed(&self, session: &Session) -> String {
        self.store.save(session).await.unwrap();
        session.id().to_string()
    }

    pub async fn session(&self, id: &str) -> Option<Session> {
        self.store
            .load(Uuid::parse_str(id).unwrap())
            .await
            .unwrap()
    }
}
