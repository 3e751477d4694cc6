use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::models::{
    Agency, AgencyAction, AgencyActionRequest, AgencyFilter, GovernmentAgencies, MigrantProfile,
    VerificationRequest,
};

/// PortalApi Trait
///
/// Every call the portal makes to the external verification API. Handlers and
/// flows depend on this contract only, so tests can swap in a mock without a
/// network.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// GET /api/auth/user (bearer token).
    async fn current_user(&self, token: &str) -> Result<MigrantProfile, ApiError>;

    /// GET /api/agency/agencies (unauthenticated).
    async fn verification_agencies(&self) -> Result<Vec<Agency>, ApiError>;

    /// POST /api/agency/request-verification.
    async fn request_verification(&self, request: &VerificationRequest) -> Result<(), ApiError>;

    /// GET /api/government/agencies, optionally filtered server-side.
    async fn government_agencies(
        &self,
        token: &str,
        filter: Option<&AgencyFilter>,
    ) -> Result<Vec<Agency>, ApiError>;

    /// PUT /api/government/agencies/:id.
    async fn update_agency(
        &self,
        token: &str,
        agency_id: &str,
        action: AgencyAction,
    ) -> Result<(), ApiError>;
}

/// ApiState
///
/// The concrete type used to share the API client across the application state.
pub type ApiState = Arc<dyn PortalApi>;

/// HttpPortalApi
///
/// The `reqwest` implementation of [`PortalApi`].
#[derive(Clone)]
pub struct HttpPortalApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPortalApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Maps non-success statuses onto the portal's error taxonomy.
fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(ApiError::Unauthorized)
    } else if !status.is_success() {
        Err(ApiError::Status(status.as_u16()))
    } else {
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    check_status(response)?
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn current_user(&self, token: &str) -> Result<MigrantProfile, ApiError> {
        let response = self
            .client
            .get(self.url("/api/auth/user"))
            .bearer_auth(token)
            .send()
            .await?;
        decode(response).await
    }

    async fn verification_agencies(&self) -> Result<Vec<Agency>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/agency/agencies"))
            .send()
            .await?;
        decode(response).await
    }

    async fn request_verification(&self, request: &VerificationRequest) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/api/agency/request-verification"))
            .json(request)
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    async fn government_agencies(
        &self,
        token: &str,
        filter: Option<&AgencyFilter>,
    ) -> Result<Vec<Agency>, ApiError> {
        let mut request = self
            .client
            .get(self.url("/api/government/agencies"))
            .header("x-auth-token", token);

        if let Some(filter) = filter {
            request = request.query(&[
                ("status", filter.status.as_str()),
                ("search", filter.search.as_str()),
            ]);
        }

        let envelope: GovernmentAgencies = decode(request.send().await?).await?;
        Ok(envelope.agencies)
    }

    async fn update_agency(
        &self,
        token: &str,
        agency_id: &str,
        action: AgencyAction,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url(&format!("/api/government/agencies/{}", agency_id)))
            .header("x-auth-token", token)
            .json(&AgencyActionRequest { action })
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}
