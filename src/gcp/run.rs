//! Cloud Run Admin API v2 REST client.
//!
//! Thin HTTP wrapper over the four control-plane calls the provisioning
//! flow needs: `createService`, operation polling, `getIamPolicy`, and
//! `setIamPolicy`. Error envelopes are decoded in `parse_api_error` so the
//! mapping stays pure and testable.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{GcpError, Identity, Operation, Policy, RunAdmin, Service};

const RUN_API_BASE_URL: &str = "https://run.googleapis.com/v2";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

/// [`RunAdmin`] implementation over the public REST endpoint. Bearer tokens
/// come from the injected [`Identity`] on every call.
pub struct RunAdminClient {
    http: reqwest::Client,
    identity: Arc<dyn Identity>,
    base_url: String,
}

impl RunAdminClient {
    /// Build a client against the standard Cloud Run endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::HttpClientBuild`] if the HTTP client fails.
    pub fn new(identity: Arc<dyn Identity>) -> Result<Self, GcpError> {
        Self::with_base_url(identity, RUN_API_BASE_URL.to_string())
    }

    /// Build a client against a custom endpoint (tests).
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::HttpClientBuild`] if the HTTP client fails.
    pub fn with_base_url(identity: Arc<dyn Identity>, base_url: String) -> Result<Self, GcpError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GcpError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, identity, base_url: base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GcpError> {
        let token = self.identity.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GcpError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GcpError::ApiRequest(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(parse_api_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| GcpError::ApiParse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RunAdmin for RunAdminClient {
    async fn create_service(
        &self,
        parent: &str,
        service_id: &str,
        service: &Service,
    ) -> Result<Operation, GcpError> {
        debug!(%parent, %service_id, "createService");
        let request = self
            .http
            .post(self.url(&format!("{parent}/services")))
            .query(&[("serviceId", service_id)])
            .json(service);
        self.execute(request).await
    }

    async fn get_operation(&self, name: &str) -> Result<Operation, GcpError> {
        debug!(%name, "getOperation");
        self.execute(self.http.get(self.url(name))).await
    }

    async fn get_iam_policy(&self, resource: &str) -> Result<Policy, GcpError> {
        debug!(%resource, "getIamPolicy");
        self.execute(self.http.get(self.url(&format!("{resource}:getIamPolicy"))))
            .await
    }

    async fn set_iam_policy(&self, resource: &str, policy: &Policy) -> Result<Policy, GcpError> {
        debug!(%resource, "setIamPolicy");
        let request = self
            .http
            .post(self.url(&format!("{resource}:setIamPolicy")))
            .json(&serde_json::json!({ "policy": policy }));
        self.execute(request).await
    }
}

// =============================================================================
// ERROR ENVELOPE
// =============================================================================

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorBody {
    message: String,
    status: String,
}

/// Decode a non-success response body into [`GcpError::Api`]. Bodies that do
/// not carry the standard `{"error": {...}}` envelope keep the raw text as
/// the message.
fn parse_api_error(http_status: u16, body: &str) -> GcpError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => GcpError::Api {
            http_status,
            status: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => GcpError::Api {
            http_status,
            status: String::new(),
            message: body.trim().to_string(),
        },
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
