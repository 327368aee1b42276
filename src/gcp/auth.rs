//! Caller identity via the GCE metadata server.
//!
//! Cloud Run and Cloud Functions expose project identity and service-account
//! tokens through the instance metadata endpoint. The project id is fetched
//! once per process; access tokens are cached until close to expiry.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::types::{GcpError, Identity};

const METADATA_BASE_URL: &str = "http://metadata.google.internal/computeMetadata/v1";
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";

const REQUEST_TIMEOUT_SECS: u64 = 10;
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Refresh a cached token this long before its reported expiry.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 30;

// =============================================================================
// CLIENT
// =============================================================================

/// [`Identity`] implementation backed by the metadata server.
pub struct MetadataIdentity {
    http: reqwest::Client,
    base_url: String,
    project_id: RwLock<Option<String>>,
    token: RwLock<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl MetadataIdentity {
    /// Build a metadata client against the standard endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::HttpClientBuild`] if the HTTP client fails.
    pub fn new() -> Result<Self, GcpError> {
        Self::with_base_url(METADATA_BASE_URL.to_string())
    }

    /// Build a metadata client against a custom endpoint (tests).
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::HttpClientBuild`] if the HTTP client fails.
    pub fn with_base_url(base_url: String) -> Result<Self, GcpError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GcpError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: RwLock::new(None),
            token: RwLock::new(None),
        })
    }

    async fn fetch_text(&self, path: &str) -> Result<String, GcpError> {
        let response = self
            .http
            .get(format!("{}/{path}", self.base_url))
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .send()
            .await
            .map_err(|e| GcpError::Metadata(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GcpError::Metadata(e.to_string()))?;

        if !status.is_success() {
            return Err(GcpError::Metadata(format!("{path}: status {status}")));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl Identity for MetadataIdentity {
    async fn project_id(&self) -> Result<String, GcpError> {
        if let Some(cached) = self.project_id.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let fetched = self.fetch_text("project/project-id").await?;
        let project_id = fetched.trim().to_string();
        if project_id.is_empty() {
            return Err(GcpError::Metadata("empty project id".into()));
        }
        *self.project_id.write().await = Some(project_id.clone());
        Ok(project_id)
    }

    async fn access_token(&self) -> Result<String, GcpError> {
        let now = Instant::now();
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.access_token.clone());
            }
        }

        let body = self
            .fetch_text("instance/service-accounts/default/token")
            .await?;
        let parsed = parse_token_response(&body)?;
        let cached = CachedToken {
            access_token: parsed.access_token.clone(),
            expires_at: now + token_lifetime(parsed.expires_in),
        };
        *self.token.write().await = Some(cached);
        Ok(parsed.access_token)
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

fn parse_token_response(body: &str) -> Result<TokenResponse, GcpError> {
    let parsed: TokenResponse =
        serde_json::from_str(body).map_err(|e| GcpError::ApiParse(e.to_string()))?;
    if parsed.access_token.is_empty() {
        return Err(GcpError::Metadata("empty access token".into()));
    }
    Ok(parsed)
}

fn token_lifetime(expires_in: u64) -> Duration {
    Duration::from_secs(expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
