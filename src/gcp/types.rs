//! Cloud Run Admin API types — wire shapes, errors, and provider traits.
//!
//! Provider-neutral seam for the provisioning flow: the `Identity` and
//! `RunAdmin` traits are what the routes and services program against, so
//! tests substitute fakes and the REST client stays swappable.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by Google Cloud client operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GcpError {
    /// A request to the GCE metadata server failed.
    #[error("metadata request failed: {0}")]
    Metadata(String),

    /// The HTTP request to the Cloud Run API failed at the transport level.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The Cloud Run API returned a non-success HTTP status.
    #[error("API error {status} ({http_status}): {message}")]
    Api {
        /// HTTP status of the response.
        http_status: u16,
        /// RPC status string from the error envelope (e.g. `ALREADY_EXISTS`),
        /// empty when the envelope did not parse.
        status: String,
        /// Human-readable message from the error envelope, or the raw body.
        message: String,
    },

    /// A long-running operation completed with an error status.
    #[error("operation {name} failed with code {code}: {message}")]
    OperationFailed {
        name: String,
        /// Numeric RPC code carried by `google.rpc.Status`.
        code: i32,
        message: String,
    },

    /// A long-running operation did not complete before the deadline.
    #[error("operation {0} did not complete before the deadline")]
    OperationTimeout(String),

    /// A long-running operation completed without an error or a response.
    #[error("operation {0} completed without a service response")]
    OperationEmpty(String),

    /// A response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// FAILURE CLASSIFICATION
// =============================================================================

/// RPC code for `ALREADY_EXISTS` in `google.rpc.Code`.
pub const RPC_CODE_ALREADY_EXISTS: i32 = 6;
/// RPC code for `PERMISSION_DENIED` in `google.rpc.Code`.
pub const RPC_CODE_PERMISSION_DENIED: i32 = 7;

/// The closed set of provider failure conditions the HTTP surface
/// distinguishes. Everything not recognized is [`FailureKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service id is already taken in the target location.
    AlreadyExists,
    /// The caller's service account lacks a required role.
    PermissionDenied,
    /// Any other provider or transport failure.
    Other,
}

/// Classify a provider error into the closed [`FailureKind`] set.
///
/// Recognizes the RPC status string and HTTP status of API error envelopes,
/// and the numeric RPC code of failed long-running operations.
#[must_use]
pub fn classify(err: &GcpError) -> FailureKind {
    match err {
        GcpError::Api { http_status, status, .. } => match (status.as_str(), http_status) {
            ("ALREADY_EXISTS", _) | (_, 409) => FailureKind::AlreadyExists,
            ("PERMISSION_DENIED", _) | (_, 403) => FailureKind::PermissionDenied,
            _ => FailureKind::Other,
        },
        GcpError::OperationFailed { code, .. } => match *code {
            RPC_CODE_ALREADY_EXISTS => FailureKind::AlreadyExists,
            RPC_CODE_PERMISSION_DENIED => FailureKind::PermissionDenied,
            _ => FailureKind::Other,
        },
        _ => FailureKind::Other,
    }
}

// =============================================================================
// SERVICE DEFINITION
// =============================================================================

/// A single environment entry on the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// A container in the revision template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Container {
    pub image: String,
    pub env: Vec<EnvVar>,
}

/// The revision template of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionTemplate {
    pub containers: Vec<Container>,
}

/// A Cloud Run service definition as sent to `createService`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub template: RevisionTemplate,
}

// =============================================================================
// LONG-RUNNING OPERATION
// =============================================================================

/// The subset of the created service the flow consumes, decoded from the
/// operation's `response` field. Extra provider fields (`@type`, revision
/// state, …) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatedService {
    /// Full resource name, `projects/{p}/locations/{l}/services/{s}`.
    pub name: String,
    /// Public HTTPS URL of the service.
    pub uri: String,
}

/// Error status of a failed operation (`google.rpc.Status`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationStatus {
    pub code: i32,
    pub message: String,
}

/// A long-running operation returned by `createService` and polled until
/// `done`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    pub name: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<CreatedService>,
}

// =============================================================================
// IAM POLICY
// =============================================================================

/// A role-to-principals binding on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,
    pub members: Vec<String>,
}

/// An IAM access policy. Read, amended, and written back verbatim — the
/// `etag` must round-trip so concurrent writers are detected by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    pub bindings: Vec<Binding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

// =============================================================================
// PROVIDER TRAITS
// =============================================================================

/// Caller identity: project resolution and access tokens. Backed by the GCE
/// metadata server in production, faked in tests.
#[async_trait::async_trait]
pub trait Identity: Send + Sync {
    /// Resolve the project id this process runs in.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::Metadata`] when the metadata server is
    /// unreachable or answers with a non-success status.
    async fn project_id(&self) -> Result<String, GcpError>;

    /// Fetch an OAuth2 access token for the default service account.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::Metadata`] when the token cannot be fetched.
    async fn access_token(&self) -> Result<String, GcpError>;
}

/// Cloud Run Admin API control-plane operations used by the provisioning
/// flow. One method per remote call so fakes can script each step.
#[async_trait::async_trait]
pub trait RunAdmin: Send + Sync {
    /// `createService`: start creation of `service` under `parent` with the
    /// given service id. Returns the long-running operation.
    ///
    /// # Errors
    ///
    /// Returns a [`GcpError`] on transport failure or an API error response
    /// (notably `ALREADY_EXISTS` when the id is taken).
    async fn create_service(
        &self,
        parent: &str,
        service_id: &str,
        service: &Service,
    ) -> Result<Operation, GcpError>;

    /// Fetch the current state of a long-running operation by name.
    ///
    /// # Errors
    ///
    /// Returns a [`GcpError`] on transport failure or an API error response.
    async fn get_operation(&self, name: &str) -> Result<Operation, GcpError>;

    /// Read the IAM policy of a service.
    ///
    /// # Errors
    ///
    /// Returns a [`GcpError`] on transport failure or an API error response.
    async fn get_iam_policy(&self, resource: &str) -> Result<Policy, GcpError>;

    /// Replace the IAM policy of a service.
    ///
    /// # Errors
    ///
    /// Returns a [`GcpError`] on transport failure or an API error response
    /// (notably `PERMISSION_DENIED` when the caller cannot administer IAM).
    async fn set_iam_policy(&self, resource: &str, policy: &Policy) -> Result<Policy, GcpError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
