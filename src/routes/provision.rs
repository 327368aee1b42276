//! Provisioning route — payload validation and status mapping.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::gcp::{FailureKind, classify};
use crate::services::provision::{self, ProvisionError, ProvisionRequest, REGION};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceResponse {
    pub message: String,
    pub service_url: String,
    /// Full resource name of the created service.
    pub service_name: String,
}

/// `POST /` — create a Cloud Run service from the caller's payload and make
/// it publicly invokable.
pub async fn create_service(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<CreateServiceResponse>, (StatusCode, String)> {
    let request = parse_request(&body).map_err(|field| {
        (
            StatusCode::BAD_REQUEST,
            format!("Missing or invalid \"{field}\" in request body."),
        )
    })?;

    let Some(key) = state.config.service_account_key.as_deref() else {
        error!("GOOGLE_ENVIRONMENT_VARIABLES is not set; is the secret mounted?");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error: missing service account key.".to_string(),
        ));
    };

    let provisioned = provision::provision(
        state.identity.as_ref(),
        state.run.as_ref(),
        &request,
        key,
    )
    .await
    .map_err(|err| {
        error!(service_id = %request.service_name, %err, "provisioning failed");
        error_status(&request.service_name, &err)
    })?;

    Ok(Json(CreateServiceResponse {
        message: format!(
            "Service {} created successfully and made public.",
            request.service_name
        ),
        service_url: provisioned.service_url,
        service_name: provisioned.service_name,
    }))
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Extract the three required string fields from a loose JSON body,
/// validated in declaration order; the first failure wins. Empty strings and
/// non-string values count as missing.
pub(crate) fn parse_request(body: &Value) -> Result<ProvisionRequest, &'static str> {
    Ok(ProvisionRequest {
        service_name: require_string(body, "serviceName")?,
        humanitec_token: require_string(body, "HUMANITEC_TOKEN")?,
        google_api_key: require_string(body, "GOOGLE_API_KEY")?,
    })
}

fn require_string(body: &Value, field: &'static str) -> Result<String, &'static str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .ok_or(field)
}

// =============================================================================
// STATUS MAPPING
// =============================================================================

pub(crate) fn error_status(service_name: &str, err: &ProvisionError) -> (StatusCode, String) {
    match err {
        ProvisionError::Identity(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not determine Google Cloud project ID.".to_string(),
        ),
        ProvisionError::Provider(gcp) => match classify(gcp) {
            FailureKind::AlreadyExists => (
                StatusCode::CONFLICT,
                format!("Service {service_name} already exists in {REGION}."),
            ),
            FailureKind::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "Permission denied. Ensure the service account has the Cloud Run Admin and IAM Policy Admin roles."
                    .to_string(),
            ),
            FailureKind::Other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create or configure service {service_name}. Error: {gcp}"),
            ),
        },
    }
}

#[cfg(test)]
#[path = "provision_test.rs"]
mod tests;
