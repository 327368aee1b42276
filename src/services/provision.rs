//! Provisioning service — create a Cloud Run service and open it to the
//! public.
//!
//! DESIGN
//! ======
//! One linear flow per request: resolve the project, build the service
//! definition around the fixed chat image, start creation, await the
//! long-running operation, then append the public-invoker binding to the
//! service's IAM policy. Creation and the policy write are not transactional:
//! a policy failure after a successful creation leaves the service deployed
//! but non-public, and is reported through the same error path.

use std::time::Duration;

use tracing::info;

use crate::gcp::types::{
    Binding, Container, CreatedService, EnvVar, GcpError, Identity, Operation, RevisionTemplate,
    RunAdmin, Service,
};

/// Deployment region. The image repository below is pinned to it.
pub const REGION: &str = "us-central1";

/// Image tag built by CI for the chat workload every provisioned service runs.
const IMAGE_TAG: &str = "17f96adf511309c19f9d5e640f0b8dc3fbdefc06";

/// Model the provisioned workload starts with.
const DEFAULT_MODEL: &str = "gemini-2.5-pro-preview-03-25";

/// Role and principal granting unauthenticated invocation.
const PUBLIC_INVOKER_ROLE: &str = "roles/run.invoker";
const ALL_USERS: &str = "allUsers";

const OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(2);
const OPERATION_DEADLINE: Duration = Duration::from_secs(600);

// =============================================================================
// TYPES
// =============================================================================

/// Validated provisioning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Caller-supplied name, used verbatim as the service id. Doubles as the
    /// only idempotency key: a repeat request hits the provider's
    /// ALREADY_EXISTS error.
    pub service_name: String,
    pub humanitec_token: String,
    pub google_api_key: String,
}

/// Outcome of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    /// Full resource name of the created service.
    pub service_name: String,
    /// Public HTTPS URL of the created service.
    pub service_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The project id could not be resolved; nothing was created.
    #[error("could not determine project id: {0}")]
    Identity(#[source] GcpError),

    /// A provider call failed during creation or the policy update.
    #[error(transparent)]
    Provider(#[from] GcpError),
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Create the service and make it publicly invokable.
///
/// # Errors
///
/// Returns [`ProvisionError::Identity`] when project resolution fails (no
/// provider call is made), and [`ProvisionError::Provider`] for any failure
/// in the create/await/policy sequence.
pub async fn provision(
    identity: &dyn Identity,
    run: &dyn RunAdmin,
    request: &ProvisionRequest,
    service_account_key: &str,
) -> Result<Provisioned, ProvisionError> {
    let project_id = identity
        .project_id()
        .await
        .map_err(ProvisionError::Identity)?;

    let parent = format!("projects/{project_id}/locations/{REGION}");
    let service = build_service(&project_id, request, service_account_key);
    info!(
        service_id = %request.service_name,
        %parent,
        image = %container_image(&project_id),
        "creating service"
    );

    let operation = run
        .create_service(&parent, &request.service_name, &service)
        .await?;
    info!(operation = %operation.name, "waiting for service creation");

    let created =
        await_operation(run, operation, OPERATION_POLL_INTERVAL, OPERATION_DEADLINE).await?;
    info!(service = %created.name, uri = %created.uri, "service created");

    make_public(run, &created.name).await?;
    info!(service = %created.name, "public-invoker binding applied");

    Ok(Provisioned { service_name: created.name, service_url: created.uri })
}

// =============================================================================
// SERVICE DEFINITION
// =============================================================================

pub(crate) fn container_image(project_id: &str) -> String {
    format!("{REGION}-docker.pkg.dev/{project_id}/github-actions-builds/canyonchat:{IMAGE_TAG}")
}

/// Environment forwarded to the created workload: fixed entries, the two
/// caller secrets, and the mounted service-account key, in stable order.
pub(crate) fn build_env(request: &ProvisionRequest, service_account_key: &str) -> Vec<EnvVar> {
    let entry = |name: &str, value: &str| EnvVar { name: name.into(), value: value.into() };
    vec![
        entry("ENABLE_MCP", "true"),
        entry("DEFAULT_MODEL", DEFAULT_MODEL),
        entry("HUMANITEC_TOKEN", &request.humanitec_token),
        entry("GOOGLE_API_KEY", &request.google_api_key),
        entry("GCP_SERVICE_ACCOUNT_KEY_JSON", service_account_key),
    ]
}

pub(crate) fn build_service(
    project_id: &str,
    request: &ProvisionRequest,
    service_account_key: &str,
) -> Service {
    Service {
        template: RevisionTemplate {
            containers: vec![Container {
                image: container_image(project_id),
                env: build_env(request, service_account_key),
            }],
        },
    }
}

// =============================================================================
// OPERATION AWAIT
// =============================================================================

/// Poll a long-running operation until it completes or the deadline passes.
///
/// # Errors
///
/// [`GcpError::OperationFailed`] when the operation reports an error status,
/// [`GcpError::OperationEmpty`] when it completes with neither error nor
/// response, [`GcpError::OperationTimeout`] past the deadline, and any
/// polling transport error as-is.
pub(crate) async fn await_operation(
    run: &dyn RunAdmin,
    mut operation: Operation,
    poll_interval: Duration,
    deadline: Duration,
) -> Result<CreatedService, GcpError> {
    let give_up_at = tokio::time::Instant::now() + deadline;
    loop {
        if operation.done {
            if let Some(status) = operation.error {
                return Err(GcpError::OperationFailed {
                    name: operation.name,
                    code: status.code,
                    message: status.message,
                });
            }
            return operation
                .response
                .ok_or(GcpError::OperationEmpty(operation.name));
        }
        if tokio::time::Instant::now() >= give_up_at {
            return Err(GcpError::OperationTimeout(operation.name));
        }
        tokio::time::sleep(poll_interval).await;
        operation = run.get_operation(&operation.name).await?;
    }
}

// =============================================================================
// PUBLIC ACCESS
// =============================================================================

/// Append the `allUsers` invoker binding to the service's policy. The
/// pre-existing bindings and etag are written back untouched.
pub(crate) async fn make_public(run: &dyn RunAdmin, resource: &str) -> Result<(), GcpError> {
    let mut policy = run.get_iam_policy(resource).await?;
    policy.bindings.push(Binding {
        role: PUBLIC_INVOKER_ROLE.into(),
        members: vec![ALL_USERS.into()],
    });
    run.set_iam_policy(resource, &policy).await?;
    Ok(())
}

#[cfg(test)]
#[path = "provision_test.rs"]
mod tests;
