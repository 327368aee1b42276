use super::*;

// =========================================================================
// classify
// =========================================================================

fn api_error(http_status: u16, status: &str) -> GcpError {
    GcpError::Api { http_status, status: status.into(), message: "boom".into() }
}

#[test]
fn classify_already_exists_by_status_string() {
    assert_eq!(classify(&api_error(409, "ALREADY_EXISTS")), FailureKind::AlreadyExists);
}

#[test]
fn classify_already_exists_by_http_status_alone() {
    assert_eq!(classify(&api_error(409, "")), FailureKind::AlreadyExists);
}

#[test]
fn classify_permission_denied_by_status_string() {
    assert_eq!(classify(&api_error(403, "PERMISSION_DENIED")), FailureKind::PermissionDenied);
}

#[test]
fn classify_permission_denied_by_http_status_alone() {
    assert_eq!(classify(&api_error(403, "")), FailureKind::PermissionDenied);
}

#[test]
fn classify_other_api_errors() {
    assert_eq!(classify(&api_error(500, "INTERNAL")), FailureKind::Other);
    assert_eq!(classify(&api_error(400, "INVALID_ARGUMENT")), FailureKind::Other);
    assert_eq!(classify(&api_error(404, "NOT_FOUND")), FailureKind::Other);
}

#[test]
fn classify_operation_rpc_codes() {
    let failed = |code| GcpError::OperationFailed { name: "op".into(), code, message: "x".into() };
    assert_eq!(classify(&failed(RPC_CODE_ALREADY_EXISTS)), FailureKind::AlreadyExists);
    assert_eq!(classify(&failed(RPC_CODE_PERMISSION_DENIED)), FailureKind::PermissionDenied);
    assert_eq!(classify(&failed(13)), FailureKind::Other);
}

#[test]
fn classify_transport_and_parse_errors_as_other() {
    assert_eq!(classify(&GcpError::ApiRequest("connection reset".into())), FailureKind::Other);
    assert_eq!(classify(&GcpError::ApiParse("bad json".into())), FailureKind::Other);
    assert_eq!(classify(&GcpError::Metadata("timeout".into())), FailureKind::Other);
    assert_eq!(classify(&GcpError::OperationTimeout("op".into())), FailureKind::Other);
}

// =========================================================================
// Operation decoding
// =========================================================================

#[test]
fn operation_pending_defaults() {
    let op: Operation =
        serde_json::from_str(r#"{"name":"projects/p/locations/l/operations/abc"}"#).unwrap();
    assert_eq!(op.name, "projects/p/locations/l/operations/abc");
    assert!(!op.done);
    assert!(op.error.is_none());
    assert!(op.response.is_none());
}

#[test]
fn operation_done_with_response_ignores_extra_fields() {
    let json = r#"{
        "name": "projects/p/locations/us-central1/operations/abc",
        "done": true,
        "response": {
            "@type": "type.googleapis.com/google.cloud.run.v2.Service",
            "name": "projects/p/locations/us-central1/services/demo",
            "uri": "https://demo-xyz-uc.a.run.app",
            "generation": "3"
        }
    }"#;
    let op: Operation = serde_json::from_str(json).unwrap();
    assert!(op.done);
    let created = op.response.unwrap();
    assert_eq!(created.name, "projects/p/locations/us-central1/services/demo");
    assert_eq!(created.uri, "https://demo-xyz-uc.a.run.app");
}

#[test]
fn operation_done_with_error_status() {
    let json = r#"{
        "name": "projects/p/locations/us-central1/operations/abc",
        "done": true,
        "error": {"code": 6, "message": "resource already exists"}
    }"#;
    let op: Operation = serde_json::from_str(json).unwrap();
    let error = op.error.unwrap();
    assert_eq!(error.code, 6);
    assert_eq!(error.message, "resource already exists");
}

// =========================================================================
// Service encoding
// =========================================================================

#[test]
fn service_serializes_template_containers_env() {
    let service = Service {
        template: RevisionTemplate {
            containers: vec![Container {
                image: "us-central1-docker.pkg.dev/p/repo/app:tag".into(),
                env: vec![EnvVar { name: "A".into(), value: "1".into() }],
            }],
        },
    };
    let json = serde_json::to_value(&service).unwrap();
    assert_eq!(
        json["template"]["containers"][0]["image"],
        "us-central1-docker.pkg.dev/p/repo/app:tag"
    );
    assert_eq!(json["template"]["containers"][0]["env"][0]["name"], "A");
    assert_eq!(json["template"]["containers"][0]["env"][0]["value"], "1");
}

// =========================================================================
// Policy round-trip
// =========================================================================

#[test]
fn policy_decodes_bindings_and_etag() {
    let json = r#"{
        "version": 1,
        "bindings": [{"role": "roles/run.admin", "members": ["user:a@example.com"]}],
        "etag": "BwWWja0YfJA="
    }"#;
    let policy: Policy = serde_json::from_str(json).unwrap();
    assert_eq!(policy.version, Some(1));
    assert_eq!(policy.bindings.len(), 1);
    assert_eq!(policy.bindings[0].role, "roles/run.admin");
    assert_eq!(policy.etag.as_deref(), Some("BwWWja0YfJA="));
}

#[test]
fn policy_without_bindings_decodes_empty() {
    let policy: Policy = serde_json::from_str(r#"{"etag": "ACAB"}"#).unwrap();
    assert!(policy.bindings.is_empty());
    assert_eq!(policy.version, None);
}

#[test]
fn policy_round_trip_preserves_etag_and_omits_absent_version() {
    let policy = Policy {
        version: None,
        bindings: vec![Binding { role: "roles/run.invoker".into(), members: vec!["allUsers".into()] }],
        etag: Some("BwWWja0YfJA=".into()),
    };
    let json = serde_json::to_value(&policy).unwrap();
    assert!(json.get("version").is_none());
    assert_eq!(json["etag"], "BwWWja0YfJA=");
    let back: Policy = serde_json::from_value(json).unwrap();
    assert_eq!(back, policy);
}
