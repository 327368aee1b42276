//! Router assembly.
//!
//! One provisioning endpoint at `/` plus a liveness probe. The CORS headers
//! are pinned values set on every response (including 405s), and preflight
//! `OPTIONS` answers 204 with an empty body, so the header layers are paired
//! with an explicit `OPTIONS` route instead of a negotiating CORS layer.

pub mod provision;

use axum::Router;
use axum::http::{HeaderValue, StatusCode, header};
use axum::routing::{get, post};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", post(provision::create_service).options(preflight))
        .route("/healthz", get(healthz))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
