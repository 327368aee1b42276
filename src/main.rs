mod config;
mod gcp;
mod routes;
mod services;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env();
    if config.service_account_key.is_none() {
        tracing::warn!(
            "{} not set — provisioning requests will fail until the secret is mounted",
            config::SERVICE_ACCOUNT_KEY_ENV
        );
    }
    let port = config.port;

    let identity =
        Arc::new(gcp::auth::MetadataIdentity::new().expect("metadata client init failed"));
    let run = Arc::new(
        gcp::run::RunAdminClient::new(identity.clone()).expect("run client init failed"),
    );

    let state = state::AppState::new(config, identity, run);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "launchpad listening");
    axum::serve(listener, app).await.expect("server failed");
}
