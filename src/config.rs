//! Server configuration from environment variables.

pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable the deployment platform mounts the service-account
/// key into (a Secret Manager secret exposed as an env var).
pub const SERVICE_ACCOUNT_KEY_ENV: &str = "GOOGLE_ENVIRONMENT_VARIABLES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Opaque service-account key JSON forwarded verbatim to provisioned
    /// workloads. `None` when the secret is not mounted; provisioning
    /// requests then fail with a configuration error before any provider
    /// call.
    pub service_account_key: Option<String>,
}

impl Config {
    /// Build the config from environment variables.
    ///
    /// - `PORT`: listen port, default 8080
    /// - `GOOGLE_ENVIRONMENT_VARIABLES`: mounted service-account key; empty
    ///   treated as absent
    #[must_use]
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let service_account_key = std::env::var(SERVICE_ACCOUNT_KEY_ENV)
            .ok()
            .filter(|v| !v.is_empty());
        Self { port, service_account_key }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
