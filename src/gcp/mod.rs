//! Google Cloud plumbing: metadata-server identity and the Cloud Run Admin
//! REST client, behind the traits in [`types`].

pub mod auth;
pub mod run;
pub mod types;

pub use types::{FailureKind, GcpError, Identity, RunAdmin, classify};
