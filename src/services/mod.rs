//! Domain services behind the HTTP routes.
//!
//! Service modules own the provisioning logic so route handlers stay focused
//! on protocol translation and status mapping.

pub mod provision;
