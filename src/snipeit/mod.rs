//! Snipe-IT asset inventory integration.
//!
//! Keeps manufacturers, models and assets in Snipe-IT in step with what the
//! probe found on this machine. Every entity goes through the same
//! get-or-create-or-update cycle in `resolver`; `client` is the only place
//! that talks HTTP.

pub mod client;
pub mod entity;
#[cfg(test)]
pub(crate) mod fake;
pub mod resolver;

use serde::{Deserialize, Serialize};

/// Snipe-IT connection settings stored in config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// API base URL, e.g. `https://snipe.example.com/api/v1`.
    pub site: String,
    #[serde(alias = "api_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_secs", alias = "timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}
