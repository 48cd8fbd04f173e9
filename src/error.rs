//! Error types for inventory reconciliation
//!
//! Errors are classified by where they stop the run:
//! - Entity: the remote refused or mangled one entity (remote error, failed create/update, bad rows)
//! - Transport: the HTTP layer itself failed
//!
//! "Not found" is never an error here. A lookup that finds nothing returns
//! `Lookup::NotFound` and the resolver moves on to creation.

use std::fmt;

use thiserror::Error;

use crate::probe::ProbeError;

/// The remote entity kinds the agent reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Manufacturer,
    Model,
    Hardware,
    Monitor,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Manufacturer => "manufacturer",
            EntityKind::Model => "model",
            EntityKind::Hardware => "hardware",
            EntityKind::Monitor => "monitor",
        };
        f.write_str(name)
    }
}

/// Error types for get-or-create-or-update against the inventory API
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote error while looking up {entity} '{key}': {message}")]
    Remote {
        entity: EntityKind,
        key: String,
        message: String,
    },

    #[error("Failed to create {entity} '{key}': {message}")]
    CreationFailed {
        entity: EntityKind,
        key: String,
        message: String,
    },

    #[error("Created {entity} '{key}' but it could not be found afterwards")]
    MissingAfterCreate { entity: EntityKind, key: String },

    #[error("Failed to update {entity} {id}: {message}")]
    UpdateFailed {
        entity: EntityKind,
        id: u64,
        message: String,
    },

    #[error("Unexpected {entity} search response: {detail}")]
    DataShape { entity: EntityKind, detail: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RemoteError,
    CreationFailure,
    UpdateFailure,
    DataShapeError,
    TransportFailure,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Remote { .. } => ErrorKind::RemoteError,
            SyncError::CreationFailed { .. } | SyncError::MissingAfterCreate { .. } => {
                ErrorKind::CreationFailure
            }
            SyncError::UpdateFailed { .. } => ErrorKind::UpdateFailure,
            SyncError::DataShape { .. } => ErrorKind::DataShapeError,
            SyncError::Transport(_) => ErrorKind::TransportFailure,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::RemoteError => "Check the API token permissions in config.json.",
            ErrorKind::CreationFailure => {
                "Check the default category, fieldset, status and company ids in config.json."
            }
            ErrorKind::UpdateFailure => "Check that the custom field ids exist in the fieldset.",
            ErrorKind::DataShapeError => {
                "The server returned an unexpected format. Check the Snipe-IT version."
            }
            ErrorKind::TransportFailure => "Check the server URL and network connectivity.",
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

/// Top-level error for one agent run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl AgentError {
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AgentError::Config(_) => "Check config.json next to the agent or in ~/.itagent/",
            AgentError::Probe(_) => "Make sure powershell.exe is available and WMI is running.",
            AgentError::Sync(e) => e.recovery_suggestion(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_after_create_is_creation_failure() {
        let err = SyncError::MissingAfterCreate {
            entity: EntityKind::Model,
            key: "OptiPlex 7090".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::CreationFailure);
        assert_eq!(
            err.to_string(),
            "Created model 'OptiPlex 7090' but it could not be found afterwards"
        );
    }

    #[test]
    fn test_agent_error_delegates_suggestion() {
        let err = AgentError::from(SyncError::Transport("connection refused".to_string()));
        assert_eq!(
            err.recovery_suggestion(),
            "Check the server URL and network connectivity."
        );
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }
}
