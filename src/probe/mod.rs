//! Hardware probe: raw facts about this machine and its attached monitors.
//!
//! The probe only reports what the OS says. Vendor fixes happen later in
//! `normalize`, and filtering of unusable monitors happens in `reconcile`.

pub mod monitors;
pub mod powershell;

pub use powershell::{PowerShell, PowerShellProbe};

use crate::types::{CollectedFields, CustomFieldsConfig};

/// Raw facts about the host, as reported by the OS.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostFacts {
    pub hostname: String,
    pub manufacturer: String,
    pub model: String,
    pub model_number: String,
    pub serial: String,
    pub custom_fields: CollectedFields,
}

/// One detected monitor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorFacts {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub custom_fields: CollectedFields,
}

/// Errors from the hardware probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Could not start powershell.exe: {0}")]
    SpawnFailed(String),
    #[error("Failed to parse monitor data: {0}")]
    ParseError(String),
}

pub trait HardwareProbe {
    fn hostname(&self) -> Result<String, ProbeError>;

    fn host_facts(&self, fields: &CustomFieldsConfig) -> Result<HostFacts, ProbeError>;

    fn monitors(&self, fields: &CustomFieldsConfig) -> Result<Vec<MonitorFacts>, ProbeError>;
}
