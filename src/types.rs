use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::naming::DynamicNamingConfig;
use crate::snipeit::ServerConfig;

/// Custom field values collected for one asset, keyed by Snipe-IT field id
/// (e.g. `_snipeit_mac_address_1`). Built once by the probe, read-only after.
pub type CollectedFields = BTreeMap<String, String>;

/// Agent configuration stored in config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub debugging: DebuggingConfig,
}

/// Feature switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralConfig {
    #[serde(default = "default_true", alias = "asset_collection")]
    pub asset_collection: bool,
    /// When false, created assets get no asset tag and Snipe-IT's own
    /// auto-increment (if enabled) applies.
    #[serde(default = "default_true", alias = "asset_tag_generation")]
    pub asset_tag_generation: bool,
    #[serde(default, alias = "monitor_collection")]
    pub monitor_collection: bool,
    /// Global half of the dynamic naming switch; dynamic_names.json holds the other.
    #[serde(default, alias = "dynamic_naming")]
    pub dynamic_naming: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            asset_collection: true,
            asset_tag_generation: true,
            monitor_collection: false,
            dynamic_naming: false,
        }
    }
}

/// Snipe-IT ids used when nothing more specific applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsConfig {
    #[serde(default = "default_status_id", alias = "status_id")]
    pub status_id: u64,
    #[serde(default = "default_company_id", alias = "company_id")]
    pub company_id: u64,
    #[serde(default = "default_category_id", alias = "category_id")]
    pub category_id: u64,
    #[serde(default = "default_fieldset_id", alias = "fieldset_id")]
    pub fieldset_id: u64,
    #[serde(default = "default_monitor_category_id", alias = "monitor_category_id")]
    pub monitor_category_id: u64,
    #[serde(default = "default_fieldset_id", alias = "monitor_fieldset_id")]
    pub monitor_fieldset_id: u64,
}

fn default_true() -> bool {
    true
}

fn default_status_id() -> u64 {
    2
}

fn default_company_id() -> u64 {
    1
}

fn default_category_id() -> u64 {
    3
}

fn default_fieldset_id() -> u64 {
    1
}

fn default_monitor_category_id() -> u64 {
    5
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            status_id: default_status_id(),
            company_id: default_company_id(),
            category_id: default_category_id(),
            fieldset_id: default_fieldset_id(),
            monitor_category_id: default_monitor_category_id(),
            monitor_fieldset_id: default_fieldset_id(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebuggingConfig {
    /// Suppress the error log on a failed run (the exit code is still 1).
    #[serde(default, alias = "silent_mode")]
    pub silent_mode: bool,
    #[serde(default, alias = "slack_logging")]
    pub slack_logging: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "slack_webhook")]
    pub slack_webhook: Option<String>,
}

/// Field collection settings stored in custom_fields.json.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldsConfig {
    /// Built-in collectors keyed by collector name (`mac_address`, `total_storage`, ...).
    #[serde(default, alias = "enabled_static_fields")]
    pub enabled_static_fields: BTreeMap<String, StaticFieldSpec>,
    /// Command-backed fields keyed by Snipe-IT field id.
    #[serde(default, alias = "custom_fields")]
    pub custom_fields: BTreeMap<String, CollectedFieldSpec>,
    #[serde(default, alias = "monitor_fields")]
    pub monitor_fields: MonitorFieldsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorFieldsConfig {
    #[serde(default, alias = "custom_fields")]
    pub custom_fields: BTreeMap<String, CollectedFieldSpec>,
}

/// A built-in collector and the Snipe-IT field it writes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticFieldSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(alias = "field_name")]
    pub field_name: String,
}

/// A custom field whose value comes from a probe command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedFieldSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "psCommand", alias = "ps_command")]
    pub source_command: String,
    /// Pass the output through [`crate::normalize::format_number`].
    #[serde(default, rename = "floatNumber", alias = "float_number")]
    pub is_numeric: bool,
    #[serde(default, rename = "name")]
    pub display_name: String,
}

/// Everything loaded at startup, passed by reference into the run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub custom_fields: CustomFieldsConfig,
    pub dynamic_naming: DynamicNamingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_minimal_json() {
        let config: Config = serde_json::from_str(
            r#"{ "server": { "site": "https://snipe.example/api/v1", "apiKey": "t" } }"#,
        )
        .unwrap();
        assert!(config.general.asset_collection);
        assert!(config.general.asset_tag_generation);
        assert!(!config.general.monitor_collection);
        assert_eq!(config.defaults.category_id, 3);
        assert!(config.debugging.slack_webhook.is_none());
    }

    #[test]
    fn test_custom_fields_accepts_snake_case() {
        let fields: CustomFieldsConfig = serde_json::from_str(
            r#"{
                "enabled_static_fields": {
                    "mac_address": { "enabled": true, "field_name": "_snipeit_mac_address_1" }
                },
                "custom_fields": {
                    "_snipeit_ram_3": { "enabled": true, "ps_command": "(gwmi win32_computersystem).TotalPhysicalMemory", "float_number": true, "name": "RAM" }
                },
                "monitor_fields": { "custom_fields": {} }
            }"#,
        )
        .unwrap();
        let ram = &fields.custom_fields["_snipeit_ram_3"];
        assert!(ram.enabled);
        assert!(ram.is_numeric);
        assert_eq!(ram.display_name, "RAM");
        assert_eq!(
            fields.enabled_static_fields["mac_address"].field_name,
            "_snipeit_mac_address_1"
        );
    }
}
