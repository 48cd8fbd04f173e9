//! Configuration directory discovery and loading of the three JSON files.
//!
//! Settings are loaded once at startup and passed by reference into the run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::naming::DynamicNamingConfig;
use crate::types::{Config, CustomFieldsConfig, Settings};

pub const CONFIG_FILE: &str = "config.json";
pub const CUSTOM_FIELDS_FILE: &str = "custom_fields.json";
pub const DYNAMIC_NAMES_FILE: &str = "dynamic_names.json";

/// Environment variable overriding the configuration directory.
pub const HOME_ENV: &str = "ITAGENT_HOME";

/// Pick the configuration directory: CLI flag, `ITAGENT_HOME`, the
/// executable's directory when it holds config.json, then `~/.itagent`.
pub fn config_dir(cli_override: Option<&Path>) -> Result<PathBuf, String> {
    let env_dir = std::env::var_os(HOME_ENV).map(PathBuf::from);
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    choose_config_dir(cli_override, env_dir, exe_dir, dirs::home_dir)
}

/// `home` is only consulted when nothing earlier in the order applies.
fn choose_config_dir(
    cli_override: Option<&Path>,
    env_dir: Option<PathBuf>,
    exe_dir: Option<PathBuf>,
    home: impl FnOnce() -> Option<PathBuf>,
) -> Result<PathBuf, String> {
    if let Some(dir) = cli_override {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = env_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }
    if let Some(dir) = exe_dir.filter(|d| d.join(CONFIG_FILE).exists()) {
        return Ok(dir);
    }
    let home = home().ok_or("Could not find home directory")?;
    Ok(home.join(".itagent"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Load config.json. A missing file is an error.
pub fn load_config(dir: &Path) -> Result<Config, String> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Err(format!(
            "Config file not found at {}. Create it with: {{ \"server\": {{ \"site\": \"https://snipe.example/api/v1\", \"apiKey\": \"...\" }} }}",
            path.display()
        ));
    }
    let config: Config = read_json(&path)?;

    if config.server.site.trim().is_empty() {
        return Err(format!("server.site is empty in {}", path.display()));
    }
    Ok(config)
}

/// Load custom_fields.json; no file means no custom fields.
pub fn load_custom_fields(dir: &Path) -> Result<CustomFieldsConfig, String> {
    let path = dir.join(CUSTOM_FIELDS_FILE);
    if !path.exists() {
        log::info!("{} not found, collecting no custom fields", path.display());
        return Ok(CustomFieldsConfig::default());
    }
    read_json(&path)
}

/// Load dynamic_names.json. Any problem disables dynamic naming.
pub fn load_dynamic_naming(dir: &Path) -> DynamicNamingConfig {
    let path = dir.join(DYNAMIC_NAMES_FILE);
    if !path.exists() {
        log::debug!("{} not found, dynamic naming disabled", path.display());
        return DynamicNamingConfig::default();
    }
    match read_json(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}; dynamic naming disabled", e);
            DynamicNamingConfig::default()
        }
    }
}

pub fn load_settings(dir: &Path) -> Result<Settings, String> {
    log::debug!("Loading configuration from {}", dir.display());
    Ok(Settings {
        config: load_config(dir)?,
        custom_fields: load_custom_fields(dir)?,
        dynamic_naming: load_dynamic_naming(dir),
    })
}
