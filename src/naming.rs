//! Dynamic naming: category and company assignment from structured asset names.
//!
//! Asset names follow `<PREFIX><company digit><number>`, e.g. `LAP1234` is a
//! laptop (`LAP`) of company `1` with asset number `234`. The prefix selects a
//! category and the digit selects a company. A monitor attached to `LAP1234`
//! is named `MON1234`.
//!
//! The feature needs two opt-ins: `enabled` in dynamic_names.json and
//! `general.dynamicNaming` in config.json. When either is off, every lookup
//! here returns `None` and callers fall back to the configured defaults.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Dynamic naming configuration stored in dynamic_names.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicNamingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_monitor_prefix", alias = "monitor_prefix")]
    pub monitor_prefix: String,
    #[serde(default)]
    pub patterns: Vec<NamingPattern>,
    /// Company digit (as a string, `"1"`) → Snipe-IT company id.
    #[serde(default, alias = "company_mappings")]
    pub company_mappings: BTreeMap<String, u64>,
}

/// Name prefix → Snipe-IT category. Prefixes are compared against the
/// upper-cased name prefix, so configure them in upper case. Prefixes should
/// be unique; the first matching entry wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingPattern {
    pub prefix: String,
    #[serde(alias = "category_id")]
    pub category_id: u64,
}

fn default_monitor_prefix() -> String {
    "MON".to_string()
}

impl Default for DynamicNamingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            monitor_prefix: default_monitor_prefix(),
            patterns: Vec::new(),
            company_mappings: BTreeMap::new(),
        }
    }
}

/// The three parts of a structured asset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Alphabetic prefix, upper-cased.
    pub prefix: String,
    pub company_digit: String,
    pub asset_number: String,
}

fn re_asset_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z]+)(\d)(\d+)").unwrap())
}

#[derive(Debug, Clone)]
pub struct NamingPatternResolver {
    config: DynamicNamingConfig,
    enabled: bool,
}

impl NamingPatternResolver {
    /// `global_toggle` is `general.dynamicNaming` from config.json.
    pub fn new(config: DynamicNamingConfig, global_toggle: bool) -> Self {
        let enabled = config.enabled && global_toggle;
        log::debug!(
            "Dynamic naming enabled: {} (dynamic_names.json: {}, config.json: {})",
            enabled,
            config.enabled,
            global_toggle
        );
        if enabled {
            for pattern in &config.patterns {
                log::debug!("  {} -> category {}", pattern.prefix, pattern.category_id);
            }
        }
        Self { config, enabled }
    }

    pub fn disabled() -> Self {
        Self::new(DynamicNamingConfig::default(), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Split `name` into prefix, company digit and asset number.
    ///
    /// Only the start of the name has to match, so `LAP1234-OLD` still parses.
    pub fn parse(&self, name: &str) -> Option<ParsedName> {
        if !self.enabled {
            return None;
        }
        let Some(caps) = re_asset_name().captures(name) else {
            log::debug!("Asset name '{}' doesn't match the naming pattern", name);
            return None;
        };
        Some(ParsedName {
            prefix: caps[1].to_uppercase(),
            company_digit: caps[2].to_string(),
            asset_number: caps[3].to_string(),
        })
    }

    pub fn category_id_for(&self, name: &str) -> Option<u64> {
        let parsed = self.parse(name)?;
        let category_id = self
            .config
            .patterns
            .iter()
            .find(|p| p.prefix == parsed.prefix)
            .map(|p| p.category_id);
        if category_id.is_none() {
            log::debug!("No category pattern for prefix {} in '{}'", parsed.prefix, name);
        }
        category_id
    }

    pub fn company_id_for(&self, name: &str) -> Option<u64> {
        let parsed = self.parse(name)?;
        self.config
            .company_mappings
            .get(&parsed.company_digit)
            .copied()
    }

    /// Name a peripheral after its host: `LAP1234` → `MON1234`.
    pub fn generate_dependent_name(&self, host_name: &str) -> Option<String> {
        let parsed = self.parse(host_name)?;
        Some(format!(
            "{}{}{}",
            self.config.monitor_prefix, parsed.company_digit, parsed.asset_number
        ))
    }
}
