//! Monitor detection from `root\wmi` EDID data.
//!
//! One PowerShell script dumps every `WmiMonitorID` with its size and
//! connection type as JSON; everything after that (vendor code mapping,
//! laptop panel filtering, serial fallback) happens here so it can be tested
//! without Windows.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::ProbeError;
use crate::normalize::format_number;
use crate::types::{CollectedFieldSpec, CollectedFields};

pub const UNKNOWN: &str = "Unknown";

pub const DETECT_MONITORS_SCRIPT: &str = r#"$ErrorActionPreference = 'SilentlyContinue'
function Decode($codes) {
    if ($null -eq $codes -or $codes.Length -eq 0) { return 'Unknown' }
    $text = [System.Text.Encoding]::ASCII.GetString([byte[]]($codes -ne 0)).Trim()
    if ($text) { $text } else { 'Unknown' }
}
$ids = Get-WmiObject -Namespace root\wmi -Class WmiMonitorID
$params = Get-WmiObject -Namespace root\wmi -Class WmiMonitorBasicDisplayParams
$conns = Get-WmiObject -Namespace root\wmi -Class WmiMonitorConnectionParams
$result = foreach ($id in $ids) {
    $p = $params | Where-Object { $_.InstanceName -eq $id.InstanceName } | Select-Object -First 1
    $c = $conns | Where-Object { $_.InstanceName -eq $id.InstanceName } | Select-Object -First 1
    $w = if ($p) { [int]$p.MaxHorizontalImageSize } else { 0 }
    $h = if ($p) { [int]$p.MaxVerticalImageSize } else { 0 }
    [PSCustomObject]@{
        InstanceName = $id.InstanceName
        Manufacturer = Decode $id.ManufacturerName
        Model = Decode $id.UserFriendlyName
        ProductCode = Decode $id.ProductCodeID
        SerialNumber = Decode $id.SerialNumberID
        YearOfManufacture = $id.YearOfManufacture
        WeekOfManufacture = $id.WeekOfManufacture
        ScreenWidth = $w
        ScreenHeight = $h
        ScreenSizeInches = if ($w -gt 0 -and $h -gt 0) { [Math]::Round([Math]::Sqrt($w * $w + $h * $h) / 2.54, 1) } else { 'Unknown' }
        ConnectionType = if ($c) { $c.VideoOutputTechnology } else { -1 }
    }
}
ConvertTo-Json -InputObject @($result) -Compress"#;

/// Win32_SystemEnclosure chassis types for portables.
const LAPTOP_CHASSIS_TYPES: &[u32] = &[8, 9, 10, 11, 12, 14, 18, 21, 30, 31, 32];

/// Vendors that mostly ship built-in laptop panels.
const PANEL_VENDORS: &[&str] = &[
    "LG Electronics",
    "AUO Corporation",
    "BOE",
    "Innolux",
    "Sharp",
    "Chi Mei",
];

/// `VideoOutputTechnology` values for internal connections.
const INTERNAL_CONNECTIONS: &[i64] = &[0, 0x8000_0000];

/// EDID PNP vendor codes.
fn vendor_name(code: &str) -> &str {
    match code {
        "DEL" => "Dell Inc.",
        "AUO" => "AUO Corporation",
        "ACI" => "ASUS",
        "ACR" => "Acer",
        "HPN" | "HWP" => "HP",
        "LEN" => "Lenovo",
        "SAM" | "SEC" => "Samsung",
        "LGD" => "LG Electronics",
        "PHL" => "Philips",
        "SNY" => "Sony",
        "MSI" => "MSI",
        "BNQ" => "BenQ",
        "AOC" => "AOC",
        "NEC" => "NEC",
        "VSC" => "ViewSonic",
        other => other,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMonitor {
    #[serde(default)]
    instance_name: Option<String>,
    #[serde(default)]
    manufacturer: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    product_code: Option<String>,
    #[serde(default)]
    serial_number: Option<String>,
    #[serde(default)]
    year_of_manufacture: Option<Value>,
    #[serde(default)]
    week_of_manufacture: Option<Value>,
    #[serde(default)]
    screen_width: Option<Value>,
    #[serde(default)]
    screen_height: Option<Value>,
    #[serde(default)]
    screen_size_inches: Option<Value>,
    #[serde(default)]
    connection_type: Option<Value>,
}

/// A monitor after vendor mapping and serial cleanup.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedMonitor {
    pub instance_name: Option<String>,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub screen_size_inches: Option<f64>,
    /// Visible image size in centimetres.
    pub width_cm: u64,
    pub height_cm: u64,
    pub year_of_manufacture: Option<u64>,
    pub week_of_manufacture: Option<u64>,
    connection_type: Option<i64>,
}

fn as_u64(value: &Option<Value>) -> Option<u64> {
    value.as_ref().and_then(Value::as_u64).filter(|v| *v > 0)
}

fn known(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => UNKNOWN.to_string(),
    }
}

impl From<RawMonitor> for DetectedMonitor {
    fn from(raw: RawMonitor) -> Self {
        let manufacturer = vendor_name(&known(raw.manufacturer)).to_string();
        let mut model = known(raw.model);
        if model == UNKNOWN {
            model = known(raw.product_code);
        }
        DetectedMonitor {
            instance_name: raw.instance_name,
            manufacturer,
            model,
            serial_number: known(raw.serial_number),
            screen_size_inches: raw
                .screen_size_inches
                .as_ref()
                .and_then(Value::as_f64)
                .filter(|s| *s > 0.0),
            width_cm: as_u64(&raw.screen_width).unwrap_or(0),
            height_cm: as_u64(&raw.screen_height).unwrap_or(0),
            year_of_manufacture: as_u64(&raw.year_of_manufacture),
            week_of_manufacture: as_u64(&raw.week_of_manufacture),
            connection_type: raw.connection_type.as_ref().and_then(Value::as_i64),
        }
    }
}

impl DetectedMonitor {
    fn looks_internal(&self) -> bool {
        let model = self.model.to_lowercase();
        ["internal", "built-in", "panel"]
            .iter()
            .any(|hint| model.contains(hint))
            || self
                .connection_type
                .is_some_and(|c| INTERNAL_CONNECTIONS.contains(&c))
            || PANEL_VENDORS.contains(&self.manufacturer.as_str())
    }
}

/// Parse the detection script output. PowerShell emits a bare object for a
/// single monitor and nothing at all when WMI has no monitors.
fn parse_raw(raw: &str) -> Result<Vec<RawMonitor>, ProbeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ProbeError::ParseError(format!("{}: {}", e, raw)))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| ProbeError::ParseError(e.to_string())))
        .collect()
}

pub fn is_laptop(chassis_types: &str) -> bool {
    chassis_types
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|t| t.parse::<u32>().ok())
        .any(|t| LAPTOP_CHASSIS_TYPES.contains(&t))
}

/// Stable stand-in serial for monitors whose EDID has none.
pub fn pseudo_serial(monitor: &DetectedMonitor) -> String {
    let seed = format!(
        "{}-{}-{}x{}",
        monitor.manufacturer, monitor.model, monitor.width_cm, monitor.height_cm
    );
    let digest = hex::encode_upper(Sha256::digest(seed.as_bytes()));
    format!("GEN-{}", &digest[..10])
}

/// Turn the detection script output into monitors worth reporting.
///
/// Output that is not monitor JSON is logged and treated as no monitors.
pub fn detect(raw: &str, chassis_types: &str) -> Result<Vec<DetectedMonitor>, ProbeError> {
    let laptop = is_laptop(chassis_types);
    if laptop {
        log::debug!("System detected as laptop/notebook");
    }

    let mut monitors = Vec::new();
    let raw_monitors = match parse_raw(raw) {
        Ok(raw_monitors) => raw_monitors,
        Err(e) => {
            log::warn!("{}; continuing without monitors", e);
            return Ok(Vec::new());
        }
    };

    for raw_monitor in raw_monitors {
        let mut monitor = DetectedMonitor::from(raw_monitor);

        if laptop && monitor.looks_internal() {
            log::info!(
                "Skipping likely built-in display: {} {}",
                monitor.manufacturer,
                monitor.model
            );
            continue;
        }

        if monitor.model == UNKNOWN {
            if let Some(size) = monitor.screen_size_inches {
                monitor.model = format!("{}\" Display Monitor", size);
            }
        }

        let serial = monitor.serial_number.as_str();
        if serial == "0" || serial.chars().count() < 2 {
            monitor.serial_number = if monitor.model != UNKNOWN {
                pseudo_serial(&monitor)
            } else {
                UNKNOWN.to_string()
            };
        }

        monitors.push(monitor);
    }
    Ok(monitors)
}

/// Month from an EDID week number.
fn manufacture_month(week: u64) -> u64 {
    ((week as f64 / 4.33) as u64).clamp(1, 12)
}

/// Collect the monitor custom fields for one monitor.
///
/// Fields named "Screen Size", "Manufacture Date" or containing "dimension"
/// are filled from EDID data; everything else runs its command, narrowed to
/// this monitor's WMI instance when the command selects the first instance.
pub fn collect_monitor_fields<F>(
    monitor: &DetectedMonitor,
    fields: &BTreeMap<String, CollectedFieldSpec>,
    run: F,
) -> Result<CollectedFields, ProbeError>
where
    F: Fn(&str) -> Result<String, ProbeError>,
{
    let mut collected = CollectedFields::new();
    for (field_id, spec) in fields {
        if !spec.enabled {
            continue;
        }
        let name = spec.display_name.to_lowercase();

        if name == "manufacture date" {
            if let Some(year) = monitor.year_of_manufacture {
                let month = manufacture_month(monitor.week_of_manufacture.unwrap_or(1));
                collected.insert(field_id.clone(), format!("{}-{:02}", year, month));
                continue;
            }
        }
        if name.contains("dimension") && monitor.width_cm > 0 && monitor.height_cm > 0 {
            collected.insert(
                field_id.clone(),
                format!("{}x{} mm", monitor.width_cm * 10, monitor.height_cm * 10),
            );
            continue;
        }

        let value = match (name.as_str(), monitor.screen_size_inches) {
            ("screen size", Some(size)) => size.to_string(),
            _ => {
                let command = match &monitor.instance_name {
                    Some(instance) => spec.source_command.replace(
                        "Select-Object -First 1",
                        &format!(
                            "Where-Object {{ $_.InstanceName -eq '{}' }}",
                            instance.replace('\'', "''")
                        ),
                    ),
                    None => spec.source_command.clone(),
                };
                run(&command)?
            }
        };
        let value = if spec.is_numeric {
            format_number(&value)
        } else {
            value
        };
        collected.insert(field_id.clone(), value);
    }
    Ok(collected)
}
