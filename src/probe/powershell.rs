//! WMI queries through `powershell.exe -Command`.

use std::process::Command;

use super::monitors::{collect_monitor_fields, detect, DETECT_MONITORS_SCRIPT};
use super::{HardwareProbe, HostFacts, MonitorFacts, ProbeError};
use crate::normalize::format_number;
use crate::types::{CollectedFields, CustomFieldsConfig};

const HOSTNAME: &str = "(Get-WmiObject Win32_OperatingSystem).CSName";
const MANUFACTURER: &str = "(gwmi win32_computersystem).manufacturer";
const MODEL: &str = "(Get-WmiObject -Class:Win32_ComputerSystem).Model";
const MODEL_NUMBER: &str = "(gwmi win32_baseboard).product";
const BIOS_SERIAL: &str = "(gwmi win32_bios).serialnumber";
const CHASSIS_TYPES: &str = "(Get-WmiObject -Class Win32_SystemEnclosure).ChassisTypes";

const MAC_ADDRESS: &str = "(Get-WmiObject Win32_NetworkAdapterConfiguration | Where-Object {$_.IPEnabled -eq $true} | Select-Object -First 1).MACAddress";
const DISK_TOTAL_GB: &str = r#"$total=0
(Get-WmiObject -Class Win32_DiskDrive | Where-Object { $_.MediaType -eq 'Fixed hard disk media' }).Size | ForEach-Object { $total=$total+$_/1gb }
[Math]::Round($total, 2)"#;
const DISK_INFO: &str = r#"(Get-WmiObject -Class Win32_DiskDrive | Where-Object { $_.MediaType -eq 'Fixed hard disk media' }) | ForEach-Object {
    "$($_.MediaType) - $($_.Model) - $($_.SerialNumber) - $([Math]::Round($_.Size/1gb,2)) GB"
}"#;
const DISK_USED_GB: &str = r#"$d = Get-WmiObject Win32_LogicalDisk -Filter "DeviceID='C:'"
[Math]::Round(($d.Size - $d.FreeSpace) / 1GB, 2)"#;

/// Runs one PowerShell snippet and returns its trimmed stdout.
pub trait CommandRunner {
    fn run(&self, script: &str) -> Result<String, ProbeError>;
}

/// The real `powershell.exe`, without a console window on Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct PowerShell;

impl CommandRunner for PowerShell {
    fn run(&self, script: &str) -> Result<String, ProbeError> {
        let mut cmd = Command::new("powershell.exe");
        cmd.args(["-NoProfile", "-NonInteractive", "-Command", script]);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let output = cmd
            .output()
            .map_err(|e| ProbeError::SpawnFailed(e.to_string()))?;
        if !output.status.success() {
            log::debug!(
                "PowerShell exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

pub struct PowerShellProbe<R: CommandRunner = PowerShell> {
    runner: R,
}

impl PowerShellProbe<PowerShell> {
    pub fn new() -> Self {
        Self { runner: PowerShell }
    }
}

impl Default for PowerShellProbe<PowerShell> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> PowerShellProbe<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    fn collect_host_fields(&self, fields: &CustomFieldsConfig) -> Result<CollectedFields, ProbeError> {
        let mut collected = CollectedFields::new();

        for (collector, spec) in &fields.enabled_static_fields {
            if !spec.enabled {
                continue;
            }
            let value = match collector.as_str() {
                "mac_address" => self.runner.run(MAC_ADDRESS)?,
                "total_storage" => format_number(&self.runner.run(DISK_TOTAL_GB)?),
                "storage_information" => self.runner.run(DISK_INFO)?,
                "disk_space_used" => format_number(&self.runner.run(DISK_USED_GB)?),
                "agent_version" | "pyitagent_version" => env!("CARGO_PKG_VERSION").to_string(),
                other => {
                    log::warn!("Unknown static field collector '{}', skipping", other);
                    continue;
                }
            };
            collected.insert(spec.field_name.clone(), value);
        }

        for (field_id, spec) in &fields.custom_fields {
            if !spec.enabled {
                continue;
            }
            let mut value = self.runner.run(&spec.source_command)?;
            if spec.is_numeric {
                value = format_number(&value);
            }
            collected.insert(field_id.clone(), value);
        }

        Ok(collected)
    }
}

impl<R: CommandRunner> HardwareProbe for PowerShellProbe<R> {
    fn hostname(&self) -> Result<String, ProbeError> {
        self.runner.run(HOSTNAME)
    }

    fn host_facts(&self, fields: &CustomFieldsConfig) -> Result<HostFacts, ProbeError> {
        Ok(HostFacts {
            hostname: self.hostname()?,
            manufacturer: self.runner.run(MANUFACTURER)?,
            model: self.runner.run(MODEL)?,
            model_number: self.runner.run(MODEL_NUMBER)?,
            serial: self.runner.run(BIOS_SERIAL)?,
            custom_fields: self.collect_host_fields(fields)?,
        })
    }

    fn monitors(&self, fields: &CustomFieldsConfig) -> Result<Vec<MonitorFacts>, ProbeError> {
        let chassis = self.runner.run(CHASSIS_TYPES)?;
        let raw = self.runner.run(DETECT_MONITORS_SCRIPT)?;
        let detected = detect(&raw, &chassis)?;
        if detected.is_empty() {
            log::info!("No external monitors detected");
        }

        let monitor_fields = &fields.monitor_fields.custom_fields;
        detected
            .into_iter()
            .map(|monitor| {
                let custom_fields =
                    collect_monitor_fields(&monitor, monitor_fields, |cmd| self.runner.run(cmd))?;
                Ok(MonitorFacts {
                    manufacturer: monitor.manufacturer,
                    model: monitor.model,
                    serial: monitor.serial_number,
                    custom_fields,
                })
            })
            .collect()
    }
}
