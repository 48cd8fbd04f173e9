//! One agent run: probe this machine, then reconcile it with Snipe-IT.

use serde::Serialize;

use crate::error::AgentError;
use crate::naming::NamingPatternResolver;
use crate::probe::HardwareProbe;
use crate::reconcile::{AssetSyncResult, MonitorOutcome, ReconciliationEngine};
use crate::snipeit::client::InventoryApi;
use crate::types::Settings;

/// What one run did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub hostname: String,
    /// `None` when asset collection is switched off.
    pub host: Option<AssetSyncResult>,
    pub monitors: Vec<MonitorOutcome>,
}

impl RunReport {
    pub fn failed_monitors(&self) -> usize {
        self.monitors.iter().filter(|m| !m.is_synced()).count()
    }
}

/// Run the agent once. A failed host chain is fatal; failed monitors are
/// reported in the result.
pub fn run<P, A>(settings: &Settings, probe: &P, api: &A) -> Result<RunReport, AgentError>
where
    P: HardwareProbe + ?Sized,
    A: InventoryApi + ?Sized,
{
    let config = &settings.config;
    let naming = NamingPatternResolver::new(
        settings.dynamic_naming.clone(),
        config.general.dynamic_naming,
    );
    let engine = ReconciliationEngine::new(api, config, &naming);

    let mut report = RunReport::default();

    if config.general.asset_collection {
        let facts = probe.host_facts(&settings.custom_fields)?;
        report.hostname = facts.hostname.clone();
        report.host = Some(engine.sync_host(&facts)?);
    } else {
        log::info!("Asset collection disabled");
        report.hostname = probe.hostname()?;
    }

    if config.general.monitor_collection {
        let monitors = probe.monitors(&settings.custom_fields)?;
        report.monitors = engine.sync_monitors(&report.hostname, &monitors)?;
    } else {
        log::debug!("Monitor collection disabled");
    }

    if report.failed_monitors() > 0 {
        log::warn!(
            "{} of {} monitor(s) failed to sync",
            report.failed_monitors(),
            report.monitors.len()
        );
    }
    Ok(report)
}
