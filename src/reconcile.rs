//! Reconciliation of probed facts against the inventory.
//!
//! Every asset goes through the same chain, strictly in order:
//! manufacturer → model → asset. Ids resolved at one step feed the next, so
//! a failure anywhere in a chain stops that chain. The host chain failing is
//! fatal for the run; each monitor chain is isolated from the others unless
//! the transport itself fails.

use serde::Serialize;

use crate::error::{EntityKind, ErrorKind, SyncError};
use crate::naming::NamingPatternResolver;
use crate::normalize::{is_placeholder_serial, normalize_manufacturer, normalize_model, normalize_serial};
use crate::probe::{HostFacts, MonitorFacts};
use crate::snipeit::client::{Collection, InventoryApi};
use crate::snipeit::entity::{category_patch, row_category_id, AssetSpec, EntitySpec, ManufacturerSpec, ModelSpec};
use crate::snipeit::resolver::EntityResolver;
use crate::types::{CollectedFields, Config};

const UNKNOWN: &str = "Unknown";

/// Ids and names resolved for one asset chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSyncResult {
    pub manufacturer_id: u64,
    pub manufacturer_name: String,
    pub model_id: u64,
    pub model_name: String,
    pub model_number: String,
    pub asset_id: u64,
    pub serial: String,
    pub asset_name: String,
    /// The asset record was created in this run.
    pub created: bool,
    /// An existing asset got its fields refreshed.
    pub refreshed: bool,
}

/// Result of one monitor chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MonitorOutcome {
    Synced(AssetSyncResult),
    Failed {
        serial: String,
        model: String,
        error: String,
    },
}

impl MonitorOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, MonitorOutcome::Synced(_))
    }
}

/// Everything one chain needs, after normalization and naming overrides.
struct AssetChain<'f> {
    kind: EntityKind,
    manufacturer: String,
    model: String,
    model_number: String,
    category_id: u64,
    fieldset_id: u64,
    serial: String,
    name: String,
    company_override: Option<u64>,
    custom_fields: &'f CollectedFields,
}

pub struct ReconciliationEngine<'a, A: InventoryApi + ?Sized> {
    resolver: EntityResolver<'a, A>,
    config: &'a Config,
    naming: &'a NamingPatternResolver,
}

impl<'a, A: InventoryApi + ?Sized> ReconciliationEngine<'a, A> {
    pub fn new(api: &'a A, config: &'a Config, naming: &'a NamingPatternResolver) -> Self {
        Self {
            resolver: EntityResolver::new(api),
            config,
            naming,
        }
    }

    /// Reconcile the host machine itself.
    pub fn sync_host(&self, facts: &HostFacts) -> Result<AssetSyncResult, SyncError> {
        let manufacturer = normalize_manufacturer(&facts.manufacturer);
        let (model_number, model) = normalize_model(&manufacturer, &facts.model, &facts.model_number);
        let serial = normalize_serial(&manufacturer, &facts.serial, &facts.hostname);

        let category_id = self
            .naming
            .category_id_for(&facts.hostname)
            .unwrap_or(self.config.defaults.category_id);

        log::info!(
            "Syncing host {} ({} {}, serial {})",
            facts.hostname,
            manufacturer,
            model,
            serial
        );
        self.sync_chain(AssetChain {
            kind: EntityKind::Hardware,
            manufacturer,
            model,
            model_number,
            category_id,
            fieldset_id: self.config.defaults.fieldset_id,
            serial,
            name: facts.hostname.clone(),
            company_override: self.naming.company_id_for(&facts.hostname),
            custom_fields: &facts.custom_fields,
        })
    }

    /// Reconcile detected monitors. Unusable ones are skipped; the result has
    /// one entry per monitor that passed the filter.
    ///
    /// A monitor whose chain fails is reported and the next one is tried,
    /// except on a transport failure, which ends the run.
    pub fn sync_monitors(
        &self,
        host_name: &str,
        monitors: &[MonitorFacts],
    ) -> Result<Vec<MonitorOutcome>, SyncError> {
        let usable: Vec<&MonitorFacts> = monitors
            .iter()
            .filter(|m| {
                let keep = is_usable_monitor(m);
                if !keep {
                    log::info!(
                        "Skipping monitor '{}' with serial '{}': no usable identity",
                        m.model,
                        m.serial
                    );
                }
                keep
            })
            .collect();
        log::info!("Syncing {} of {} detected monitor(s)", usable.len(), monitors.len());

        let dependent_name = self.naming.generate_dependent_name(host_name);
        let company_override = self.naming.company_id_for(host_name);
        let category_id = dependent_name
            .as_deref()
            .and_then(|name| self.naming.category_id_for(name))
            .unwrap_or(self.config.defaults.monitor_category_id);

        usable
            .into_iter()
            .map(|monitor| {
                let manufacturer = normalize_manufacturer(&monitor.manufacturer);
                let name = dependent_name
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", manufacturer, monitor.model));
                let chain = AssetChain {
                    kind: EntityKind::Monitor,
                    manufacturer,
                    model: monitor.model.clone(),
                    model_number: monitor.model.clone(),
                    category_id,
                    fieldset_id: self.config.defaults.monitor_fieldset_id,
                    serial: monitor.serial.clone(),
                    name,
                    company_override,
                    custom_fields: &monitor.custom_fields,
                };
                match self.sync_chain(chain) {
                    Ok(result) => Ok(MonitorOutcome::Synced(result)),
                    Err(e) if e.kind() == ErrorKind::TransportFailure => Err(e),
                    Err(e) => {
                        log::error!("Monitor {} failed: {}", monitor.serial, e);
                        Ok(MonitorOutcome::Failed {
                            serial: monitor.serial.clone(),
                            model: monitor.model.clone(),
                            error: e.to_string(),
                        })
                    }
                }
            })
            .collect()
    }

    fn sync_chain(&self, chain: AssetChain<'_>) -> Result<AssetSyncResult, SyncError> {
        let manufacturer = self.resolver.resolve(&EntitySpec::Manufacturer(ManufacturerSpec {
            name: chain.manufacturer.clone(),
        }))?;
        let manufacturer_id = manufacturer.id();
        log::debug!("Manufacturer '{}' -> {}", chain.manufacturer, manufacturer_id);

        let model_id = self.resolve_model(&chain, manufacturer_id)?;
        log::debug!("Model '{}' -> {}", chain.model, model_id);

        let asset = AssetSpec {
            kind: chain.kind,
            serial: chain.serial.clone(),
            name: chain.name.clone(),
            model_id,
            status_id: self.config.defaults.status_id,
            company_id: chain
                .company_override
                .unwrap_or(self.config.defaults.company_id),
            asset_tag: self
                .config
                .general
                .asset_tag_generation
                .then(|| chain.serial.clone()),
            custom_fields: chain.custom_fields.clone(),
        };
        let resolved = self.resolver.resolve(&EntitySpec::Asset(asset.clone()))?;

        // A fresh asset already carries the collected fields from its create payload
        let refreshed = if resolved.created {
            log::info!("Created {} '{}' ({})", chain.kind, chain.name, chain.serial);
            false
        } else {
            match self.resolver.update(
                chain.kind,
                Collection::Hardware,
                resolved.id(),
                &asset.refresh_payload(chain.company_override),
            ) {
                Ok(()) => {
                    log::info!("Updated {} '{}' ({})", chain.kind, chain.name, chain.serial);
                    true
                }
                Err(e) => {
                    log::warn!("{}; keeping existing record", e);
                    false
                }
            }
        };

        Ok(AssetSyncResult {
            manufacturer_id,
            manufacturer_name: chain.manufacturer,
            model_id,
            model_name: chain.model,
            model_number: chain.model_number,
            asset_id: resolved.id(),
            serial: chain.serial,
            asset_name: chain.name,
            created: resolved.created,
            refreshed,
        })
    }

    /// Resolve the model and move it to the desired category if it sits in
    /// another one. Only `category_id` is patched.
    fn resolve_model(&self, chain: &AssetChain<'_>, manufacturer_id: u64) -> Result<u64, SyncError> {
        let resolved = self.resolver.resolve(&EntitySpec::Model(ModelSpec {
            name: chain.model.clone(),
            model_number: chain.model_number.clone(),
            manufacturer_id,
            category_id: chain.category_id,
            fieldset_id: chain.fieldset_id,
        }))?;
        if resolved.created {
            return Ok(resolved.id());
        }

        match row_category_id(&resolved.record.row) {
            Some(current) if current != chain.category_id => {
                log::info!(
                    "Moving model '{}' from category {} to {}",
                    chain.model,
                    current,
                    chain.category_id
                );
                self.resolver.update(
                    EntityKind::Model,
                    Collection::Models,
                    resolved.id(),
                    &category_patch(chain.category_id),
                )?;
            }
            Some(_) => {}
            None => log::debug!("Model '{}' row has no category, leaving it", chain.model),
        }
        Ok(resolved.id())
    }
}

/// A monitor is only worth syncing with a real serial and a known model.
fn is_usable_monitor(monitor: &MonitorFacts) -> bool {
    let serial = monitor.serial.trim();
    let model = monitor.model.trim();
    !(is_placeholder_serial(serial)
        || serial == "0"
        || serial == UNKNOWN
        || serial.chars().count() < 2
        || model.is_empty()
        || model == UNKNOWN)
}
