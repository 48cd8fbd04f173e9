//! Get-or-create-or-update against the inventory.
//!
//! State machine per entity:
//!
//! ```text
//! lookup ─┬─ found ───────────────────────────────→ resolved
//!         └─ not found → create → lookup ─┬─ found → resolved (created)
//!                                         └─ not found → failed
//! ```
//!
//! Creation is a two-step protocol: the create endpoint does not return the
//! new id, so a successful create is always followed by exactly one more
//! lookup. Any remote error, failed create or malformed row fails the entity.

use serde_json::Value;

use super::client::{Collection, InventoryApi};
use super::entity::{row_id, EntitySpec};
use crate::error::{EntityKind, SyncError};

/// Error messages that mean "no such record" rather than a real failure.
/// Snipe-IT answers `hardware/byserial/<unknown>` with `Asset does not exist.`
const NOT_FOUND_SENTINELS: &[&str] = &["does not exist"];

/// A remote record that matched an entity exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    pub id: u64,
    pub row: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(RemoteRecord),
    NotFound,
}

/// Outcome of [`EntityResolver::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub record: RemoteRecord,
    /// True when this run created the record.
    pub created: bool,
}

impl Resolved {
    pub fn id(&self) -> u64 {
        self.record.id
    }
}

pub struct EntityResolver<'a, A: InventoryApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: InventoryApi + ?Sized> EntityResolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Search for the entity and pick the row whose identity key matches exactly.
    pub fn lookup(&self, entity: &EntitySpec) -> Result<Lookup, SyncError> {
        let kind = entity.kind();
        let envelope = self.api.search(entity.collection(), &entity.search_query())?;

        if envelope.is_error() {
            let message = envelope.message_text();
            if is_not_found_message(&message) {
                log::debug!("{} '{}' not found: {}", kind, entity.identity_key(), message);
                return Ok(Lookup::NotFound);
            }
            return Err(SyncError::Remote {
                entity: kind,
                key: entity.identity_key().to_string(),
                message,
            });
        }

        if envelope.total.unwrap_or(0) == 0 {
            return Ok(Lookup::NotFound);
        }

        for row in &envelope.rows {
            if entity.matches(row)? {
                let id = row_id(row, kind)?;
                return Ok(Lookup::Found(RemoteRecord {
                    id,
                    row: row.clone(),
                }));
            }
        }
        log::debug!(
            "{} search for '{}' returned {} row(s), none exact",
            kind,
            entity.identity_key(),
            envelope.rows.len()
        );
        Ok(Lookup::NotFound)
    }

    /// POST the entity's create payload. Success carries no id.
    pub fn create(&self, entity: &EntitySpec) -> Result<(), SyncError> {
        let response = self
            .api
            .create(entity.collection(), &entity.create_payload())?;
        if !response.is_success() {
            return Err(SyncError::CreationFailed {
                entity: entity.kind(),
                key: entity.identity_key().to_string(),
                message: response.message_text(),
            });
        }
        Ok(())
    }

    /// Look the entity up, creating it first if it does not exist yet.
    pub fn resolve(&self, entity: &EntitySpec) -> Result<Resolved, SyncError> {
        if let Lookup::Found(record) = self.lookup(entity)? {
            return Ok(Resolved {
                record,
                created: false,
            });
        }

        log::info!("Creating new {} '{}'", entity.kind(), entity.identity_key());
        self.create(entity)?;

        match self.lookup(entity)? {
            Lookup::Found(record) => Ok(Resolved {
                record,
                created: true,
            }),
            Lookup::NotFound => Err(SyncError::MissingAfterCreate {
                entity: entity.kind(),
                key: entity.identity_key().to_string(),
            }),
        }
    }

    /// PATCH a partial payload onto an existing record. Fields not in the
    /// payload are left untouched by the remote.
    pub fn update(
        &self,
        kind: EntityKind,
        collection: Collection,
        id: u64,
        payload: &Value,
    ) -> Result<(), SyncError> {
        let response = self.api.update(collection, id, payload)?;
        if !response.is_success() {
            return Err(SyncError::UpdateFailed {
                entity: kind,
                id,
                message: response.message_text(),
            });
        }
        Ok(())
    }
}

fn is_not_found_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    NOT_FOUND_SENTINELS.iter().any(|s| lower.contains(s))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::snipeit::entity::{ManufacturerSpec, ModelSpec};
    use crate::snipeit::fake::FakeInventory;

    fn manufacturer(name: &str) -> EntitySpec {
        EntitySpec::Manufacturer(ManufacturerSpec {
            name: name.to_string(),
        })
    }

    #[test]
    fn test_found_among_fuzzy_rows() {
        let fake = FakeInventory::new();
        fake.insert(Collection::Manufacturers, json!({"name": "HP Inc."}));
        let hp = fake.insert(Collection::Manufacturers, json!({"name": "HP"}));

        let resolver = EntityResolver::new(&fake);
        match resolver.lookup(&manufacturer("HP")).unwrap() {
            Lookup::Found(record) => assert_eq!(record.id, hp),
            Lookup::NotFound => panic!("expected exact match"),
        }
    }

    #[test]
    fn test_substring_only_is_not_found() {
        let fake = FakeInventory::new();
        fake.insert(Collection::Manufacturers, json!({"name": "HP Inc."}));
        let resolver = EntityResolver::new(&fake);
        assert_eq!(resolver.lookup(&manufacturer("HP")).unwrap(), Lookup::NotFound);
    }

    #[test]
    fn test_create_then_single_relookup() {
        let fake = FakeInventory::new();
        let resolver = EntityResolver::new(&fake);

        let resolved = resolver.resolve(&manufacturer("Lenovo")).unwrap();
        assert!(resolved.created);
        assert_eq!(fake.creates(Collection::Manufacturers), 1);
        assert_eq!(fake.searches(Collection::Manufacturers), 2);

        let again = resolver.resolve(&manufacturer("Lenovo")).unwrap();
        assert!(!again.created);
        assert_eq!(again.id(), resolved.id());
        assert_eq!(fake.creates(Collection::Manufacturers), 1);
    }

    #[test]
    fn test_not_found_sentinel_degrades() {
        let fake = FakeInventory::new();
        let resolver = EntityResolver::new(&fake);
        let spec = EntitySpec::Asset(crate::snipeit::entity::AssetSpec {
            kind: EntityKind::Hardware,
            serial: "NEW123".to_string(),
            name: "HOST1".to_string(),
            model_id: 1,
            status_id: 2,
            company_id: 1,
            asset_tag: None,
            custom_fields: Default::default(),
        });
        // The fake answers unknown serials with an "Asset does not exist." error envelope
        assert_eq!(resolver.lookup(&spec).unwrap(), Lookup::NotFound);
    }

    #[test]
    fn test_other_remote_error_fails() {
        let fake = FakeInventory::new();
        fake.fail_searches_with("Unauthorized.");
        let resolver = EntityResolver::new(&fake);
        let err = resolver.resolve(&manufacturer("HP")).unwrap_err();
        assert!(matches!(err, SyncError::Remote { entity: EntityKind::Manufacturer, .. }));
        assert_eq!(fake.creates(Collection::Manufacturers), 0);
    }

    #[test]
    fn test_rejected_create_fails() {
        let fake = FakeInventory::new();
        fake.reject_creates_with("The name field is required.");
        let resolver = EntityResolver::new(&fake);
        let err = resolver.resolve(&manufacturer("HP")).unwrap_err();
        match err {
            SyncError::CreationFailed { message, .. } => {
                assert_eq!(message, "The name field is required.")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_create_not_visible_afterwards() {
        let fake = FakeInventory::new();
        fake.drop_created_records();
        let resolver = EntityResolver::new(&fake);
        let err = resolver.resolve(&manufacturer("HP")).unwrap_err();
        assert!(matches!(err, SyncError::MissingAfterCreate { .. }));
    }

    #[test]
    fn test_malformed_row_is_data_shape() {
        let fake = FakeInventory::new();
        fake.insert(Collection::Models, json!({"model_number": "X1"}));
        let resolver = EntityResolver::new(&fake);
        let spec = EntitySpec::Model(ModelSpec {
            name: "X1".to_string(),
            model_number: "X1".to_string(),
            manufacturer_id: 1,
            category_id: 3,
            fieldset_id: 1,
        });
        let err = resolver.lookup(&spec).unwrap_err();
        assert!(matches!(err, SyncError::DataShape { .. }));
    }

    #[test]
    fn test_update_failure() {
        let fake = FakeInventory::new();
        let id = fake.insert(Collection::Models, json!({"name": "X1", "category_id": 3}));
        fake.reject_updates_with("Category not found");
        let resolver = EntityResolver::new(&fake);
        let err = resolver
            .update(EntityKind::Model, Collection::Models, id, &json!({"category_id": 99}))
            .unwrap_err();
        assert!(matches!(err, SyncError::UpdateFailed { id: failed, .. } if failed == id));
    }
}
