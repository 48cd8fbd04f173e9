//! Entity variants and their Snipe-IT payloads.
//!
//! Each variant carries exactly the attributes its create payload needs and
//! knows its identity key: name for manufacturers and models, serial for
//! assets.

use serde_json::{json, Map, Value};

use super::client::{Collection, SearchQuery};
use crate::error::{EntityKind, SyncError};
use crate::types::CollectedFields;

#[derive(Debug, Clone, PartialEq)]
pub struct ManufacturerSpec {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub model_number: String,
    pub manufacturer_id: u64,
    pub category_id: u64,
    pub fieldset_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetSpec {
    /// `Hardware` for the host, `Monitor` for peripherals. Both live in the
    /// hardware collection.
    pub kind: EntityKind,
    pub serial: String,
    pub name: String,
    pub model_id: u64,
    pub status_id: u64,
    pub company_id: u64,
    /// `None` leaves the tag to Snipe-IT.
    pub asset_tag: Option<String>,
    pub custom_fields: CollectedFields,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntitySpec {
    Manufacturer(ManufacturerSpec),
    Model(ModelSpec),
    Asset(AssetSpec),
}

impl EntitySpec {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntitySpec::Manufacturer(_) => EntityKind::Manufacturer,
            EntitySpec::Model(_) => EntityKind::Model,
            EntitySpec::Asset(a) => a.kind,
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            EntitySpec::Manufacturer(_) => Collection::Manufacturers,
            EntitySpec::Model(_) => Collection::Models,
            EntitySpec::Asset(_) => Collection::Hardware,
        }
    }

    pub fn identity_key(&self) -> &str {
        match self {
            EntitySpec::Manufacturer(m) => &m.name,
            EntitySpec::Model(m) => &m.name,
            EntitySpec::Asset(a) => &a.serial,
        }
    }

    pub fn search_query(&self) -> SearchQuery {
        match self {
            EntitySpec::Model(m) => SearchQuery {
                term: m.name.clone(),
                manufacturer_id: Some(m.manufacturer_id),
            },
            other => SearchQuery::term(other.identity_key()),
        }
    }

    /// Whether a search row is this entity. Search is substring-based, so an
    /// exact, case-sensitive comparison on the identity key is required.
    ///
    /// Models also have to belong to the same manufacturer when the row says
    /// which manufacturer it belongs to.
    pub fn matches(&self, row: &Value) -> Result<bool, SyncError> {
        let kind = self.kind();
        match self {
            EntitySpec::Manufacturer(m) => Ok(required_str(row, "name", kind)? == m.name),
            EntitySpec::Model(m) => {
                if required_str(row, "name", kind)? != m.name {
                    return Ok(false);
                }
                Ok(match nested_id(row, "manufacturer") {
                    Some(id) => id == m.manufacturer_id,
                    None => true,
                })
            }
            EntitySpec::Asset(a) => Ok(required_str(row, "serial", kind)? == a.serial),
        }
    }

    pub fn create_payload(&self) -> Value {
        match self {
            EntitySpec::Manufacturer(m) => json!({ "name": m.name }),
            EntitySpec::Model(m) => json!({
                "name": m.name,
                "model_number": m.model_number,
                "category_id": m.category_id,
                "manufacturer_id": m.manufacturer_id,
                "fieldset_id": m.fieldset_id,
            }),
            EntitySpec::Asset(a) => {
                let mut payload = Map::new();
                payload.insert("serial".into(), json!(a.serial));
                payload.insert("name".into(), json!(a.name));
                if let Some(tag) = &a.asset_tag {
                    payload.insert("asset_tag".into(), json!(tag));
                }
                payload.insert("model_id".into(), json!(a.model_id));
                payload.insert("status_id".into(), json!(a.status_id));
                payload.insert("company_id".into(), json!(a.company_id));
                merge_custom_fields(&mut payload, &a.custom_fields);
                Value::Object(payload)
            }
        }
    }
}

impl AssetSpec {
    /// Refresh payload for an asset that already exists: display name, model
    /// and collected fields. Identity (serial) and asset tag are left alone;
    /// company is only sent when it came from dynamic naming.
    pub fn refresh_payload(&self, company_override: Option<u64>) -> Value {
        let mut payload = Map::new();
        payload.insert("name".into(), json!(self.name));
        payload.insert("model_id".into(), json!(self.model_id));
        if let Some(company_id) = company_override {
            payload.insert("company_id".into(), json!(company_id));
        }
        merge_custom_fields(&mut payload, &self.custom_fields);
        Value::Object(payload)
    }
}

/// Payload for a category-only model correction.
pub fn category_patch(category_id: u64) -> Value {
    json!({ "category_id": category_id })
}

fn merge_custom_fields(payload: &mut Map<String, Value>, fields: &CollectedFields) {
    for (field, value) in fields {
        payload.insert(field.clone(), json!(value));
    }
}

/// Read the record id from a search row.
pub fn row_id(row: &Value, kind: EntityKind) -> Result<u64, SyncError> {
    row.get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| SyncError::DataShape {
            entity: kind,
            detail: format!("row has no numeric 'id': {}", row),
        })
}

/// Current category of a model row, from `category: {id}` or `category_id`.
pub fn row_category_id(row: &Value) -> Option<u64> {
    nested_id(row, "category")
}

fn required_str<'a>(row: &'a Value, field: &str, kind: EntityKind) -> Result<&'a str, SyncError> {
    row.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::DataShape {
            entity: kind,
            detail: format!("row has no '{}': {}", field, row),
        })
}

/// Snipe-IT nests related records (`"category": {"id": 3, "name": ...}`);
/// flat `<name>_id` fields are accepted too.
fn nested_id(row: &Value, relation: &str) -> Option<u64> {
    row.get(relation)
        .and_then(|r| r.get("id"))
        .and_then(Value::as_u64)
        .or_else(|| row.get(format!("{}_id", relation)).and_then(Value::as_u64))
}
