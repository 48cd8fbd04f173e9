//! In-memory stand-in for the Snipe-IT API, for tests.
//!
//! Mimics the parts of Snipe-IT the reconciler depends on: substring search
//! for manufacturers and models, `Asset does not exist.` for unknown serials,
//! id-less create responses and partial PATCH. Every call is counted per
//! collection so tests can assert exactly what was sent.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::{json, Value};

use super::client::{Collection, InventoryApi, SearchEnvelope, SearchQuery, WriteEnvelope};
use crate::error::SyncError;

#[derive(Debug, Clone)]
pub struct RecordedUpdate {
    pub collection: Collection,
    pub id: u64,
    pub payload: Value,
}

#[derive(Default)]
struct State {
    next_id: u64,
    records: HashMap<Collection, Vec<Value>>,
    searches: HashMap<Collection, usize>,
    creates: HashMap<Collection, usize>,
    updates: Vec<RecordedUpdate>,
    search_error: Option<String>,
    term_errors: HashMap<String, String>,
    transport_errors: HashMap<String, String>,
    create_error: Option<String>,
    update_error: Option<String>,
    drop_created: bool,
}

#[derive(Default)]
pub struct FakeInventory {
    state: RefCell<State>,
}

impl FakeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record; returns its id.
    pub fn insert(&self, collection: Collection, mut record: Value) -> u64 {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        if let Value::Object(map) = &mut record {
            map.insert("id".into(), json!(id));
        }
        state.records.entry(collection).or_default().push(record);
        id
    }

    pub fn records(&self, collection: Collection) -> Vec<Value> {
        self.state
            .borrow()
            .records
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn record(&self, collection: Collection, id: u64) -> Option<Value> {
        self.records(collection)
            .into_iter()
            .find(|r| r.get("id").and_then(Value::as_u64) == Some(id))
    }

    pub fn searches(&self, collection: Collection) -> usize {
        *self.state.borrow().searches.get(&collection).unwrap_or(&0)
    }

    pub fn creates(&self, collection: Collection) -> usize {
        *self.state.borrow().creates.get(&collection).unwrap_or(&0)
    }

    pub fn total_creates(&self) -> usize {
        self.state.borrow().creates.values().sum()
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.state.borrow().updates.clone()
    }

    pub fn fail_searches_with(&self, message: &str) {
        self.state.borrow_mut().search_error = Some(message.to_string());
    }

    /// Answer searches for one exact term with an error envelope.
    pub fn fail_searches_for(&self, term: &str, message: &str) {
        self.state
            .borrow_mut()
            .term_errors
            .insert(term.to_string(), message.to_string());
    }

    /// Fail searches for one exact term at the transport level.
    pub fn fail_transport_for(&self, term: &str, message: &str) {
        self.state
            .borrow_mut()
            .transport_errors
            .insert(term.to_string(), message.to_string());
    }

    pub fn reject_creates_with(&self, message: &str) {
        self.state.borrow_mut().create_error = Some(message.to_string());
    }

    pub fn reject_updates_with(&self, message: &str) {
        self.state.borrow_mut().update_error = Some(message.to_string());
    }

    /// Accept creates but never store them, as a misbehaving server would.
    pub fn drop_created_records(&self) {
        self.state.borrow_mut().drop_created = true;
    }
}

/// Rows without the searched field are returned too, which lets tests feed
/// malformed rows to the resolver.
fn field_contains(row: &Value, field: &str, term: &str) -> bool {
    match row.get(field).and_then(Value::as_str) {
        Some(value) => value.to_lowercase().contains(&term.to_lowercase()),
        None => true,
    }
}

fn error_envelope(message: &str) -> SearchEnvelope {
    SearchEnvelope {
        status: Some("error".to_string()),
        messages: Some(json!(message)),
        total: None,
        rows: Vec::new(),
    }
}

impl InventoryApi for FakeInventory {
    fn search(
        &self,
        collection: Collection,
        query: &SearchQuery,
    ) -> Result<SearchEnvelope, SyncError> {
        let mut state = self.state.borrow_mut();
        *state.searches.entry(collection).or_default() += 1;
        if let Some(message) = state.transport_errors.get(&query.term) {
            return Err(SyncError::Transport(message.clone()));
        }
        if let Some(message) = state
            .search_error
            .as_ref()
            .or_else(|| state.term_errors.get(&query.term))
        {
            return Ok(error_envelope(message));
        }

        let records = state.records.get(&collection).cloned().unwrap_or_default();
        let rows: Vec<Value> = match collection {
            Collection::Manufacturers => records
                .into_iter()
                .filter(|r| field_contains(r, "name", &query.term))
                .collect(),
            Collection::Models => records
                .into_iter()
                .filter(|r| field_contains(r, "name", &query.term))
                .filter(|r| match (query.manufacturer_id, r.get("manufacturer_id")) {
                    (Some(wanted), Some(id)) => id.as_u64() == Some(wanted),
                    _ => true,
                })
                .collect(),
            Collection::Hardware => {
                let rows: Vec<Value> = records
                    .into_iter()
                    .filter(|r| r.get("serial").and_then(Value::as_str) == Some(query.term.as_str()))
                    .collect();
                if rows.is_empty() {
                    return Ok(error_envelope("Asset does not exist."));
                }
                rows
            }
        };

        Ok(SearchEnvelope {
            status: None,
            messages: None,
            total: Some(rows.len() as u64),
            rows,
        })
    }

    fn create(&self, collection: Collection, payload: &Value) -> Result<WriteEnvelope, SyncError> {
        let (rejected, drop_created) = {
            let mut state = self.state.borrow_mut();
            *state.creates.entry(collection).or_default() += 1;
            (state.create_error.clone(), state.drop_created)
        };
        if let Some(message) = rejected {
            return Ok(WriteEnvelope {
                status: Some("error".to_string()),
                messages: Some(json!(message)),
                payload: None,
            });
        }
        if !drop_created {
            self.insert(collection, payload.clone());
        }
        Ok(WriteEnvelope {
            status: Some("success".to_string()),
            messages: Some(json!("Created")),
            payload: None,
        })
    }

    fn update(
        &self,
        collection: Collection,
        id: u64,
        payload: &Value,
    ) -> Result<WriteEnvelope, SyncError> {
        let mut state = self.state.borrow_mut();
        state.updates.push(RecordedUpdate {
            collection,
            id,
            payload: payload.clone(),
        });
        if let Some(message) = &state.update_error {
            return Ok(WriteEnvelope {
                status: Some("error".to_string()),
                messages: Some(json!(message)),
                payload: None,
            });
        }

        let record = state
            .records
            .get_mut(&collection)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|r| r.get("id").and_then(Value::as_u64) == Some(id))
            });
        match (record, payload) {
            (Some(Value::Object(existing)), Value::Object(changes)) => {
                for (key, value) in changes {
                    existing.insert(key.clone(), value.clone());
                }
                Ok(WriteEnvelope {
                    status: Some("success".to_string()),
                    messages: Some(json!("Updated")),
                    payload: None,
                })
            }
            _ => Ok(WriteEnvelope {
                status: Some("error".to_string()),
                messages: Some(json!("Record does not exist.")),
                payload: None,
            }),
        }
    }
}
