//! Blocking REST client for the Snipe-IT API.
//!
//! Uses reqwest's blocking client with Bearer token auth. All paths are
//! relative to the configured `site` (e.g. `https://snipe.example/api/v1`).

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::ServerConfig;
use crate::error::SyncError;

/// Page size for model searches. Search is fuzzy, so the exact match may not
/// be the first row.
const MODEL_SEARCH_LIMIT: u32 = 50;

/// Remote collections the agent reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Manufacturers,
    Models,
    Hardware,
}

impl Collection {
    pub fn path(self) -> &'static str {
        match self {
            Collection::Manufacturers => "manufacturers",
            Collection::Models => "models",
            Collection::Hardware => "hardware",
        }
    }
}

/// Search filter. `term` is matched as a name (manufacturers, models) or a
/// serial (hardware); `manufacturer_id` narrows model searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub manufacturer_id: Option<u64>,
}

impl SearchQuery {
    pub fn term(term: &str) -> Self {
        Self {
            term: term.to_string(),
            manufacturer_id: None,
        }
    }
}

/// `{status, messages, total, rows}` as returned by list/search endpoints.
/// Successful searches usually omit `status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub messages: Option<Value>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub rows: Vec<Value>,
}

impl SearchEnvelope {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    pub fn message_text(&self) -> String {
        message_text(self.messages.as_ref())
    }
}

/// `{status, messages, payload}` as returned by create/update endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub messages: Option<Value>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl WriteEnvelope {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    pub fn message_text(&self) -> String {
        message_text(self.messages.as_ref())
    }
}

/// Render `messages`, which is a string for simple errors and a
/// field → [errors] object for validation failures.
pub fn message_text(messages: Option<&Value>) -> String {
    match messages {
        None | Some(Value::Null) => "Unknown error".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(field, errors)| match errors {
                Value::Array(list) => {
                    let joined: Vec<String> = list
                        .iter()
                        .map(|e| e.as_str().map(String::from).unwrap_or_else(|| e.to_string()))
                        .collect();
                    format!("{}: {}", field, joined.join(", "))
                }
                Value::String(s) => format!("{}: {}", field, s),
                other => format!("{}: {}", field, other),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
    }
}

/// The three operations the reconciler needs from the inventory.
///
/// `create` does not return the new record's id; callers look it up again.
pub trait InventoryApi {
    fn search(&self, collection: Collection, query: &SearchQuery)
        -> Result<SearchEnvelope, SyncError>;

    fn create(&self, collection: Collection, payload: &Value) -> Result<WriteEnvelope, SyncError>;

    fn update(
        &self,
        collection: Collection,
        id: u64,
        payload: &Value,
    ) -> Result<WriteEnvelope, SyncError>;
}

pub struct SnipeItClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SnipeItClient {
    pub fn new(config: &ServerConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.site.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// `hardware/byserial/<serial>`, with the serial as one encoded path
    /// segment. Serials occasionally contain `/`, `#` or spaces.
    fn serial_url(&self, serial: &str) -> Result<Url, SyncError> {
        let mut url = Url::parse(&self.url("hardware/byserial"))
            .map_err(|e| SyncError::Transport(format!("Invalid Snipe-IT URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Transport(format!("Invalid Snipe-IT URL: {}", self.base_url)))?
            .push(serial);
        Ok(url)
    }

    fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SyncError> {
        let resp = request
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| SyncError::Transport(format!("Snipe-IT request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            // Some Snipe-IT versions send "does not exist" envelopes with a 404
            if status == reqwest::StatusCode::NOT_FOUND {
                if let Ok(envelope) = serde_json::from_str::<T>(&text) {
                    return Ok(envelope);
                }
            }
            return Err(SyncError::Transport(format!(
                "Snipe-IT API error {}: {}",
                status, text
            )));
        }

        resp.json()
            .map_err(|e| SyncError::Transport(format!("Failed to parse Snipe-IT response: {}", e)))
    }
}

impl InventoryApi for SnipeItClient {
    fn search(
        &self,
        collection: Collection,
        query: &SearchQuery,
    ) -> Result<SearchEnvelope, SyncError> {
        let request = match collection {
            Collection::Manufacturers => self
                .client
                .get(self.url(collection.path()))
                .query(&[("name", query.term.as_str())]),
            Collection::Models => {
                let mut params = vec![
                    ("search", query.term.clone()),
                    ("limit", MODEL_SEARCH_LIMIT.to_string()),
                    ("sort", "name".to_string()),
                    ("order", "asc".to_string()),
                ];
                if let Some(id) = query.manufacturer_id {
                    params.push(("manufacturer_id", id.to_string()));
                }
                self.client.get(self.url(collection.path())).query(&params)
            }
            Collection::Hardware => self
                .client
                .get(self.serial_url(&query.term)?)
                .query(&[("deleted", "false")]),
        };
        log::debug!("Searching {} for '{}'", collection.path(), query.term);
        self.send(request)
    }

    fn create(&self, collection: Collection, payload: &Value) -> Result<WriteEnvelope, SyncError> {
        log::debug!("POST {} {}", collection.path(), payload);
        self.send(self.client.post(self.url(collection.path())).json(payload))
    }

    fn update(
        &self,
        collection: Collection,
        id: u64,
        payload: &Value,
    ) -> Result<WriteEnvelope, SyncError> {
        log::debug!("PATCH {}/{} {}", collection.path(), id, payload);
        self.send(
            self.client
                .patch(self.url(&format!("{}/{}", collection.path(), id)))
                .json(payload),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_shapes() {
        assert_eq!(message_text(None), "Unknown error");
        assert_eq!(
            message_text(Some(&serde_json::json!("Asset does not exist."))),
            "Asset does not exist."
        );
        let validation = serde_json::json!({
            "category_id": ["The category id field is required."],
            "name": ["The name has already been taken."]
        });
        assert_eq!(
            message_text(Some(&validation)),
            "category_id: The category id field is required.; name: The name has already been taken."
        );
    }

    #[test]
    fn test_envelope_parsing() {
        let search: SearchEnvelope = serde_json::from_str(
            r#"{"total": 1, "rows": [{"id": 7, "name": "HP"}]}"#,
        )
        .unwrap();
        assert!(!search.is_error());
        assert_eq!(search.total, Some(1));

        let err: SearchEnvelope = serde_json::from_str(
            r#"{"status": "error", "messages": "Asset does not exist.", "payload": null}"#,
        )
        .unwrap();
        assert!(err.is_error());
        assert!(err.rows.is_empty());

        let write: WriteEnvelope =
            serde_json::from_str(r#"{"status": "success", "messages": "Created", "payload": {}}"#)
                .unwrap();
        assert!(write.is_success());
    }

    #[test]
    fn test_serial_url_encodes_one_segment() {
        let client = SnipeItClient::new(&ServerConfig {
            site: "https://snipe.example/api/v1".to_string(),
            api_key: "token".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            client.serial_url("5CG1234XYZ").unwrap().as_str(),
            "https://snipe.example/api/v1/hardware/byserial/5CG1234XYZ"
        );
        assert_eq!(
            client.serial_url("AB 12/3#4").unwrap().as_str(),
            "https://snipe.example/api/v1/hardware/byserial/AB%2012%2F3%234"
        );
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = SnipeItClient::new(&ServerConfig {
            site: "https://snipe.example/api/v1/".to_string(),
            api_key: "token".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.url("models"), "https://snipe.example/api/v1/models");
    }
}
