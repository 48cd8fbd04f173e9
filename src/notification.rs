//! Failure notification via Slack incoming webhook
//!
//! Only fatal run errors are reported. Delivery problems are logged and never
//! change the outcome of the run.

use std::error::Error;
use std::time::Duration;

use serde_json::{json, Value};

const USERNAME: &str = "ITAgent";
const ICON_EMOJI: &str = ":rotating_light:";

pub struct SlackNotifier {
    webhook: String,
    client: reqwest::blocking::Client,
}

impl SlackNotifier {
    pub fn new(webhook: &str) -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            webhook: webhook.to_string(),
            client,
        })
    }

    /// Post a message to the webhook
    pub fn send(&self, message: &str) -> Result<(), String> {
        let response = self
            .client
            .post(&self.webhook)
            .json(&payload(message))
            .send()
            .map_err(|e| format!("Failed to send Slack message: {}", e))?;
        if !response.status().is_success() {
            return Err(format!("Slack webhook returned {}", response.status()));
        }
        Ok(())
    }

    /// Send, logging instead of failing
    pub fn notify(&self, message: &str) {
        match self.send(message) {
            Ok(()) => log::debug!("Failure report sent to Slack"),
            Err(e) => log::warn!("{}", e),
        }
    }
}

fn payload(message: &str) -> Value {
    json!({
        "text": message,
        "username": USERNAME,
        "icon_emoji": ICON_EMOJI,
    })
}

/// Format a failed run for the channel, with the full error chain.
pub fn failure_message(error: &dyn Error, hostname: &str, user: &str, version: &str) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(&format!("\ncaused by: {}", cause));
        source = cause.source();
    }
    format!(
        "*ITAgent {} failed on {}*\nUser: {}\n```{}```",
        version, hostname, user, chain
    )
}
