//! Best-effort outbound failure notifications.
//!
//! Trigger failures are worth telling someone about (the owner is usually
//! waiting on the teleport), but delivery must never affect the sequence
//! outcome: errors here are logged and swallowed.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

/// Posts trigger-failure alerts to an optional webhook.
#[derive(Debug, Clone)]
pub struct FailureNotifier {
    webhook: Option<String>,
    http: reqwest::Client,
}

impl FailureNotifier {
    /// Notifier posting to `webhook` when configured.
    #[must_use]
    pub fn new(webhook: Option<String>) -> Self {
        Self {
            webhook,
            http: reqwest::Client::new(),
        }
    }

    /// Notifier that never sends anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Report a failed trigger attempt. Best-effort; never fails.
    pub async fn trigger_failed(&self, player: &str, reason: &str) {
        let Some(url) = &self.webhook else {
            return;
        };
        let body = json!({
            "event": "trigger_failed",
            "player": player,
            "reason": reason,
        });
        let result = self
            .http
            .post(url)
            .json(&body)
            .timeout(Duration::from_secs(5))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                debug!(player, "failure notification delivered");
            }
            Ok(response) => {
                warn!(player, status = %response.status(), "failure notification rejected");
            }
            Err(err) => {
                warn!(player, %err, "failure notification not delivered");
            }
        }
    }
}
