//! Durable state file for the pearlkeep system.
//!
//! One JSON document holds the account profile plus the pearl-id →
//! record mapping. The file is loaded exactly once at process start
//! (its absence is fatal, not recoverable) and written atomically:
//! temporary file in the same directory, then rename, so a crash
//! mid-write never corrupts the durable copy.
//!
//! Writes are debounced: rapid successive mutations coalesce into a
//! single write per quiet period, bounding write amplification under
//! bursty entity updates. A failed write is logged and dropped; the
//! in-memory registry stays authoritative until the next successful one.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{PearlError, Result};
use crate::types::{PearlId, PearlRecord};

/// Connection identity stored alongside the pearl records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Account username the bot plays as.
    pub username: String,
    /// Server host.
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    25565
}

/// The complete durable document: account/config plus tracked pearls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    /// Account identity.
    pub account: AccountProfile,
    /// Pearl-id → record mapping.
    #[serde(default)]
    pub pearls: HashMap<PearlId, PearlRecord>,
}

/// Handle to the durable state file on disk.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store for the file at `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the durable file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state document.
    ///
    /// # Errors
    ///
    /// [`PearlError::MissingStateFile`] when the file does not exist (a
    /// fatal startup condition), [`PearlError::Serialization`] when it
    /// cannot be parsed.
    pub fn load(&self) -> Result<StateDocument> {
        if !self.path.exists() {
            return Err(PearlError::MissingStateFile(self.path.clone()));
        }
        let content = std::fs::read_to_string(&self.path)?;
        let doc: StateDocument = serde_json::from_str(&content)
            .map_err(|e| PearlError::Serialization(e.to_string()))?;
        info!(
            path = %self.path.display(),
            pearls = doc.pearls.len(),
            "state file loaded"
        );
        Ok(doc)
    }

    /// Write the state document atomically: serialize into a temporary
    /// file in the target directory, then rename over the final path.
    ///
    /// # Errors
    ///
    /// [`PearlError::Serialization`] on encoding failure, [`PearlError::Io`]
    /// on filesystem failures.
    pub fn save(&self, doc: &StateDocument) -> Result<()> {
        let json = serde_json::to_vec_pretty(doc)
            .map_err(|e| PearlError::Serialization(e.to_string()))?;

        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| PearlError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            pearls = doc.pearls.len(),
            bytes = json.len(),
            "state file written"
        );
        Ok(())
    }
}

/// Sender half of the debounced writer task.
#[derive(Debug, Clone)]
pub struct SaveHandle {
    tx: mpsc::UnboundedSender<StateDocument>,
}

impl SaveHandle {
    /// Submit the latest document snapshot for durable write.
    ///
    /// Rapid successive submissions coalesce; only the most recent
    /// snapshot inside a quiet period reaches disk.
    pub fn submit(&self, doc: StateDocument) {
        if self.tx.send(doc).is_err() {
            warn!("state saver task is gone; dropping snapshot");
        }
    }
}

/// Spawn the debounced writer task and return its handle.
///
/// The task writes the newest submitted snapshot once `debounce` elapses
/// with no fresher submission, and flushes any pending snapshot when the
/// last [`SaveHandle`] is dropped.
#[must_use]
pub fn spawn_debounced_saver(store: StateStore, debounce: Duration) -> SaveHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<StateDocument>();
    tokio::spawn(async move {
        while let Some(mut doc) = rx.recv().await {
            loop {
                tokio::select! {
                    () = tokio::time::sleep(debounce) => break,
                    next = rx.recv() => match next {
                        Some(fresher) => doc = fresher,
                        None => break,
                    },
                }
            }
            if let Err(err) = store.save(&doc) {
                warn!(%err, "state write failed; in-memory registry remains authoritative");
            }
        }
    });
    SaveHandle { tx }
}
