//! Service assembly: wires the state file, registry, watcher,
//! reconciliation loop, trigger sequencer, and control surfaces into one
//! handle the host process drives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use pearlkeep_core::classify::PearlClassifier;
use pearlkeep_core::config::PearlkeepConfig;
use pearlkeep_core::error::Result;
use pearlkeep_core::persistence::{spawn_debounced_saver, StateStore};
use pearlkeep_core::registry::PearlRegistry;
use pearlkeep_core::types::PearlStatus;

use crate::commands::CommandHandler;
use crate::events::WorldEvent;
use crate::http::{self, ApiContext};
use crate::notify::FailureNotifier;
use crate::reconcile::Reconciler;
use crate::state::BotState;
use crate::trigger::{TriggerOutcome, TriggerSequencer};
use crate::watcher::EntityWatcher;
use crate::world::WorldClient;

/// Connectivity/status snapshot for the control surfaces.
#[derive(Debug, Clone, Copy)]
pub struct HealthStatus {
    /// Whether the world client holds a live connection.
    pub connected: bool,
    /// Number of tracked records.
    pub tracked: usize,
    /// Whether a trigger sequence currently owns the controls.
    pub trigger_in_progress: bool,
}

/// The assembled bot service.
pub struct PearlBot<W: WorldClient> {
    world: Arc<W>,
    /// Shared state, exposed for background behaviors that must check the
    /// trigger gate.
    pub state: Arc<BotState>,
    watcher: EntityWatcher<W>,
    sequencer: Arc<TriggerSequencer<W>>,
}

impl<W: WorldClient> PearlBot<W> {
    /// Load the state file and assemble the service.
    ///
    /// Must be called within a tokio runtime (the debounced saver task is
    /// spawned here). The durable file is a precondition: a missing file
    /// is fatal, not recoverable.
    ///
    /// # Errors
    ///
    /// [`pearlkeep_core::PearlError::MissingStateFile`] when the state
    /// file does not exist, or a serialization error when it is corrupt.
    pub fn start(
        world: Arc<W>,
        config: PearlkeepConfig,
        state_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let store = StateStore::new(state_path);
        let mut document = store.load()?;

        // Entity ids do not survive a session; whatever links the file
        // carries are stale. Airborne records can no longer be tracked and
        // downgrade to unknown, which the reconciliation grace pass prunes.
        let mut downgraded = 0usize;
        for record in document.pearls.values_mut() {
            record.entity_id = None;
            if record.status == PearlStatus::Airborne {
                record.status = PearlStatus::Unknown;
                downgraded += 1;
            }
        }
        if downgraded > 0 {
            info!(downgraded, "in-flight records from previous session downgraded");
        }

        let registry = PearlRegistry::from_records(document.pearls);
        info!(tracked = registry.len(), "registry restored");

        let saver = spawn_debounced_saver(
            store,
            Duration::from_millis(config.persistence.debounce_ms),
        );
        let state = Arc::new(BotState::new(config, document.account, registry, saver));

        let watcher = EntityWatcher::new(
            Arc::clone(&world),
            Arc::clone(&state),
            Arc::new(PearlClassifier::default()),
        );
        let notifier = FailureNotifier::new(state.config.control.webhook_url.clone());
        let sequencer = Arc::new(TriggerSequencer::new(
            Arc::clone(&world),
            Arc::clone(&state),
            notifier,
        ));

        Ok(Self {
            world,
            state,
            watcher,
            sequencer,
        })
    }

    /// Scan already-loaded entities once. Call after connecting.
    pub fn startup_scan(&self) {
        self.watcher.startup_scan(Utc::now());
    }

    /// Spawn the reconciliation loop.
    pub fn spawn_reconciler(&self) -> tokio::task::JoinHandle<()> {
        let reconciler = Reconciler::new(
            self.watcher.clone(),
            Arc::clone(&self.world),
            Arc::clone(&self.state),
        );
        let period = Duration::from_millis(self.state.config.tracking.reconcile_interval_ms);
        tokio::spawn(reconciler.run(period))
    }

    /// Spawn the HTTP control surface on the configured bind address.
    pub fn spawn_http(&self) -> tokio::task::JoinHandle<()> {
        let bind = self.state.config.control.http_bind.clone();
        let ctx = self.api_context();
        tokio::spawn(async move {
            if let Err(err) = http::serve(&bind, ctx).await {
                error!(%err, "http control surface stopped");
            }
        })
    }

    /// Feed one world event into the watcher.
    pub async fn handle_event(&self, event: WorldEvent) {
        self.watcher.handle_event(event, Utc::now()).await;
    }

    /// Trigger the nearest settled pearl for `player`.
    ///
    /// # Errors
    ///
    /// See [`TriggerSequencer::trigger`].
    pub async fn trigger(&self, player: &str) -> Result<TriggerOutcome> {
        self.sequencer.trigger(player).await
    }

    /// Count settled pearls owned by `player`.
    #[must_use]
    pub fn count_pearls(&self, player: &str) -> usize {
        self.state.registry().count_for_owner(player)
    }

    /// Connectivity/status snapshot.
    #[must_use]
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            connected: self.world.is_connected(),
            tracked: self.state.registry().len(),
            trigger_in_progress: self.state.trigger_in_progress(),
        }
    }

    /// Chat command handler bound to this service.
    #[must_use]
    pub fn command_handler(&self) -> CommandHandler<W> {
        CommandHandler::new(
            Arc::clone(&self.world),
            Arc::clone(&self.state),
            Arc::clone(&self.sequencer),
        )
    }

    /// HTTP handler context bound to this service.
    #[must_use]
    pub fn api_context(&self) -> ApiContext<W> {
        ApiContext {
            world: Arc::clone(&self.world),
            state: Arc::clone(&self.state),
            sequencer: Arc::clone(&self.sequencer),
        }
    }
}
