//! Configuration for the pearlkeep system.
//!
//! Maps directly to `pearlkeep.toml`. Every field has a serde default so a
//! partial file (or none at all) yields the documented tuning.

use serde::{Deserialize, Serialize};

/// Top-level pearlkeep configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PearlkeepConfig {
    /// Motion stability and reconciliation tuning.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Owner attribution scoring.
    #[serde(default)]
    pub attribution: AttributionConfig,
    /// Trigger sequencer behavior.
    #[serde(default)]
    pub trigger: TriggerConfig,
    /// Durable state-file settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Control surfaces (chat, HTTP, notifications).
    #[serde(default)]
    pub control: ControlConfig,
}

impl PearlkeepConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `PearlError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::PearlError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Stability tracking, promotion, and reconciliation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Minimum record age before a pearl may be promoted (prevents
    /// promoting mid-throw).
    #[serde(default = "default_2500")]
    pub min_age_ms: u64,
    /// Continuous stability window required for promotion, measured from
    /// the most recent disqualifying motion sample.
    #[serde(default = "default_600")]
    pub settle_ms: u64,
    /// Per-sample displacement above which the sample disqualifies
    /// stability (blocks).
    #[serde(default = "default_displacement_epsilon")]
    pub displacement_epsilon: f64,
    /// Instantaneous speed above which the sample disqualifies stability
    /// (blocks per second).
    #[serde(default = "default_speed_epsilon")]
    pub speed_epsilon: f64,
    /// Delay before the one-shot attribution re-score after spawn.
    #[serde(default = "default_250")]
    pub rescore_delay_ms: u64,
    /// Reconciliation loop period.
    #[serde(default = "default_1000")]
    pub reconcile_interval_ms: u64,
    /// How long a record's entity may be absent from live snapshots before
    /// the record is deleted. Absorbs chunk-unload flapping.
    #[serde(default = "default_5000")]
    pub missing_grace_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_age_ms: 2500,
            settle_ms: 600,
            displacement_epsilon: 0.05,
            speed_epsilon: 0.1,
            rescore_delay_ms: 250,
            reconcile_interval_ms: 1000,
            missing_grace_ms: 5000,
        }
    }
}

/// Owner attribution scoring weights and candidate filters.
///
/// Score = `recency_weight`·recency + `facing_weight`·facing +
/// `closeness_weight`·closeness, over players within `radius` that swung
/// inside `swing_window_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionConfig {
    /// Candidate radius around the pearl (blocks).
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// How recent a swing must be for a player to qualify as a candidate.
    #[serde(default = "default_2000")]
    pub swing_window_ms: u64,
    /// Weight of the swing-recency factor.
    #[serde(default = "default_4_0")]
    pub recency_weight: f64,
    /// Weight of the facing-alignment factor.
    #[serde(default = "default_1_5")]
    pub facing_weight: f64,
    /// Weight of the inverse-distance factor.
    #[serde(default = "default_1_0")]
    pub closeness_weight: f64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            radius: 14.0,
            swing_window_ms: 2000,
            recency_weight: 4.0,
            facing_weight: 1.5,
            closeness_weight: 1.0,
        }
    }
}

/// Trigger sequencer behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Half-edge of the cube searched for an action block, centered on the
    /// pearl's snapped coordinate.
    #[serde(default = "default_3")]
    pub search_radius: i32,
    /// Approach range passed to the navigation primitive (blocks).
    #[serde(default = "default_2_0")]
    pub approach_range: f64,
    /// Timeout for the full-3D approach attempt.
    #[serde(default = "default_8000")]
    pub nav_timeout_ms: u64,
    /// Timeout for the degraded horizontal-only approach attempt.
    #[serde(default = "default_4000")]
    pub horizontal_nav_timeout_ms: u64,
    /// Simulation steps to wait before and after the interact action.
    #[serde(default = "default_4")]
    pub interact_delay_ticks: u32,
    /// Vertical offset added to the block center when orienting.
    #[serde(default = "default_0_5")]
    pub look_height_offset: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            search_radius: 3,
            approach_range: 2.0,
            nav_timeout_ms: 8000,
            horizontal_nav_timeout_ms: 4000,
            interact_delay_ticks: 4,
            look_height_offset: 0.5,
        }
    }
}

/// Durable state-file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Quiet period for coalescing rapid successive mutations into a
    /// single durable write.
    #[serde(default = "default_150")]
    pub debounce_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { debounce_ms: 150 }
    }
}

/// Control surfaces: HTTP bind address, chat prefix, failure webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Bind address for the HTTP control surface.
    #[serde(default = "default_http_bind")]
    pub http_bind: String,
    /// Optional webhook URL for best-effort trigger-failure alerts.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Chat command prefix.
    #[serde(default = "default_prefix")]
    pub command_prefix: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            http_bind: "127.0.0.1:8130".to_string(),
            webhook_url: None,
            command_prefix: "!".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_http_bind() -> String { "127.0.0.1:8130".to_string() }
fn default_prefix() -> String { "!".to_string() }
fn default_displacement_epsilon() -> f64 { 0.05 }
fn default_speed_epsilon() -> f64 { 0.1 }
fn default_radius() -> f64 { 14.0 }
fn default_0_5() -> f64 { 0.5 }
fn default_1_0() -> f64 { 1.0 }
fn default_1_5() -> f64 { 1.5 }
fn default_2_0() -> f64 { 2.0 }
fn default_4_0() -> f64 { 4.0 }
fn default_3() -> i32 { 3 }
fn default_4() -> u32 { 4 }
fn default_150() -> u64 { 150 }
fn default_250() -> u64 { 250 }
fn default_600() -> u64 { 600 }
fn default_1000() -> u64 { 1000 }
fn default_2000() -> u64 { 2000 }
fn default_2500() -> u64 { 2500 }
fn default_4000() -> u64 { 4000 }
fn default_5000() -> u64 { 5000 }
fn default_8000() -> u64 { 8000 }
