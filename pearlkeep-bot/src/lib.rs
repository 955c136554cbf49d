//! # pearlkeep-bot — World Integration for Pearlkeep
//!
//! This crate wires the game-agnostic `pearlkeep-core` tracker to a live
//! game client and exposes the control surfaces.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 game client                   │
//! │   events ─▶ EntityWatcher ─┐                  │
//! │   snapshot ─▶ Reconciler ──┼─▶ pearlkeep-core │
//! │   navigation ◀─ TriggerSequencer ◀─┐          │
//! │                                    │          │
//! │   chat ◀─ CommandHandler ──────────┤          │
//! │   HTTP ◀─ http::router ────────────┘          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `world` — the collaborator contract the game client must satisfy
//! - `events` — world notifications consumed by the watcher
//! - `watcher` — spawn/move/removed handling, attribution, promotion
//! - `reconcile` — periodic safety-net pass against the live entity set
//! - `trigger` — best-effort approach-and-interact sequencer
//! - `commands` / `http` — thin control surfaces over the core calls
//! - `notify` — best-effort failure webhook
//! - `service` — assembly

pub mod commands;
pub mod events;
pub mod http;
pub mod notify;
pub mod reconcile;
pub mod service;
pub mod state;
pub mod trigger;
pub mod watcher;
pub mod world;

pub use events::WorldEvent;
pub use service::{HealthStatus, PearlBot};
pub use state::BotState;
pub use trigger::{TriggerOutcome, TriggerSequencer};
pub use watcher::EntityWatcher;
pub use world::WorldClient;
