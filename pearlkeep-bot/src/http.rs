//! HTTP control surface.
//!
//! Thin glue over the same two core calls as the chat surface: count
//! pearls for a player, and trigger. Plus a health probe reporting
//! connectivity.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use pearlkeep_core::error::PearlError;

use crate::state::BotState;
use crate::trigger::TriggerSequencer;
use crate::world::WorldClient;

/// Shared handler context.
pub struct ApiContext<W> {
    /// World collaborator, for connectivity checks.
    pub world: Arc<W>,
    /// Shared bot state.
    pub state: Arc<BotState>,
    /// The trigger sequencer.
    pub sequencer: Arc<TriggerSequencer<W>>,
}

impl<W> Clone for ApiContext<W> {
    fn clone(&self) -> Self {
        Self {
            world: Arc::clone(&self.world),
            state: Arc::clone(&self.state),
            sequencer: Arc::clone(&self.sequencer),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    connected: bool,
    tracked: usize,
    trigger_in_progress: bool,
}

#[derive(Debug, Serialize)]
struct CountResponse {
    player: String,
    pearls: usize,
}

#[derive(Debug, Serialize)]
struct TriggerResponse {
    pearl: String,
    block: String,
    x: i32,
    y: i32,
    z: i32,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Build the control-surface router.
pub fn router<W: WorldClient>(ctx: ApiContext<W>) -> Router {
    Router::new()
        .route("/health", get(health::<W>))
        .route("/pearls/:player", get(count::<W>))
        .route("/trigger/:player", post(trigger::<W>))
        .with_state(ctx)
}

/// Bind and serve the control surface until the process exits.
///
/// # Errors
///
/// Returns an I/O error if the listener cannot bind or the server dies.
pub async fn serve<W: WorldClient>(bind: &str, ctx: ApiContext<W>) -> pearlkeep_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, "http control surface listening");
    axum::serve(listener, router(ctx)).await?;
    Ok(())
}

async fn health<W: WorldClient>(State(ctx): State<ApiContext<W>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        connected: ctx.world.is_connected(),
        tracked: ctx.state.registry().len(),
        trigger_in_progress: ctx.state.trigger_in_progress(),
    })
}

async fn count<W: WorldClient>(
    State(ctx): State<ApiContext<W>>,
    Path(player): Path<String>,
) -> Json<CountResponse> {
    let pearls = ctx.state.registry().count_for_owner(&player);
    Json(CountResponse { player, pearls })
}

async fn trigger<W: WorldClient>(
    State(ctx): State<ApiContext<W>>,
    Path(player): Path<String>,
) -> Response {
    match ctx.sequencer.trigger(&player).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(TriggerResponse {
                pearl: outcome.pearl_id.to_string(),
                block: outcome.block.name,
                x: outcome.block.pos.x,
                y: outcome.block.pos.y,
                z: outcome.block.pos.z,
            }),
        )
            .into_response(),
        Err(err) => {
            let status = match &err {
                PearlError::NotFound(_) => StatusCode::NOT_FOUND,
                PearlError::Busy => StatusCode::CONFLICT,
                PearlError::NoActionBlock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}
