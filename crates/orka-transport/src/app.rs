//! HTTP router assembly.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use orka_core::{
    ConsoleFeed,
    traits::{Dialer, SettingsStore},
};
use orka_hub::Hub;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{agent::agent_ws_handler, console::console_ws_handler};

/// Create the hub router.
///
/// Routes:
/// - `/agent?clientName=<name>` - agent websocket
/// - `/console` - operator console websocket
/// - `/health` - liveness and connected client count
///
/// # Example
/// ```ignore
/// let app = hub_router(Arc::new(hub));
/// axum::serve(listener, app).await?;
/// ```
pub fn hub_router<S, D>(hub: Arc<Hub<ConsoleFeed, S, D>>) -> Router
where
    S: SettingsStore + 'static,
    D: Dialer + 'static,
{
    Router::new()
        .route("/agent", get(agent_ws_handler::<ConsoleFeed, S, D>))
        .route("/console", get(console_ws_handler::<S, D>))
        .route("/health", get(health::<S, D>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(hub)
}

async fn health<S, D>(State(hub): State<Arc<Hub<ConsoleFeed, S, D>>>) -> Json<Value>
where
    S: SettingsStore + 'static,
    D: Dialer + 'static,
{
    Json(json!({
        "status": "ok",
        "connected": hub.registry().len(),
    }))
}
