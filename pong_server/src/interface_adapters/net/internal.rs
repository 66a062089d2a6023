// Read-only HTTP routes served next to the WebSocket endpoint.

use crate::interface_adapters::protocol::SessionStatusDto;
use crate::interface_adapters::state::AppState;

use axum::{Json, extract::State};
use std::sync::Arc;

/// `GET /session`: the status most recently published by the session loop.
pub async fn session_status_handler(State(state): State<Arc<AppState>>) -> Json<SessionStatusDto> {
    Json(state.session.status().into())
}
