//! Server state shared across handlers.

use std::sync::Arc;

use serde::Deserialize;

use crate::{hub::Hub, quiz::QuizService};

/// Query parameters for the WebSocket endpoint.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub session_id: String,
    pub player_id: String,
}

/// Shared application state.
pub struct AppState {
    pub service: QuizService,
    pub hub: Arc<Hub>,
}
