//! HTTP and WebSocket request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    domain::WsMessage,
    hub::HubError,
    quiz::{JoinQuizRequest, JoinQuizResponse, QuizError, SubmitAnswerRequest},
    ws::WsUpgrade,
};

use super::state::{AppState, ConnectQuery};

impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let status = match &self {
            QuizError::QuizNotFound
            | QuizError::SessionNotFound
            | QuizError::QuestionNotFound => StatusCode::NOT_FOUND,
            QuizError::AlreadyAnswered => StatusCode::CONFLICT,
            QuizError::Hub(HubError::PlayerAlreadyConnected) => StatusCode::CONFLICT,
            QuizError::Hub(HubError::PlayerNotAuthorized) => StatusCode::FORBIDDEN,
            QuizError::Hub(HubError::RoomNotFound | HubError::PlayerNotConnected) => {
                StatusCode::NOT_FOUND
            }
            QuizError::Hub(_) | QuizError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

pub async fn join_quiz_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JoinQuizRequest>,
) -> Result<Json<JoinQuizResponse>, QuizError> {
    let joined = state.service.join_quiz(req).await?;
    tracing::info!(
        session_id = %joined.session_id,
        player_id = %joined.player_id,
        "player joined quiz"
    );
    Ok(Json(joined))
}

pub async fn submit_answer_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<StatusCode, QuizError> {
    state.service.submit_answer(req).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upgrade an authorized player's connection and wire it into the hub.
///
/// Authorization happens before the 101 is returned, so an invalid session or
/// player is rejected with a plain HTTP error rather than a doomed upgrade.
/// The room greeting and the connect broadcast are sent from the spawned task
/// once the client is attached.
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    ws: WsUpgrade,
) -> Result<Response, QuizError> {
    let session = state
        .service
        .validate_player_session(&query.session_id, &query.player_id)
        .await?;

    if !state
        .hub
        .is_player_authorized(&query.session_id, &query.player_id)
        .await
    {
        return Err(QuizError::Hub(HubError::PlayerNotAuthorized));
    }

    let username = session
        .players
        .iter()
        .find(|p| p.id == query.player_id)
        .map(|p| p.username.clone())
        .unwrap_or_default();

    let (response, fut) = ws.upgrade();

    let hub = state.hub.clone();
    tokio::spawn(async move {
        let connection = match fut.into_connection().await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(error = %e, "websocket upgrade failed");
                return;
            }
        };

        if let Err(e) = hub
            .attach(
                query.session_id.clone(),
                query.player_id.clone(),
                connection,
            )
            .await
        {
            tracing::warn!(
                session_id = %query.session_id,
                player_id = %query.player_id,
                error = %e,
                "failed to attach websocket client"
            );
            return;
        }
        tracing::info!(
            session_id = %query.session_id,
            player_id = %query.player_id,
            "websocket client connected"
        );

        let greeting = WsMessage::new(
            "room_joined",
            json!({
                "session_id": query.session_id,
                "player_id": query.player_id,
            }),
        );
        if let Err(e) = hub
            .send_to_player(&query.session_id, &query.player_id, &greeting)
            .await
        {
            tracing::warn!(error = %e, "failed to send room greeting");
        }

        let connected = WsMessage::new(
            "player_connected",
            json!({
                "player_id": query.player_id,
                "username": username,
            }),
        );
        if let Err(e) = hub.broadcast_to_room(&query.session_id, &connected).await {
            tracing::warn!(error = %e, "failed to broadcast player_connected");
        }
    });

    Ok(response)
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
