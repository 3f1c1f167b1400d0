//! WebSocket handler for consultation chat rooms.
//!
//! `/ws/chat/{consultation_id}` authorizes the caller before upgrading. The
//! token comes from `?token=` (browsers cannot set headers on a WebSocket
//! handshake) or from `Authorization: Bearer`. Rejected callers get a plain
//! HTTP error and never join the room.
//!
//! Once upgraded, a single task multiplexes the connection's outbound queue
//! and inbound socket frames. Disconnecting never changes the consultation's
//! status.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use astroconsult_core::gateway::{ChatConnection, ConnectRejected};
use astroconsult_core::repository::identity::IdentityProvider;
use astroconsult_infra::sqlite::message::SqliteMessageRepository;
use astroconsult_types::consultation::ConsultationId;
use astroconsult_types::frame::ServerFrame;

use crate::http::extractors::auth::bearer_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatSocketQuery {
    pub token: Option<String>,
}

/// Authorize and upgrade a chat socket. Mounted at `/ws/chat/{consultation_id}`.
pub async fn chat_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
    Query(query): Query<ChatSocketQuery>,
    headers: HeaderMap,
) -> Response {
    let Ok(consultation_id) = consultation_id.parse::<ConsultationId>() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| bearer_token(&headers));

    let identity = match token {
        Some(token) => match state.identity.resolve_token(&token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "token lookup failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
        None => None,
    };

    match state.gateway.connect(identity, consultation_id).await {
        Ok((connection, outbox)) => ws.on_upgrade(move |socket| run_chat_socket(socket, connection, outbox)),
        Err(ConnectRejected::Unavailable(e)) => {
            tracing::error!(consultation_id = %consultation_id, error = %e, "chat connect failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(ConnectRejected::Unauthenticated) => StatusCode::UNAUTHORIZED.into_response(),
        Err(ConnectRejected::NotParticipant) => StatusCode::FORBIDDEN.into_response(),
    }
}

/// Pump frames between the socket and an authorized connection until either side closes.
async fn run_chat_socket(
    socket: WebSocket,
    mut connection: ChatConnection<SqliteMessageRepository>,
    mut outbox: mpsc::Receiver<ServerFrame>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    loop {
        tokio::select! {
            frame = outbox.recv() => {
                let Some(frame) = frame else { break };
                match serde_json::to_string(&frame) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Failed to serialize ServerFrame: {err}");
                    }
                }
            }

            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        connection.handle_text(text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    // Binary, ping and pong frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    connection.close();
    tracing::debug!(
        consultation_id = %connection.consultation_id(),
        connection_id = %connection.connection_id(),
        "chat socket closed"
    );
}
