//! Live ledger over WebSocket.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::auth::{extract_token, user_from_token, AdminUser};
use super::error::ApiError;
use crate::db::Role;
use crate::error::AuthError;
use crate::ledger::LedgerUpdate;
use crate::AppState;

pub const LEDGER_EVENT: &str = "updateLedger";

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

/// Frame pushed to observers
#[derive(Debug, Serialize)]
pub struct LedgerEvent {
    pub event: &'static str,
    pub data: LedgerUpdate,
}

impl From<LedgerUpdate> for LedgerEvent {
    fn from(data: LedgerUpdate) -> Self {
        Self {
            event: LEDGER_EVENT,
            data,
        }
    }
}

/// GET /ws/ledger?token=
///
/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// come in the query string; the session cookie works too.
pub async fn ledger_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| extract_token(&headers))
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let user = user_from_token(&state, &token).await?;
    if user.role() != Role::Admin {
        return Err(AuthError::Forbidden.into());
    }

    tracing::debug!(user_id = %user.id, "Ledger observer connected");
    Ok(ws.on_upgrade(move |socket| stream_ledger(socket, state)))
}

async fn send_update(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    update: LedgerUpdate,
) -> bool {
    let frame = match serde_json::to_string(&LedgerEvent::from(update)) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode ledger update");
            return true;
        }
    };
    sender.send(Message::Text(frame)).await.is_ok()
}

async fn stream_ledger(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so nothing committed in between is lost
    let mut updates = state.ledger.subscribe();

    match state.ledger.snapshot().await {
        Ok(snapshot) => {
            if !send_update(&mut sender, snapshot).await {
                return;
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to load ledger snapshot"),
    }

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Ok(update) => {
                        if !send_update(&mut sender, update).await {
                            return;
                        }
                    }
                    // Totals are absolute; skipping to the newest one loses nothing
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Ledger observer lagged");
                    }
                    Err(RecvError::Closed) => return,
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        tracing::debug!("Ledger observer disconnected");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// GET /api/admin/ledger
pub async fn ledger_snapshot(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<LedgerUpdate>, ApiError> {
    Ok(Json(state.ledger.snapshot().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_frame() {
        let frame = serde_json::to_value(LedgerEvent::from(LedgerUpdate {
            bank_balance: 499.0,
            expected_cash: 0.0,
        }))
        .unwrap();
        assert_eq!(
            frame,
            serde_json::json!({
                "event": "updateLedger",
                "data": { "bankBalance": 499.0, "expectedCash": 0.0 }
            })
        );
    }
}
