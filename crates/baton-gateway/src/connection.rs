//! WebSocket connection lifecycle — join, read loop, cleanup.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use baton_core::error::BatonError;
use baton_core::protocol::ClientFrame;

use crate::broadcast::outbound_channel;
use crate::session_task::SessionHandle;

/// Handle a participant's WebSocket for its whole lifetime.
///
/// This task is the only reader of the socket. Any receive error or close
/// frame ends the participant's membership; a reconnect joins afresh.
pub async fn handle_ws_connection(session: SessionHandle, ws: WebSocket) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    // Outbound queue for this participant, fed by the session task
    let (event_tx, mut event_rx) = outbound_channel();

    let participant = match session.join(event_tx).await {
        Ok(participant) => participant,
        Err(e) => {
            warn!(session_id = %session.id(), %e, "Failed to join session");
            let _ = ws_tx.send(Message::Close(None)).await;
            return;
        }
    };
    info!(session_id = %session.id(), %participant, "Participant connected");

    // Spawn frame writer task
    let send_task = tokio::spawn(async move {
        while let Some(msg) = event_rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Main read loop
    while let Some(msg_result) = ws_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => handle_text(&session, &participant, text.as_str()),
            Ok(Message::Close(_)) => {
                debug!(session_id = %session.id(), %participant, "Client requested close");
                break;
            }
            Err(e) => {
                warn!(session_id = %session.id(), %participant, %e, "WebSocket read error");
                break;
            }
            // Binary frames carry nothing; ping/pong is answered by axum
            _ => {}
        }
    }

    // Cleanup
    send_task.abort();
    if let Err(e) = session.leave(&participant) {
        warn!(session_id = %session.id(), %participant, %e, "Failed to leave session");
    }
    info!(session_id = %session.id(), %participant, "Participant disconnected");
}

/// Decode one inbound frame and forward its command, if any.
fn handle_text(session: &SessionHandle, participant: &str, text: &str) {
    match ClientFrame::decode_command(text) {
        Ok(command) => {
            if let Err(e) = session.command(participant, command) {
                warn!(session_id = %session.id(), participant, %e, "Failed to forward command");
            }
        }
        Err(BatonError::Json(e)) => {
            warn!(session_id = %session.id(), participant, %e, "Invalid frame received");
        }
        Err(e) => debug!(session_id = %session.id(), participant, %e, "Ignoring frame"),
    }
}
