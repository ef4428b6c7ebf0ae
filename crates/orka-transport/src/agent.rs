//! WebSocket endpoint agents connect to.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use orka_core::{
    ConnectionHandle, InboundEvent, Outbound,
    traits::{ControlPlane, Dialer, SettingsStore},
};
use orka_hub::Hub;

use crate::protocol::{HandshakeParams, HubMessage};

/// WebSocket upgrade handler for agents.
///
/// The agent's name comes from the `clientName` query parameter.
pub async fn agent_ws_handler<C, S, D>(
    ws: WebSocketUpgrade,
    Query(params): Query<HandshakeParams>,
    State(hub): State<Arc<Hub<C, S, D>>>,
) -> impl IntoResponse
where
    C: ControlPlane + 'static,
    S: SettingsStore + 'static,
    D: Dialer + 'static,
{
    ws.on_upgrade(move |socket| handle_agent_socket(socket, params.client_name, hub))
}

async fn handle_agent_socket<C, S, D>(socket: WebSocket, claimed: Option<String>, hub: Arc<Hub<C, S, D>>)
where
    C: ControlPlane + 'static,
    S: SettingsStore + 'static,
    D: Dialer + 'static,
{
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut outbound) = ConnectionHandle::channel();
    let id = connection.id();

    // Drain the connection's outbound queue into the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            match msg {
                Outbound::Command(command) => {
                    let json = match serde_json::to_string(&HubMessage::Command(command)) {
                        Ok(j) => j,
                        Err(e) => {
                            tracing::error!("Failed to serialize command: {e}");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close(reason) => {
                    let frame = CloseFrame {
                        code: reason.code(),
                        reason: reason.as_str().into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    if hub.accept(claimed.as_deref(), connection.clone()).is_none() {
        // Let the close frame go out, then drop the socket.
        let _ = send_task.await;
        return;
    }

    loop {
        let msg = tokio::select! {
            msg = receiver.next() => msg,
            _ = &mut send_task => break,
        };

        let text = match msg {
            Some(Ok(Message::Text(t))) => t,
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s.into(),
                Err(_) => continue,
            },
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::warn!(connection = %id, "Agent socket error: {e}");
                break;
            }
        };

        let event: InboundEvent = match serde_json::from_str(&text) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(connection = %id, "Invalid agent message: {e}");
                continue;
            }
        };

        let kind = event.kind();
        let routed = hub.route_inbound(&connection, event);
        tracing::trace!(connection = %id, kind, ?routed, "Agent event routed");
    }

    hub.teardown(id);
    send_task.abort();

    tracing::debug!(connection = %id, "Agent socket closed");
}
