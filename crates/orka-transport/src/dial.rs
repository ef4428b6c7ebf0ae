//! Outbound dialing over WebSocket.

use async_trait::async_trait;
use futures::SinkExt;
use orka_core::{DialError, DialRequest, Dialer};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::protocol::HubMessage;

/// Dialer that asks an agent, over a short-lived websocket, to connect back.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsDialer;

impl WsDialer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self, host: &str, port: u16, request: &DialRequest) -> Result<(), DialError> {
        let host = host.trim();
        if host.is_empty() || port == 0 {
            return Err(DialError::InvalidTarget(format!("{host}:{port}")));
        }
        let url = format!("ws://{host}:{port}/");
        let failed = |reason: String| DialError::Failed {
            target: url.clone(),
            reason,
        };

        let frame = serde_json::to_string(&HubMessage::Connect(request.clone()))
            .map_err(|e| failed(e.to_string()))?;

        tracing::debug!(%url, name = %request.name, "Dialing agent");
        let (mut ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| failed(e.to_string()))?;

        ws.send(Message::Text(frame))
            .await
            .map_err(|e| failed(e.to_string()))?;
        let _ = ws.close(None).await;

        Ok(())
    }
}
