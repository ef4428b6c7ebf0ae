//! Live transport connections as seen by the hub.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Ephemeral identifier of one transport connection.
///
/// A fresh id is minted for every accepted socket, so an agent that
/// reconnects under the same name gets a different id each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Mint a new random connection id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why the hub asked a connection to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The handshake carried no client name.
    MissingName,
    /// A newer connection claimed the same name.
    Superseded,
    /// The operator removed the client.
    Removed,
    /// The operator disconnected the client.
    Disconnected,
    /// The hub is shutting down.
    Shutdown,
    /// The connection sent something it is not allowed to send.
    ProtocolViolation,
}

impl CloseReason {
    /// Application close code carried in the websocket close frame.
    ///
    /// Codes live in the 4000-4999 private range.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::MissingName => 4001,
            Self::Superseded => 4002,
            Self::Removed => 4003,
            Self::Disconnected => 4004,
            Self::Shutdown => 4005,
            Self::ProtocolViolation => 4006,
        }
    }

    /// Short human-readable reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingName => "missing client name",
            Self::Superseded => "superseded by a newer connection",
            Self::Removed => "client removed",
            Self::Disconnected => "disconnected by operator",
            Self::Shutdown => "hub shutting down",
            Self::ProtocolViolation => "protocol violation",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message queued for delivery on a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Command payload, forwarded verbatim.
    Command(Value),
    /// Close the connection.
    Close(CloseReason),
}

/// Addressable handle to a live connection.
///
/// The transport task owning the socket holds the receiving half and drains
/// it; everyone else talks to the connection through this handle.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Wrap an existing outbound sender.
    #[must_use]
    pub const fn new(id: ConnectionId, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { id, tx }
    }

    /// Create a handle with a fresh id, returning the receiving half.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(ConnectionId::new(), tx), rx)
    }

    /// Connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a command. Returns false if the connection is already gone.
    pub fn send_command(&self, command: Value) -> bool {
        self.tx.send(Outbound::Command(command)).is_ok()
    }

    /// Ask the owning transport task to close the connection.
    pub fn close(&self, reason: CloseReason) -> bool {
        tracing::debug!(connection = %self.id, %reason, "Closing connection");
        self.tx.send(Outbound::Close(reason)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_handle_queues_in_order() {
        let (handle, mut rx) = ConnectionHandle::channel();

        assert!(handle.send_command(json!({"run": "uptime"})));
        assert!(handle.close(CloseReason::Removed));

        assert_eq!(rx.try_recv().unwrap(), Outbound::Command(json!({"run": "uptime"})));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close(CloseReason::Removed));
    }

    #[test]
    fn test_send_after_drop_reports_closed() {
        let (handle, rx) = ConnectionHandle::channel();
        drop(rx);

        assert!(!handle.send_command(json!(1)));
        assert!(!handle.close(CloseReason::Shutdown));
    }

    #[test]
    fn test_close_codes_are_private_range() {
        for reason in [
            CloseReason::MissingName,
            CloseReason::Superseded,
            CloseReason::Removed,
            CloseReason::Disconnected,
            CloseReason::Shutdown,
            CloseReason::ProtocolViolation,
        ] {
            assert!((4000..5000).contains(&reason.code()));
        }
    }
}
