//! Events routed through the hub.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event emitted by an agent on its connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    /// Periodic telemetry. Only accepted from registered connections.
    #[serde(rename = "stats")]
    Stats(Value),
    /// Output of an executed command.
    #[serde(rename = "output")]
    Output(Value),
    /// Threshold alert raised by the agent.
    #[serde(rename = "alert")]
    Alert(String),
    /// Basic system information, sent once after connecting.
    #[serde(rename = "systemInfo")]
    SystemInfo(Value),
}

impl InboundEvent {
    /// Wire name of the event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Stats(_) => "stats",
            Self::Output(_) => "output",
            Self::Alert(_) => "alert",
            Self::SystemInfo(_) => "systemInfo",
        }
    }
}

/// Notification delivered to the operator console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A client became reachable or unreachable.
    ConnectionStatus { name: String, connected: bool },
    /// Telemetry from a registered client.
    Stats { name: String, data: Value },
    /// Command output; the name is best effort.
    Output { name: Option<String>, output: Value },
    /// Alert raised by a client; the name is best effort.
    Alert { name: Option<String>, message: String },
    /// System information; the name is best effort.
    SystemInfo { name: Option<String>, data: Value },
    /// The operator asked to open a client's own UI.
    OpenExternalView { name: String, host: String },
    /// Stored settings were reset to their defaults.
    SettingsRestored,
}

impl Notification {
    /// Client name the notification is about, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::ConnectionStatus { name, .. }
            | Self::Stats { name, .. }
            | Self::OpenExternalView { name, .. } => Some(name.as_str()),
            Self::Output { name, .. } | Self::Alert { name, .. } | Self::SystemInfo { name, .. } => {
                name.as_deref()
            }
            Self::SettingsRestored => None,
        }
    }

    /// Rough serialized size, used to bound the feed history.
    #[must_use]
    pub fn approx_bytes(&self) -> usize {
        const OVERHEAD: usize = 32;
        let payload = match self {
            Self::Stats { data, .. } | Self::SystemInfo { data, .. } => data.to_string().len(),
            Self::Output { output, .. } => output.to_string().len(),
            Self::Alert { message, .. } => message.len(),
            Self::OpenExternalView { host, .. } => host.len(),
            Self::ConnectionStatus { .. } | Self::SettingsRestored => 0,
        };
        OVERHEAD + self.name().map_or(0, str::len) + payload
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_inbound_wire_names() {
        let parsed: InboundEvent =
            serde_json::from_value(json!({"event": "systemInfo", "data": {"os": "linux"}})).unwrap();
        assert_eq!(parsed, InboundEvent::SystemInfo(json!({"os": "linux"})));

        let parsed: InboundEvent =
            serde_json::from_value(json!({"event": "alert", "data": "cpu above 90%"})).unwrap();
        assert_eq!(parsed.kind(), "alert");
    }

    #[test]
    fn test_alert_requires_string() {
        let parsed = serde_json::from_value::<InboundEvent>(json!({"event": "alert", "data": 5}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_event_rejected() {
        let parsed = serde_json::from_value::<InboundEvent>(json!({"event": "Command", "data": {}}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_notification_shape() {
        let n = Notification::Output {
            name: None,
            output: json!("done"),
        };
        assert_eq!(
            serde_json::to_value(&n).unwrap(),
            json!({"type": "output", "name": null, "output": "done"})
        );

        let n = Notification::ConnectionStatus {
            name: "agent1".into(),
            connected: true,
        };
        assert_eq!(n.name(), Some("agent1"));
        assert_eq!(
            serde_json::to_value(&n).unwrap(),
            json!({"type": "connection_status", "name": "agent1", "connected": true})
        );
    }
}
