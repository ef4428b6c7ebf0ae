//! Wire protocol for agents and operator consoles.
//!
//! Agent frames are `{"event": .., "data": ..}` JSON text frames; inbound
//! agent frames are [`orka_core::InboundEvent`]. Console frames are JSON
//! objects tagged by `type`.

use orka_core::{DialRequest, Notification};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query string of the agent websocket upgrade.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandshakeParams {
    /// Name the agent claims.
    #[serde(default, rename = "clientName", alias = "client_name")]
    pub client_name: Option<String>,
}

/// Message from the hub to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum HubMessage {
    /// Command to execute, forwarded verbatim from the console.
    #[serde(rename = "Command")]
    Command(Value),
    /// Ask a dialed agent to connect back under the given name.
    #[serde(rename = "connect")]
    Connect(DialRequest),
}

/// Settings read requested by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Clients,
    Lists,
    Tasks,
    ConnectionSettings,
    NotificationSettings,
    ServerOptions,
    /// Names currently registered with the hub.
    Connected,
}

/// Message from the console to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleRequest {
    SendCommand {
        name: String,
        command: Value,
    },
    AddClient {
        name: String,
        host: String,
        port: u16,
    },
    RemoveClient {
        name: String,
    },
    /// Dial a client; host and port default to its stored config.
    ConnectClient {
        name: String,
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        port: Option<u16>,
    },
    DisconnectClient {
        name: String,
    },
    Shutdown,
    OpenExternalView {
        name: String,
        host: String,
    },
    CreateList {
        name: String,
        #[serde(default)]
        attributes: Map<String, Value>,
    },
    RemoveList {
        name: String,
    },
    AddClientsToList {
        list: String,
        clients: Vec<String>,
    },
    RemoveClientsFromList {
        list: String,
        clients: Vec<String>,
    },
    CreateTask {
        name: String,
        definition: Value,
    },
    DeleteTask {
        name: String,
    },
    ToggleNotification {
        kind: String,
        enabled: bool,
    },
    SetServerOptions {
        port: u16,
    },
    SetConnectionSettings {
        settings: Value,
    },
    SetWebhook {
        #[serde(default)]
        url: Option<String>,
    },
    ResetSettings,
    Query {
        #[serde(default)]
        request_id: Option<String>,
        what: QueryKind,
    },
    /// Ping for keepalive.
    Ping,
}

/// Direct reply to a console request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleReply {
    QueryResult {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        what: QueryKind,
        data: Value,
    },
    Error {
        message: String,
    },
    Pong,
}

/// Anything written to a console socket.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ConsoleFrame {
    Notification(Notification),
    Reply(ConsoleReply),
}
