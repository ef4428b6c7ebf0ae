//! Seams between the hub and its collaborators.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    event::Notification,
    settings::{ClientConfig, ClientList, ServerOptions, Settings},
};

/// Sink for everything the hub tells the operator console.
///
/// Implementations must not block: the hub calls `notify` while
/// serializing connection status changes.
pub trait ControlPlane: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: Notification);

    /// A client became reachable or unreachable.
    fn connection_status_changed(&self, name: &str, connected: bool) {
        self.notify(Notification::ConnectionStatus {
            name: name.to_owned(),
            connected,
        });
    }

    /// Telemetry from a registered client.
    fn stats_received(&self, name: &str, data: Value) {
        self.notify(Notification::Stats {
            name: name.to_owned(),
            data,
        });
    }

    /// Command output.
    fn output_received(&self, name: Option<String>, output: Value) {
        self.notify(Notification::Output { name, output });
    }

    /// Client alert.
    fn alert_received(&self, name: Option<String>, message: String) {
        self.notify(Notification::Alert { name, message });
    }

    /// Client system information.
    fn system_info_received(&self, name: Option<String>, data: Value) {
        self.notify(Notification::SystemInfo { name, data });
    }

    /// Ask the windowing side to open a client's own UI.
    fn open_external_view(&self, name: &str, host: &str) {
        self.notify(Notification::OpenExternalView {
            name: name.to_owned(),
            host: host.to_owned(),
        });
    }
}

/// Settings store error.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Settings file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Settings store error: {0}")]
    Internal(String),
}

/// Durable key-value settings.
///
/// Keys are plain strings; writes are last-write-wins.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Full settings document.
    async fn snapshot(&self) -> Result<Settings, SettingsError>;

    /// Known clients keyed by name.
    async fn clients(&self) -> Result<BTreeMap<String, ClientConfig>, SettingsError> {
        Ok(self.snapshot().await?.clients)
    }

    /// Stored config for one client.
    async fn client(&self, name: &str) -> Result<Option<ClientConfig>, SettingsError> {
        Ok(self.snapshot().await?.clients.remove(name))
    }

    /// Remember a client, replacing any config under the same name.
    async fn add_client(&self, config: ClientConfig) -> Result<(), SettingsError>;

    /// Forget a client. Unknown names are ignored.
    async fn remove_client(&self, name: &str) -> Result<(), SettingsError>;

    /// Client groupings keyed by list name.
    async fn lists(&self) -> Result<BTreeMap<String, ClientList>, SettingsError> {
        Ok(self.snapshot().await?.lists)
    }

    /// Create or replace a list's attributes, keeping its members.
    async fn create_list(
        &self,
        name: &str,
        attributes: Map<String, Value>,
    ) -> Result<(), SettingsError>;

    async fn remove_list(&self, name: &str) -> Result<(), SettingsError>;

    /// Add members, creating the list if needed.
    async fn add_clients_to_list(&self, list: &str, clients: &[String])
    -> Result<(), SettingsError>;

    async fn remove_clients_from_list(
        &self,
        list: &str,
        clients: &[String],
    ) -> Result<(), SettingsError>;

    /// Scheduled tasks keyed by task name.
    async fn tasks(&self) -> Result<BTreeMap<String, Value>, SettingsError> {
        Ok(self.snapshot().await?.tasks)
    }

    async fn add_task(&self, name: &str, definition: Value) -> Result<(), SettingsError>;

    async fn remove_task(&self, name: &str) -> Result<(), SettingsError>;

    /// Payload handed to agents on every dial.
    async fn connection_settings(&self) -> Result<Value, SettingsError> {
        Ok(self.snapshot().await?.connection_settings)
    }

    async fn set_connection_settings(&self, settings: Value) -> Result<(), SettingsError>;

    /// Per alert-kind notification switches.
    async fn notification_preferences(&self) -> Result<BTreeMap<String, bool>, SettingsError> {
        Ok(self.snapshot().await?.notifications)
    }

    async fn toggle_notification(&self, kind: &str, enabled: bool) -> Result<(), SettingsError>;

    async fn server_options(&self) -> Result<ServerOptions, SettingsError> {
        Ok(self.snapshot().await?.server)
    }

    async fn set_server_options(&self, options: ServerOptions) -> Result<(), SettingsError>;

    async fn set_webhook(&self, url: Option<String>) -> Result<(), SettingsError>;

    /// Restore every setting to its default.
    async fn reset(&self) -> Result<(), SettingsError>;
}

/// What an agent is asked to do when dialed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialRequest {
    /// Name the agent should register under when it connects back.
    pub name: String,
    /// Global connection settings at dial time.
    pub settings: Value,
}

/// Dial error.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("Invalid dial target {0}")]
    InvalidTarget(String),
    #[error("Dial to {target} timed out")]
    TimedOut { target: String },
    #[error("Dial to {target} failed: {reason}")]
    Failed { target: String, reason: String },
}

/// Outbound connection primitive.
///
/// A successful dial only means the request reached the agent; the agent
/// shows up through the normal accept path if and when it connects back.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, host: &str, port: u16, request: &DialRequest) -> Result<(), DialError>;
}
