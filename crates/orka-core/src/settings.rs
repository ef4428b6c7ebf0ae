//! Durable settings owned by the settings store.
//!
//! The hub only ever uses client names and connection parameters as lookup
//! keys; everything else here is passed through to the console untouched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default port the hub listens on for agents and consoles.
pub const DEFAULT_PORT: u16 = 8000;

/// Known agent and where to dial it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Logical name the agent registers under.
    pub name: String,
    /// Host or IP address.
    pub host: String,
    /// Port the agent listens on for dial requests.
    pub port: u16,
}

impl ClientConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }
}

/// Named grouping of client names.
///
/// Membership is not checked against known clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientList {
    #[serde(default)]
    pub clients: BTreeSet<String>,

    /// Console-defined attributes (colour, description, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// Where the hub listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerOptions {
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Whole settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Known clients keyed by name.
    pub clients: BTreeMap<String, ClientConfig>,
    /// Client groupings keyed by list name.
    pub lists: BTreeMap<String, ClientList>,
    /// Scheduled command definitions keyed by task name.
    pub tasks: BTreeMap<String, Value>,
    /// Payload handed to agents on every dial.
    pub connection_settings: Value,
    /// Per alert-kind notification switches.
    pub notifications: BTreeMap<String, bool>,
    pub server: ServerOptions,
    /// Webhook alerts are posted to.
    pub webhook: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clients: BTreeMap::new(),
            lists: BTreeMap::new(),
            tasks: BTreeMap::new(),
            connection_settings: Value::Object(Map::new()),
            notifications: BTreeMap::new(),
            server: ServerOptions::default(),
            webhook: None,
        }
    }
}
