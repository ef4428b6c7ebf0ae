//! In-memory settings storage.

use std::sync::{RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use orka_core::{
    settings::{ClientConfig, ServerOptions, Settings},
    traits::{SettingsError, SettingsStore},
};
use serde_json::{Map, Value};

/// In-memory settings implementation.
///
/// Useful for tests and throwaway hubs. Data is lost on restart.
pub struct MemorySettings {
    settings: RwLock<Settings>,
}

impl MemorySettings {
    /// Create a store holding default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Create a store seeded with `settings`.
    #[must_use]
    pub const fn with_settings(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Settings>, SettingsError> {
        self.settings
            .write()
            .map_err(|e| SettingsError::Internal(e.to_string()))
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn snapshot(&self) -> Result<Settings, SettingsError> {
        Ok(self
            .settings
            .read()
            .map_err(|e| SettingsError::Internal(e.to_string()))?
            .clone())
    }

    async fn add_client(&self, config: ClientConfig) -> Result<(), SettingsError> {
        self.write()?.clients.insert(config.name.clone(), config);
        Ok(())
    }

    async fn remove_client(&self, name: &str) -> Result<(), SettingsError> {
        self.write()?.clients.remove(name);
        Ok(())
    }

    async fn create_list(
        &self,
        name: &str,
        attributes: Map<String, Value>,
    ) -> Result<(), SettingsError> {
        self.write()?
            .lists
            .entry(name.to_owned())
            .or_default()
            .attributes = attributes;
        Ok(())
    }

    async fn remove_list(&self, name: &str) -> Result<(), SettingsError> {
        self.write()?.lists.remove(name);
        Ok(())
    }

    async fn add_clients_to_list(
        &self,
        list: &str,
        clients: &[String],
    ) -> Result<(), SettingsError> {
        self.write()?
            .lists
            .entry(list.to_owned())
            .or_default()
            .clients
            .extend(clients.iter().cloned());
        Ok(())
    }

    async fn remove_clients_from_list(
        &self,
        list: &str,
        clients: &[String],
    ) -> Result<(), SettingsError> {
        if let Some(entry) = self.write()?.lists.get_mut(list) {
            for client in clients {
                entry.clients.remove(client);
            }
        }
        Ok(())
    }

    async fn add_task(&self, name: &str, definition: Value) -> Result<(), SettingsError> {
        self.write()?.tasks.insert(name.to_owned(), definition);
        Ok(())
    }

    async fn remove_task(&self, name: &str) -> Result<(), SettingsError> {
        self.write()?.tasks.remove(name);
        Ok(())
    }

    async fn set_connection_settings(&self, settings: Value) -> Result<(), SettingsError> {
        self.write()?.connection_settings = settings;
        Ok(())
    }

    async fn toggle_notification(&self, kind: &str, enabled: bool) -> Result<(), SettingsError> {
        self.write()?.notifications.insert(kind.to_owned(), enabled);
        Ok(())
    }

    async fn set_server_options(&self, options: ServerOptions) -> Result<(), SettingsError> {
        self.write()?.server = options;
        Ok(())
    }

    async fn set_webhook(&self, url: Option<String>) -> Result<(), SettingsError> {
        self.write()?.webhook = url;
        Ok(())
    }

    async fn reset(&self) -> Result<(), SettingsError> {
        *self.write()? = Settings::default();
        Ok(())
    }
}
