//! JSON file settings storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use orka_core::{
    settings::{ClientConfig, ServerOptions, Settings},
    traits::{SettingsError, SettingsStore},
};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::MemorySettings;

/// Settings persisted to a single JSON document.
///
/// Reads are served from memory; every mutation rewrites the file through a
/// temporary sibling and a rename so a crash never leaves half a document.
pub struct JsonFileSettings {
    path: PathBuf,
    cache: MemorySettings,
    write_lock: Mutex<()>,
}

impl JsonFileSettings {
    /// Open the settings file at `path`.
    ///
    /// A missing file yields default settings; it is created on the first
    /// write.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let settings = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Settings>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No settings file, using defaults");
                Settings::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            cache: MemorySettings::with_settings(settings),
            write_lock: Mutex::new(()),
        })
    }

    /// Default location, `<config dir>/orka/settings.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("orka").join("settings.json"))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), SettingsError> {
        let snapshot = self.cache.snapshot().await?;
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// Apply a mutation to the cache and write the result, holding the write
/// lock so saves land in mutation order.
macro_rules! mutate {
    ($self:ident, $call:expr) => {{
        let _guard = $self.write_lock.lock().await;
        $call.await?;
        $self.persist().await
    }};
}

#[async_trait]
impl SettingsStore for JsonFileSettings {
    async fn snapshot(&self) -> Result<Settings, SettingsError> {
        self.cache.snapshot().await
    }

    async fn add_client(&self, config: ClientConfig) -> Result<(), SettingsError> {
        mutate!(self, self.cache.add_client(config))
    }

    async fn remove_client(&self, name: &str) -> Result<(), SettingsError> {
        mutate!(self, self.cache.remove_client(name))
    }

    async fn create_list(
        &self,
        name: &str,
        attributes: Map<String, Value>,
    ) -> Result<(), SettingsError> {
        mutate!(self, self.cache.create_list(name, attributes))
    }

    async fn remove_list(&self, name: &str) -> Result<(), SettingsError> {
        mutate!(self, self.cache.remove_list(name))
    }

    async fn add_clients_to_list(
        &self,
        list: &str,
        clients: &[String],
    ) -> Result<(), SettingsError> {
        mutate!(self, self.cache.add_clients_to_list(list, clients))
    }

    async fn remove_clients_from_list(
        &self,
        list: &str,
        clients: &[String],
    ) -> Result<(), SettingsError> {
        mutate!(self, self.cache.remove_clients_from_list(list, clients))
    }

    async fn add_task(&self, name: &str, definition: Value) -> Result<(), SettingsError> {
        mutate!(self, self.cache.add_task(name, definition))
    }

    async fn remove_task(&self, name: &str) -> Result<(), SettingsError> {
        mutate!(self, self.cache.remove_task(name))
    }

    async fn set_connection_settings(&self, settings: Value) -> Result<(), SettingsError> {
        mutate!(self, self.cache.set_connection_settings(settings))
    }

    async fn toggle_notification(&self, kind: &str, enabled: bool) -> Result<(), SettingsError> {
        mutate!(self, self.cache.toggle_notification(kind, enabled))
    }

    async fn set_server_options(&self, options: ServerOptions) -> Result<(), SettingsError> {
        mutate!(self, self.cache.set_server_options(options))
    }

    async fn set_webhook(&self, url: Option<String>) -> Result<(), SettingsError> {
        mutate!(self, self.cache.set_webhook(url))
    }

    async fn reset(&self) -> Result<(), SettingsError> {
        mutate!(self, self.cache.reset())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::assert_ok;

    use super::*;

    fn scratch_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("orka-settings-{tag}-{}", uuid::Uuid::new_v4()))
            .join("settings.json")
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let store = JsonFileSettings::open(scratch_path("missing")).await.unwrap();
        assert_eq!(store.snapshot().await.unwrap(), Settings::default());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_mutations_survive_reopen() {
        let path = scratch_path("reopen");
        {
            let store = assert_ok!(JsonFileSettings::open(&path).await);
            assert_ok!(
                store
                    .add_client(ClientConfig::new("pi1", "10.0.0.2", 9000))
                    .await
            );
            assert_ok!(store.set_connection_settings(json!({"interval": 5})).await);
            assert_ok!(store.add_task("uptime", json!({"cmd": "uptime"})).await);
        }

        let reopened = JsonFileSettings::open(&path).await.unwrap();
        let settings = reopened.snapshot().await.unwrap();
        assert_eq!(settings.clients["pi1"].port, 9000);
        assert_eq!(settings.connection_settings, json!({"interval": 5}));
        assert!(settings.tasks.contains_key("uptime"));
        assert!(!path.with_extension("json.tmp").exists());

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let path = scratch_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileSettings::open(&path).await.err().unwrap();
        assert!(matches!(err, SettingsError::Malformed(_)));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
