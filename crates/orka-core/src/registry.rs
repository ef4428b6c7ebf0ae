//! Connection identity registry.
//!
//! Bidirectional map between an agent's logical name and the connection it
//! is currently reachable through. Both directions sit behind one lock so an
//! eviction can never leave them disagreeing.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use thiserror::Error;

use crate::connection::{ConnectionHandle, ConnectionId};

/// Outcome of a successful [`ConnectionRegistry::register`].
#[derive(Debug)]
pub enum Registration {
    /// The name was not registered before.
    Inserted,
    /// The name was live on another connection, which has been evicted.
    ///
    /// The caller owns closing the displaced connection.
    Replaced(ConnectionHandle),
    /// The name was already bound to this very connection.
    Unchanged,
}

/// Registry error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Client name is empty")]
    EmptyName,
    #[error("Connection {connection} is already registered as {existing}")]
    ConnectionInUse {
        connection: ConnectionId,
        existing: String,
    },
}

#[derive(Default)]
struct Inner {
    by_name: HashMap<String, ConnectionHandle>,
    by_connection: HashMap<ConnectionId, String>,
}

/// In-memory name <-> connection registry.
///
/// Runtime state only; it starts empty on every process start.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `name` to `connection`. The newest connection for a name wins.
    ///
    /// # Errors
    /// Returns error if the name is empty or the connection already carries
    /// a different name.
    pub fn register(
        &self,
        name: &str,
        connection: ConnectionHandle,
    ) -> Result<Registration, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let id = connection.id();
        let mut inner = self.write();

        if let Some(existing) = inner.by_connection.get(&id) {
            if existing == name {
                return Ok(Registration::Unchanged);
            }
            return Err(RegistryError::ConnectionInUse {
                connection: id,
                existing: existing.clone(),
            });
        }

        let displaced = inner.by_name.insert(name.to_owned(), connection);
        inner.by_connection.insert(id, name.to_owned());

        match displaced {
            Some(old) => {
                inner.by_connection.remove(&old.id());
                tracing::info!(
                    name = %name,
                    connection = %id,
                    displaced = %old.id(),
                    "Re-registered client (evicted stale connection)"
                );
                Ok(Registration::Replaced(old))
            }
            None => {
                tracing::info!(name = %name, connection = %id, "Registered client");
                Ok(Registration::Inserted)
            }
        }
    }

    /// Drop whatever name `connection` is bound to.
    ///
    /// Returns the name if one was bound; missing entries are not an error.
    pub fn unregister(&self, connection: ConnectionId) -> Option<String> {
        let mut inner = self.write();
        let name = inner.by_connection.remove(&connection)?;

        // Only drop the forward entry if it still points here.
        if inner
            .by_name
            .get(&name)
            .is_some_and(|handle| handle.id() == connection)
        {
            inner.by_name.remove(&name);
        }

        tracing::info!(name = %name, connection = %connection, "Unregistered client");
        Some(name)
    }

    /// Name bound to `connection`, if any.
    #[must_use]
    pub fn resolve_name(&self, connection: ConnectionId) -> Option<String> {
        self.read().by_connection.get(&connection).cloned()
    }

    /// Live connection for `name`, if any.
    #[must_use]
    pub fn resolve_connection(&self, name: &str) -> Option<ConnectionHandle> {
        self.read().by_name.get(name).cloned()
    }

    /// Snapshot of every registered name.
    #[must_use]
    pub fn all_names(&self) -> BTreeSet<String> {
        self.read().by_name.keys().cloned().collect()
    }

    /// Whether `name` is currently reachable.
    #[must_use]
    pub fn is_connected(&self, name: &str) -> bool {
        self.read().by_name.contains_key(name)
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().by_name.len()
    }

    /// Whether no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().by_name.is_empty()
    }
}
