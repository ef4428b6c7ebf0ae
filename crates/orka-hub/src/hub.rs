//! Hub state shared by the lifecycle controller and the event router.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use orka_core::{
    ConnectionRegistry, HubConfig,
    traits::{ControlPlane, Dialer, SettingsStore},
};
use tokio::sync::watch;

/// The agent hub.
///
/// Owns the connection registry and talks to its collaborators through the
/// control plane, settings store and dialer it was built with. Construct
/// one per server (or per test) and share it behind an `Arc`.
pub struct Hub<C, S, D>
where
    C: ControlPlane,
    S: SettingsStore,
    D: Dialer,
{
    pub(crate) registry: ConnectionRegistry,
    pub(crate) control: Arc<C>,
    pub(crate) settings: Arc<S>,
    pub(crate) dialer: Arc<D>,
    pub(crate) config: HubConfig,
    /// Serializes status transitions so notifications follow registry order.
    status_gate: Mutex<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl<C, S, D> Hub<C, S, D>
where
    C: ControlPlane,
    S: SettingsStore,
    D: Dialer,
{
    /// Create a new hub with an empty registry.
    #[must_use]
    pub fn new(control: Arc<C>, settings: Arc<S>, dialer: Arc<D>, config: HubConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            registry: ConnectionRegistry::new(),
            control,
            settings,
            dialer,
            config,
            status_gate: Mutex::new(()),
            shutdown_tx,
        }
    }

    /// Connection registry.
    #[must_use]
    pub const fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Control plane notifications are sent to.
    #[must_use]
    pub const fn control(&self) -> &Arc<C> {
        &self.control
    }

    /// Settings store, for pass-through reads and writes.
    #[must_use]
    pub const fn settings(&self) -> &Arc<S> {
        &self.settings
    }

    /// Runtime configuration.
    #[must_use]
    pub const fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Receiver that flips to `true` once shutdown has drained.
    #[must_use]
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Whether shutdown has completed.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    pub(crate) fn status_gate(&self) -> MutexGuard<'_, ()> {
        self.status_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn signal_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}
