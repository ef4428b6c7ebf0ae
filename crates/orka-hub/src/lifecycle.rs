//! Connection lifecycle: accept, teardown, dial, removal and shutdown.

use std::sync::Arc;

use orka_core::{
    ClientConfig, CloseReason, ConnectionHandle, ConnectionId, Registration,
    traits::{ControlPlane, DialError, DialRequest, Dialer, SettingsError, SettingsStore},
};
use tokio::task::JoinHandle;

use crate::Hub;

impl<C, S, D> Hub<C, S, D>
where
    C: ControlPlane,
    S: SettingsStore + 'static,
    D: Dialer + 'static,
{
    /// Admit a new connection claiming `claimed` as its name.
    ///
    /// Connections without a usable name are closed on the spot and never
    /// reach the registry. Returns the registered name.
    pub fn accept(&self, claimed: Option<&str>, connection: ConnectionHandle) -> Option<String> {
        let Some(name) = claimed.map(str::trim).filter(|n| !n.is_empty()) else {
            tracing::warn!(connection = %connection.id(), "Connection without client name, closing");
            connection.close(CloseReason::MissingName);
            return None;
        };

        let _gate = self.status_gate();
        match self.registry.register(name, connection.clone()) {
            Ok(Registration::Inserted) => self.control.connection_status_changed(name, true),
            Ok(Registration::Replaced(stale)) => {
                // The name never went offline, so no status change is reported.
                stale.close(CloseReason::Superseded);
            }
            Ok(Registration::Unchanged) => {}
            Err(e) => {
                tracing::warn!(connection = %connection.id(), "Rejected registration: {e}");
                connection.close(CloseReason::ProtocolViolation);
                return None;
            }
        }

        Some(name.to_owned())
    }

    /// Forget a connection the transport reports as closed.
    ///
    /// Safe to call for connections that were never registered or have
    /// already been evicted.
    pub fn teardown(&self, connection: ConnectionId) {
        let _gate = self.status_gate();
        if let Some(name) = self.registry.resolve_name(connection) {
            self.control.connection_status_changed(&name, false);
        }
        self.registry.unregister(connection);
    }

    /// Ask the agent at `host:port` to connect back as `name`.
    ///
    /// Fire and forget: nothing is registered here, the agent appears
    /// through [`Hub::accept`] once it dials in. Failures are only logged.
    pub fn connect_client(&self, name: &str, host: &str, port: u16) -> JoinHandle<()> {
        let settings = Arc::clone(&self.settings);
        let dialer = Arc::clone(&self.dialer);
        let timeout = self.config.dial_timeout;
        let (name, host) = (name.to_owned(), host.to_owned());

        tokio::spawn(async move {
            let connection_settings = match settings.connection_settings().await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(name = %name, "Using empty connection settings: {e}");
                    serde_json::Value::Object(serde_json::Map::new())
                }
            };
            let request = DialRequest {
                name: name.clone(),
                settings: connection_settings,
            };

            let outcome = tokio::time::timeout(timeout, dialer.dial(&host, port, &request))
                .await
                .unwrap_or_else(|_| {
                    Err(DialError::TimedOut {
                        target: format!("{host}:{port}"),
                    })
                });

            match outcome {
                Ok(()) => tracing::info!(name = %name, %host, port, "Dial request delivered"),
                Err(e) => tracing::warn!(name = %name, "Dial failed: {e}"),
            }
        })
    }

    /// Dial a client using its stored config.
    ///
    /// Returns `None` if the client is unknown to the settings store.
    ///
    /// # Errors
    /// Returns error if the settings store cannot be read.
    pub async fn connect_known(&self, name: &str) -> Result<Option<JoinHandle<()>>, SettingsError> {
        let Some(config) = self.settings.client(name).await? else {
            tracing::debug!(name = %name, "No stored config to dial");
            return Ok(None);
        };
        Ok(Some(self.connect_client(&config.name, &config.host, config.port)))
    }

    /// Remember a client and dial it.
    ///
    /// # Errors
    /// Returns error if the config cannot be stored; no dial happens then.
    pub async fn add_client(&self, config: ClientConfig) -> Result<JoinHandle<()>, SettingsError> {
        self.settings.add_client(config.clone()).await?;
        tracing::info!(name = %config.name, host = %config.host, port = config.port, "Client added");
        Ok(self.connect_client(&config.name, &config.host, config.port))
    }

    /// Close a client's live connection, keeping its config.
    ///
    /// Returns whether a live connection existed.
    pub fn disconnect_client(&self, name: &str) -> bool {
        self.registry
            .resolve_connection(name)
            .is_some_and(|connection| connection.close(CloseReason::Disconnected))
    }

    /// Close a client's live connection, if any, and forget its config.
    ///
    /// The disconnected status is reported by the teardown the close
    /// triggers, not here.
    ///
    /// # Errors
    /// Returns error if the settings store fails to forget the client.
    pub async fn remove_client(&self, name: &str) -> Result<(), SettingsError> {
        if let Some(connection) = self.registry.resolve_connection(name) {
            connection.close(CloseReason::Removed);
        }
        self.settings.remove_client(name).await?;
        tracing::info!(name = %name, "Client removed");
        Ok(())
    }

    /// Hand a client's own UI over to the console's windowing side.
    pub fn open_external_view(&self, name: &str, host: &str) {
        self.control.open_external_view(name, host);
    }

    /// Close every connection, give close handlers a moment, then signal
    /// that the process may exit.
    pub async fn shutdown(&self) {
        let names = self.registry.all_names();
        tracing::info!(clients = names.len(), "Shutting down hub");

        for name in &names {
            if let Some(connection) = self.registry.resolve_connection(name) {
                connection.close(CloseReason::Shutdown);
            }
        }

        tokio::time::sleep(self.config.shutdown_grace).await;
        self.signal_shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use orka_core::{HubConfig, Notification, Outbound};
    use serde_json::json;
    use tokio_test::assert_ok;

    use super::*;
    use crate::testing::{TestHub, statuses, test_hub, test_hub_with};

    fn expect_close(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Outbound>, reason: CloseReason) {
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close(reason));
    }

    #[test]
    fn test_accept_registers_and_notifies() {
        let TestHub { hub, control, .. } = test_hub();
        let (conn, _rx) = ConnectionHandle::channel();

        assert_eq!(hub.accept(Some("agent1"), conn.clone()).as_deref(), Some("agent1"));
        assert_eq!(hub.registry().resolve_name(conn.id()).as_deref(), Some("agent1"));
        assert_eq!(statuses(&control, "agent1"), vec![true]);
    }

    #[test]
    fn test_accept_without_name_closes() {
        let TestHub { hub, control, .. } = test_hub();

        for claimed in [None, Some(""), Some("   ")] {
            let (conn, mut rx) = ConnectionHandle::channel();
            assert!(hub.accept(claimed, conn).is_none());
            expect_close(&mut rx, CloseReason::MissingName);
        }

        assert!(hub.registry().is_empty());
        assert!(control.notifications().is_empty());
    }

    #[test]
    fn test_teardown_notifies_then_unregisters() {
        let TestHub { hub, control, .. } = test_hub();
        let (conn, _rx) = ConnectionHandle::channel();
        hub.accept(Some("agent1"), conn.clone());

        hub.teardown(conn.id());
        hub.teardown(conn.id());

        assert!(!hub.registry().is_connected("agent1"));
        assert_eq!(statuses(&control, "agent1"), vec![true, false]);
    }

    #[test]
    fn test_teardown_of_anonymous_connection_is_silent() {
        let TestHub { hub, control, .. } = test_hub();
        let (conn, _rx) = ConnectionHandle::channel();
        hub.accept(None, conn.clone());

        hub.teardown(conn.id());
        assert!(control.notifications().is_empty());
    }

    #[test]
    fn test_reconnect_evicts_stale_connection() {
        let TestHub { hub, control, .. } = test_hub();
        let (first, mut first_rx) = ConnectionHandle::channel();
        let (second, _second_rx) = ConnectionHandle::channel();

        hub.accept(Some("agent1"), first.clone());
        hub.accept(Some("agent1"), second.clone());

        expect_close(&mut first_rx, CloseReason::Superseded);
        assert_eq!(hub.registry().resolve_connection("agent1").unwrap().id(), second.id());

        // The displaced socket's close arrives late and must not flip status.
        hub.teardown(first.id());
        assert!(hub.registry().is_connected("agent1"));
        assert_eq!(statuses(&control, "agent1"), vec![true]);
    }

    #[test]
    fn test_agent1_session_scenario() {
        let TestHub { hub, control, .. } = test_hub();
        let (a, _a_rx) = ConnectionHandle::channel();
        let (b, _b_rx) = ConnectionHandle::channel();

        hub.accept(Some("agent1"), a.clone());
        hub.route_inbound(&a, orka_core::InboundEvent::Stats(json!({"cpu": 10})));
        hub.teardown(a.id());
        hub.accept(Some("agent1"), b.clone());

        assert_eq!(
            control.notifications(),
            vec![
                Notification::ConnectionStatus {
                    name: "agent1".into(),
                    connected: true
                },
                Notification::Stats {
                    name: "agent1".into(),
                    data: json!({"cpu": 10})
                },
                Notification::ConnectionStatus {
                    name: "agent1".into(),
                    connected: false
                },
                Notification::ConnectionStatus {
                    name: "agent1".into(),
                    connected: true
                },
            ]
        );
    }

    #[test]
    fn test_status_never_false_before_true() {
        let TestHub { hub, control, .. } = test_hub();
        let conns: Vec<_> = (0..6).map(|_| ConnectionHandle::channel()).collect();

        for (i, (conn, _)) in conns.iter().enumerate() {
            hub.accept(Some(if i % 2 == 0 { "x" } else { "y" }), conn.clone());
            if i % 3 == 0 {
                hub.teardown(conns[i / 2].0.id());
            }
        }
        for (conn, _) in &conns {
            hub.teardown(conn.id());
        }

        for name in ["x", "y"] {
            let seen = statuses(&control, name);
            assert_eq!(seen.first(), Some(&true));
            assert!(seen.windows(2).all(|w| w[0] != w[1]), "{name}: {seen:?}");
        }
    }

    #[test]
    fn test_concurrent_churn_keeps_status_order() {
        let TestHub { hub, control, .. } = test_hub();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let (conn, _rx) = ConnectionHandle::channel();
                        hub.accept(Some("x"), conn.clone());
                        hub.teardown(conn.id());
                    }
                });
            }
        });

        let seen = statuses(&control, "x");
        assert_eq!(seen.first(), Some(&true));
        assert_eq!(seen.last(), Some(&false));
        assert!(seen.windows(2).all(|w| w[0] != w[1]));
        assert!(hub.registry().is_empty());
    }

    #[test]
    fn test_disconnect_client_closes_but_keeps_registration_until_teardown() {
        let TestHub { hub, .. } = test_hub();
        let (conn, mut rx) = ConnectionHandle::channel();
        hub.accept(Some("agent1"), conn);

        assert!(hub.disconnect_client("agent1"));
        assert!(!hub.disconnect_client("ghost"));
        expect_close(&mut rx, CloseReason::Disconnected);
        assert!(hub.registry().is_connected("agent1"));
    }

    #[tokio::test]
    async fn test_add_client_stores_and_dials() {
        let TestHub {
            hub,
            settings,
            dialer,
            ..
        } = test_hub();
        settings
            .set_connection_settings(json!({"interval": 5}))
            .await
            .unwrap();

        let dial = hub
            .add_client(ClientConfig::new("pi1", "10.0.0.2", 9000))
            .await
            .unwrap();
        dial.await.unwrap();

        assert!(settings.client("pi1").await.unwrap().is_some());
        assert_eq!(
            dialer.dials(),
            vec![(
                "10.0.0.2".to_string(),
                9000,
                DialRequest {
                    name: "pi1".into(),
                    settings: json!({"interval": 5}),
                }
            )]
        );
        // Dialing never pre-registers the name.
        assert!(!hub.registry().is_connected("pi1"));
    }

    #[tokio::test]
    async fn test_connect_known_uses_stored_config() {
        let TestHub {
            hub,
            settings,
            dialer,
            ..
        } = test_hub();
        settings
            .add_client(ClientConfig::new("pi1", "10.0.0.2", 9000))
            .await
            .unwrap();

        assert!(hub.connect_known("ghost").await.unwrap().is_none());
        hub.connect_known("pi1").await.unwrap().unwrap().await.unwrap();

        assert_eq!(dialer.dials().len(), 1);
        assert_eq!(dialer.dials()[0].1, 9000);
    }

    #[tokio::test]
    async fn test_failed_dial_is_absorbed() {
        let TestHub { hub, control, dialer, .. } = test_hub();
        dialer.fail_next();

        hub.connect_client("pi1", "unreachable.invalid", 1).await.unwrap();

        assert!(control.notifications().is_empty());
        assert!(hub.registry().is_empty());
    }

    #[tokio::test]
    async fn test_slow_dial_times_out() {
        let config = HubConfig {
            dial_timeout: Duration::from_millis(20),
            ..HubConfig::default()
        };
        let TestHub { hub, dialer, .. } = test_hub_with(config);
        dialer.hang_next();

        tokio::time::timeout(Duration::from_secs(2), hub.connect_client("pi1", "h", 1))
            .await
            .expect("dial task should finish after its timeout")
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_client_closes_and_forgets() {
        let TestHub { hub, settings, .. } = test_hub();
        settings
            .add_client(ClientConfig::new("pi1", "10.0.0.2", 9000))
            .await
            .unwrap();
        let (conn, mut rx) = ConnectionHandle::channel();
        hub.accept(Some("pi1"), conn);

        assert_ok!(hub.remove_client("pi1").await);
        expect_close(&mut rx, CloseReason::Removed);
        assert!(settings.client("pi1").await.unwrap().is_none());

        // Removing an offline client still forgets it.
        settings
            .add_client(ClientConfig::new("pi2", "10.0.0.3", 9000))
            .await
            .unwrap();
        assert_ok!(hub.remove_client("pi2").await);
        assert!(settings.client("pi2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_external_view_is_forwarded() {
        let TestHub { hub, control, .. } = test_hub();
        hub.open_external_view("pi1", "10.0.0.2:8080");

        assert_eq!(
            control.notifications(),
            vec![Notification::OpenExternalView {
                name: "pi1".into(),
                host: "10.0.0.2:8080".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything_then_signals() {
        let TestHub { hub, .. } = test_hub();
        let mut receivers = Vec::new();
        for name in ["a", "b", "c"] {
            let (conn, rx) = ConnectionHandle::channel();
            hub.accept(Some(name), conn);
            receivers.push(rx);
        }
        let mut signal = hub.shutdown_signal();
        assert!(!hub.is_shut_down());

        hub.shutdown().await;

        for rx in &mut receivers {
            expect_close(rx, CloseReason::Shutdown);
        }
        signal.changed().await.unwrap();
        assert!(*signal.borrow());
        assert!(hub.is_shut_down());
    }
}
