//! Event routing between agent connections and the control plane.

use orka_core::{
    CloseReason, ConnectionHandle, InboundEvent,
    traits::{ControlPlane, Dialer, SettingsStore},
};
use serde_json::Value;

use crate::Hub;

/// What happened to an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Forwarded with the sender's registered name.
    Attributed,
    /// Forwarded without a name; the sender is not registered.
    Unattributed,
    /// Dropped as a protocol violation.
    Rejected,
}

impl<C, S, D> Hub<C, S, D>
where
    C: ControlPlane,
    S: SettingsStore,
    D: Dialer,
{
    /// Forward an event received on `from` to the control plane.
    ///
    /// Telemetry from an unregistered connection is dropped and the
    /// connection closed; everything else is forwarded with whatever name
    /// the registry knows at this instant.
    pub fn route_inbound(&self, from: &ConnectionHandle, event: InboundEvent) -> Routed {
        let name = self.registry.resolve_name(from.id());
        let routed = if name.is_some() {
            Routed::Attributed
        } else {
            Routed::Unattributed
        };

        match event {
            InboundEvent::Stats(data) => {
                let Some(name) = name else {
                    tracing::warn!(connection = %from.id(), "Unregistered client is sending stats");
                    from.close(CloseReason::ProtocolViolation);
                    return Routed::Rejected;
                };
                self.control.stats_received(&name, data);
            }
            InboundEvent::Output(output) => self.control.output_received(name, output),
            InboundEvent::Alert(message) => {
                tracing::info!(name = ?name, %message, "Client alert");
                self.control.alert_received(name, message);
            }
            InboundEvent::SystemInfo(data) => self.control.system_info_received(name, data),
        }

        routed
    }

    /// Send a command to the client registered as `name`.
    ///
    /// Commands for clients that are not connected are dropped without
    /// error. Returns whether the command was handed to a live connection.
    pub fn send_command(&self, name: &str, command: Value) -> bool {
        let Some(connection) = self.registry.resolve_connection(name) else {
            tracing::debug!(name = %name, "Dropping command for offline client");
            return false;
        };
        let sent = connection.send_command(command);
        if !sent {
            tracing::debug!(name = %name, connection = %connection.id(), "Connection closed before command");
        }
        sent
    }
}
