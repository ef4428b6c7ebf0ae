//! Core abstractions for the Orka agent hub.
//!
//! This crate provides the fundamental building blocks:
//! - `ConnectionRegistry` - Name <-> live connection map
//! - `ConnectionHandle` - Addressable outbound channel of one connection
//! - `InboundEvent` / `Notification` - What flows through the hub
//! - `ConsoleFeed` - Broadcast + history for console reconnection
//! - `ControlPlane`, `SettingsStore` and `Dialer` traits

pub mod config;
pub mod connection;
pub mod event;
pub mod feed;
pub mod registry;
pub mod settings;
pub mod traits;

pub use config::HubConfig;
pub use connection::{CloseReason, ConnectionHandle, ConnectionId, Outbound};
pub use event::{InboundEvent, Notification};
pub use feed::ConsoleFeed;
pub use registry::{ConnectionRegistry, Registration, RegistryError};
pub use settings::{ClientConfig, ClientList, ServerOptions, Settings};
pub use traits::{ControlPlane, DialError, DialRequest, Dialer, SettingsError, SettingsStore};
