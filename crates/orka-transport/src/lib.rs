//! Network transport for the Orka agent hub.
//!
//! Provides:
//! - Wire protocol for agents and consoles (JSON)
//! - Agent and console WebSocket endpoints
//! - WebSocket dialer for reaching known agents
//! - Router assembly

pub mod agent;
pub mod app;
pub mod console;
pub mod dial;
pub mod protocol;

pub use app::hub_router;
pub use dial::WsDialer;
pub use protocol::{ConsoleReply, ConsoleRequest, HubMessage};
