//! Connection lifecycle and event routing for the Orka agent hub.
//!
//! Provides:
//! - `Hub` - Registry owner wired to its control plane, settings and dialer
//! - Lifecycle operations (accept, teardown, dial, remove, shutdown)
//! - Event routing in both directions

pub mod hub;
pub mod lifecycle;
pub mod router;

#[cfg(test)]
mod testing;

pub use hub::Hub;
pub use router::Routed;
