//! DevTools protocol driver for auto-accept.
//!
//! - [`discovery`] lists debuggable targets on a port window
//! - [`ControlChannel`] carries `Runtime.evaluate` calls to one page
//! - [`CdpInspector`] drives the injected page bridge
//! - [`RemotePageClient`] keeps one [`AgentSession`](autoaccept_agent::AgentSession)
//!   per page and resyncs them

pub mod bridge;
pub mod channel;
pub mod client;
pub mod discovery;
pub mod error;
pub mod inspector;
pub mod protocol;

#[cfg(test)]
mod testing;

pub use channel::ControlChannel;
pub use client::{CdpConfig, ConnectionKey, RemotePageClient};
pub use error::CdpError;
pub use inspector::CdpInspector;
pub use protocol::PageInfo;
