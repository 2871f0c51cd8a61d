//! Per-page automation session.
//!
//! An [`AgentSession`] owns the lifecycle of the loops running against one
//! page: the flat click loop in simple mode, or the [`TabCycler`] in
//! background mode.
//!
//! [`TabCycler`]: crate::tabs

mod agent;
mod config;
mod token;

pub use agent::{AgentSession, SessionOptions, SessionStats};
pub use config::{Mode, SessionConfig};
pub(crate) use token::{Liveness, SessionToken};

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
