//! # auto-accept config
//!
//! TOML configuration for the auto-accept host: agent behavior, the
//! debugging port window, instance coordination, stats collection, cycle
//! timings and per-IDE selector overrides.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
