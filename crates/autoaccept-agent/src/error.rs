//! Page inspection errors.

use thiserror::Error;

/// Errors raised while inspecting or acting on a page.
///
/// All of these are recoverable from the session's point of view: a failing
/// element is skipped and a failing cycle is logged and retried.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The element behind a handle is gone (re-render, navigation).
    #[error("Stale element handle: {0}")]
    StaleHandle(u64),

    /// The page no longer carries the injected bridge.
    #[error("Page bridge is not installed")]
    BridgeMissing,

    /// Script evaluation inside the page failed.
    #[error("Page script error: {0}")]
    Script(String),

    /// The transport to the page failed or timed out.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The page answered with something we could not decode.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<serde_json::Error> for InspectError {
    fn from(e: serde_json::Error) -> Self {
        InspectError::InvalidResponse(e.to_string())
    }
}
