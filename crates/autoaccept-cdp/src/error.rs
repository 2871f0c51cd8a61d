//! DevTools protocol error types.

use autoaccept_agent::InspectError;
use thiserror::Error;

/// Errors raised while talking to a debuggable page.
#[derive(Debug, Error)]
pub enum CdpError {
    /// The WebSocket handshake failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The page answered a command with a protocol error.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error during discovery.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The evaluated script threw.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// Timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The control channel is gone.
    #[error("Channel closed")]
    ChannelClosed,

    /// Invalid response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CdpError::Timeout(e.to_string())
        } else {
            CdpError::Http(e.to_string())
        }
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

impl From<CdpError> for InspectError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::JavaScript(msg) => InspectError::Script(msg),
            CdpError::Protocol { code, message } => {
                InspectError::Script(format!("{} (code: {})", message, code))
            }
            CdpError::Serialization(e) => InspectError::InvalidResponse(e.to_string()),
            CdpError::InvalidResponse(msg) => InspectError::InvalidResponse(msg),
            other => InspectError::Transport(other.to_string()),
        }
    }
}
