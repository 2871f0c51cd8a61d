//! In-page bridge: the script injected into each page and the call format
//! used to drive it.

use autoaccept_agent::{InspectError, StatusCard};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bridge bootstrap. Evaluating it twice keeps the first instance and its
/// element handles.
pub const BRIDGE_SCRIPT: &str = include_str!("bridge_script.js");

const CALL_PREFIX: &str =
    "(globalThis.__autoAcceptBridge ? globalThis.__autoAcceptBridge.call(";
const CALL_SUFFIX: &str = ") : { missing: true })";

/// One bridge operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum BridgeRequest {
    Find { selectors: Vec<String> },
    Query { selectors: Vec<String> },
    Describe { handle: u64 },
    Ancestors { handle: u64, depth: usize },
    PreviousSiblings { handle: u64, limit: usize },
    FindWithin { handle: u64, selectors: Vec<String> },
    Click { handle: u64 },
    OverlayMount { panels: Vec<String> },
    OverlayRender { cards: Vec<StatusCard> },
    OverlayDismount,
}

impl BridgeRequest {
    /// Expression evaluating this request inside the page.
    pub fn to_expression(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{}{}{}", CALL_PREFIX, serde_json::to_string(self)?, CALL_SUFFIX))
    }

    /// Inverse of [`to_expression`](Self::to_expression).
    pub fn from_expression(expression: &str) -> Option<Self> {
        let json = expression.strip_prefix(CALL_PREFIX)?.strip_suffix(CALL_SUFFIX)?;
        serde_json::from_str(json).ok()
    }
}

/// Envelope returned by every bridge call.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BridgeReply {
    /// The bridge global was not found.
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub error: Option<String>,
    /// Handle that no longer resolves to a connected element.
    #[serde(default)]
    pub stale: Option<u64>,
}

impl BridgeReply {
    pub fn into_result(self) -> Result<Value, InspectError> {
        if self.missing {
            return Err(InspectError::BridgeMissing);
        }
        if let Some(handle) = self.stale {
            return Err(InspectError::StaleHandle(handle));
        }
        if !self.ok {
            return Err(InspectError::Script(
                self.error.unwrap_or_else(|| "bridge call failed".to_string()),
            ));
        }
        Ok(self.value)
    }
}
