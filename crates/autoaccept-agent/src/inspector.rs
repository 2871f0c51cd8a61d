//! Page inspection capability.
//!
//! The automation core never touches a DOM directly. It asks a
//! [`PageInspector`] for opaque element handles and snapshots, which lets the
//! same classifier, guard and cycler run against a remote webview or the
//! in-memory page used in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InspectError;

/// Opaque reference to an element inside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub u64);

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Layout facts about an element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    /// False when the element or one of its ancestors is not rendered.
    pub displayed: bool,
}

impl Layout {
    /// Whether the element occupies space on screen.
    pub fn is_laid_out(&self) -> bool {
        self.displayed && self.width > 0.0 && self.height > 0.0
    }
}

/// Point-in-time description of an element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    pub handle: ElementHandle,
    /// Lowercase tag name.
    pub tag: String,
    /// Visible text, trimmed. Empty when the inspector skipped text.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub disabled: bool,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn class_name(&self) -> &str {
        self.attr("class").unwrap_or("")
    }

    pub fn id(&self) -> &str {
        self.attr("id").unwrap_or("")
    }

    pub fn role(&self) -> &str {
        self.attr("role").unwrap_or("")
    }

    /// Whether the tag itself is a code container (`pre`/`code`).
    pub fn is_code_block(&self) -> bool {
        matches!(self.tag.as_str(), "pre" | "code")
    }
}

/// Read/act access to a page's element tree.
///
/// Selectors are CSS selector strings. Implementations search every
/// reachable frame of the page.
#[async_trait]
pub trait PageInspector: Send + Sync {
    /// Elements matching any of the selectors, in document order.
    async fn find_candidates(&self, selectors: &[String]) -> Result<Vec<ElementHandle>, InspectError>;

    /// Snapshot of a single element.
    async fn describe(&self, handle: ElementHandle) -> Result<ElementSnapshot, InspectError>;

    /// Ancestors of an element, nearest first, at most `max_depth` of them.
    /// Ancestor snapshots may carry empty text.
    async fn ancestors_of(
        &self,
        handle: ElementHandle,
        max_depth: usize,
    ) -> Result<Vec<ElementSnapshot>, InspectError>;

    /// Preceding element siblings, nearest first.
    async fn previous_siblings(
        &self,
        handle: ElementHandle,
        limit: usize,
    ) -> Result<Vec<ElementSnapshot>, InspectError>;

    /// Descendants of `handle` matching any of the selectors.
    async fn find_within(
        &self,
        handle: ElementHandle,
        selectors: &[String],
    ) -> Result<Vec<ElementSnapshot>, InspectError>;

    /// Dispatch a click on the element.
    async fn click(&self, handle: ElementHandle) -> Result<(), InspectError>;

    /// Snapshots of every element matching the selectors.
    ///
    /// Remote inspectors override this to avoid one round trip per element.
    async fn query(&self, selectors: &[String]) -> Result<Vec<ElementSnapshot>, InspectError> {
        let mut out = Vec::new();
        for handle in self.find_candidates(selectors).await? {
            match self.describe(handle).await {
                Ok(snapshot) => out.push(snapshot),
                Err(InspectError::StaleHandle(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn text_of(&self, handle: ElementHandle) -> Result<String, InspectError> {
        Ok(self.describe(handle).await?.text)
    }

    async fn attributes_of(
        &self,
        handle: ElementHandle,
    ) -> Result<HashMap<String, String>, InspectError> {
        Ok(self.describe(handle).await?.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_laid_out() {
        let layout = Layout { width: 10.0, height: 5.0, displayed: true };
        assert!(layout.is_laid_out());

        let hidden = Layout { displayed: false, ..layout.clone() };
        assert!(!hidden.is_laid_out());

        let zero = Layout { width: 0.0, ..layout };
        assert!(!zero.is_laid_out());
    }

    #[test]
    fn test_snapshot_deserialize() {
        let json = r#"{
            "handle": 3,
            "tag": "button",
            "text": "Accept",
            "attributes": {"class": "primary", "role": "button"},
            "layout": {"width": 40.0, "height": 20.0, "displayed": true}
        }"#;
        let snap: ElementSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.handle, ElementHandle(3));
        assert_eq!(snap.class_name(), "primary");
        assert_eq!(snap.role(), "button");
        assert_eq!(snap.id(), "");
        assert!(!snap.disabled);
        assert!(!snap.is_code_block());
    }
}
