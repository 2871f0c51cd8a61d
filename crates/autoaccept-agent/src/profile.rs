//! Per-IDE selector profiles.
//!
//! The markup of each supported IDE changes between releases, so every
//! selector the automation relies on lives in an [`IdeProfile`] that the host
//! can override from configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// IDE flavor hosting the agent panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ide {
    Cursor,
    Antigravity,
    Unknown,
}

impl Ide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ide::Cursor => "cursor",
            Ide::Antigravity => "antigravity",
            Ide::Unknown => "unknown",
        }
    }

    /// Detect the flavor from an application name such as "Cursor" or
    /// "Antigravity Insiders".
    pub fn detect(app_name: &str) -> Self {
        let lower = app_name.to_lowercase();
        if lower.contains("cursor") {
            Ide::Cursor
        } else if lower.contains("antigravity") {
            Ide::Antigravity
        } else {
            Ide::Unknown
        }
    }
}

impl fmt::Display for Ide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ide {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "cursor" => Ide::Cursor,
            "antigravity" => Ide::Antigravity,
            _ => Ide::Unknown,
        })
    }
}

/// Heuristics identifying the agent/chat/dialog zone of the UI.
///
/// A non-"run" action is only clicked when one of its ancestors matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMarkers {
    /// Lowercase substrings searched in ancestor `class` attributes.
    pub class_markers: Vec<String>,
    /// Lowercase substrings searched in ancestor `id` attributes.
    pub id_markers: Vec<String>,
    /// Exact (lowercase) ancestor roles.
    pub roles: Vec<String>,
    /// How many ancestors to walk.
    pub max_depth: usize,
}

impl Default for ZoneMarkers {
    fn default() -> Self {
        Self {
            class_markers: strings(&[
                "agent",
                "cascade",
                "chat",
                "terminal-command",
                "command-dialog",
                "quick-input",
                "notification",
            ]),
            id_markers: strings(&["agent", "chat"]),
            roles: strings(&["dialog", "alertdialog"]),
            max_depth: 20,
        }
    }
}

/// Every selector the automation uses for one IDE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeProfile {
    /// Buttons considered by the background-mode click pass.
    pub action_buttons: Vec<String>,
    /// Buttons considered by the simple loop.
    pub simple_buttons: Vec<String>,
    /// Tab selectors, tried in order until one yields results.
    pub tab_selectors: Vec<String>,
    /// Control that reveals the conversation list, if the IDE hides it.
    pub tab_list_reveal: Option<String>,
    /// Elements that may carry a feedback badge.
    pub badge_selector: String,
    /// Badge texts signalling a concluded conversation.
    pub badge_texts: Vec<String>,
    /// Problem counters whose numeric text > 0 means compile errors.
    pub error_badges: String,
    /// Editor decorations marking errors.
    pub error_squiggles: String,
    /// Code containers scanned for the command behind a "Run" action.
    pub command_selectors: Vec<String>,
    /// Panels the status overlay anchors to, in priority order.
    pub panel_selectors: Vec<String>,
    pub zone: ZoneMarkers,
}

impl IdeProfile {
    pub fn cursor() -> Self {
        Self {
            action_buttons: strings(&["button", "[class*=\"button\"]", "[class*=\"anysphere\"]"]),
            simple_buttons: strings(&["button"]),
            tab_selectors: strings(&[
                "#workbench\\.parts\\.auxiliarybar ul[role=\"tablist\"] li[role=\"tab\"]",
                ".monaco-pane-view .monaco-list-row[role=\"listitem\"]",
                "div[role=\"tablist\"] div[role=\"tab\"]",
                ".chat-session-item",
            ]),
            tab_list_reveal: None,
            ..Self::common()
        }
    }

    pub fn antigravity() -> Self {
        Self {
            action_buttons: strings(&[".bg-ide-button-background"]),
            simple_buttons: strings(&["button"]),
            tab_selectors: strings(&["button.grow"]),
            tab_list_reveal: Some("[data-tooltip-id='new-conversation-tooltip']".to_string()),
            ..Self::common()
        }
    }

    fn common() -> Self {
        Self {
            action_buttons: Vec::new(),
            simple_buttons: Vec::new(),
            tab_selectors: Vec::new(),
            tab_list_reveal: None,
            badge_selector: "span".to_string(),
            badge_texts: strings(&["Good", "Bad"]),
            error_badges: ".codicon-error, .codicon-warning, [class*=\"marker-count\"]".to_string(),
            error_squiggles: ".squiggly-error".to_string(),
            command_selectors: strings(&["pre", "code"]),
            panel_selectors: strings(&[
                "#antigravity\\.agentPanel",
                "#workbench\\.parts\\.auxiliarybar",
                ".auxiliary-bar-container",
                "#workbench\\.parts\\.sidebar",
            ]),
            zone: ZoneMarkers::default(),
        }
    }
}

/// Profiles for every supported IDE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSet {
    pub cursor: IdeProfile,
    pub antigravity: IdeProfile,
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self {
            cursor: IdeProfile::cursor(),
            antigravity: IdeProfile::antigravity(),
        }
    }
}

impl ProfileSet {
    /// Profile for an IDE; `None` for [`Ide::Unknown`].
    pub fn get(&self, ide: Ide) -> Option<&IdeProfile> {
        match ide {
            Ide::Cursor => Some(&self.cursor),
            Ide::Antigravity => Some(&self.antigravity),
            Ide::Unknown => None,
        }
    }

    pub fn get_mut(&mut self, ide: Ide) -> Option<&mut IdeProfile> {
        match ide {
            Ide::Cursor => Some(&mut self.cursor),
            Ide::Antigravity => Some(&mut self.antigravity),
            Ide::Unknown => None,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ide_parse() {
        assert_eq!("Cursor".parse::<Ide>().unwrap(), Ide::Cursor);
        assert_eq!(" antigravity ".parse::<Ide>().unwrap(), Ide::Antigravity);
        assert_eq!("vscode".parse::<Ide>().unwrap(), Ide::Unknown);
    }

    #[test]
    fn test_ide_detect() {
        assert_eq!(Ide::detect("Cursor"), Ide::Cursor);
        assert_eq!(Ide::detect("Antigravity Insiders"), Ide::Antigravity);
        assert_eq!(Ide::detect("Visual Studio Code"), Ide::Unknown);
    }

    #[test]
    fn test_ide_serde() {
        assert_eq!(serde_json::to_string(&Ide::Antigravity).unwrap(), "\"antigravity\"");
        let ide: Ide = serde_json::from_str("\"cursor\"").unwrap();
        assert_eq!(ide, Ide::Cursor);
    }

    #[test]
    fn test_profile_set_lookup() {
        let set = ProfileSet::default();
        assert!(set.get(Ide::Unknown).is_none());
        assert!(set.get(Ide::Cursor).unwrap().tab_list_reveal.is_none());
        assert!(set.get(Ide::Antigravity).unwrap().tab_list_reveal.is_some());
        assert_eq!(set.cursor.tab_selectors.len(), 4);
    }

    #[test]
    fn test_zone_defaults() {
        let zone = ZoneMarkers::default();
        assert_eq!(zone.max_depth, 20);
        assert!(zone.roles.contains(&"dialog".to_string()));
    }
}
