//! Per-IDE selector overrides.

use serde::{Deserialize, Serialize};

/// Replaces parts of a built-in IDE profile. Unset fields keep the
/// built-in value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverride {
    #[serde(default)]
    pub action_buttons: Option<Vec<String>>,

    #[serde(default)]
    pub simple_buttons: Option<Vec<String>>,

    /// Tried in order until one yields tabs.
    #[serde(default)]
    pub tab_selectors: Option<Vec<String>>,

    #[serde(default)]
    pub tab_list_reveal: Option<String>,

    #[serde(default)]
    pub badge_selector: Option<String>,

    #[serde(default)]
    pub badge_texts: Option<Vec<String>>,

    #[serde(default)]
    pub error_badges: Option<String>,

    #[serde(default)]
    pub error_squiggles: Option<String>,

    #[serde(default)]
    pub command_selectors: Option<Vec<String>>,

    #[serde(default)]
    pub panel_selectors: Option<Vec<String>>,
}

impl ProfileOverride {
    /// Every selector the override sets, with its field name.
    pub fn selectors(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        let lists = [
            ("action_buttons", &self.action_buttons),
            ("simple_buttons", &self.simple_buttons),
            ("tab_selectors", &self.tab_selectors),
            ("command_selectors", &self.command_selectors),
            ("panel_selectors", &self.panel_selectors),
        ];
        for (field, list) in lists {
            for selector in list.iter().flatten() {
                out.push((field, selector.as_str()));
            }
        }
        let singles = [
            ("tab_list_reveal", &self.tab_list_reveal),
            ("badge_selector", &self.badge_selector),
            ("error_badges", &self.error_badges),
            ("error_squiggles", &self.error_squiggles),
        ];
        for (field, single) in singles {
            if let Some(selector) = single {
                out.push((field, selector.as_str()));
            }
        }
        out
    }
}
