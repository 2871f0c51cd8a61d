//! Decides whether an element is an action the session should click.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::error::InspectError;
use crate::inspector::{ElementSnapshot, PageInspector};
use crate::profile::ZoneMarkers;

static ACCEPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(run|accept|retry|apply|execute|allow)").expect("valid accept regex")
});

static REJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(skip|reject|cancel|close|refine|always|ask every|undo|confirm)")
        .expect("valid reject regex")
});

static RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^run").expect("valid run regex"));

const MAX_TEXT_LEN: usize = 50;

const SELECTOR_ROLES: &[&str] = &[
    "option",
    "menuitem",
    "menuitemradio",
    "menuitemcheckbox",
    "listbox",
];

/// Why an element was not considered actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Disabled,
    NotLaidOut,
    EmptyText,
    TextTooLong,
    RejectPattern,
    NoAcceptPattern,
    SelectorRole,
    Selected,
    OutsideZone,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::Disabled => "disabled",
            RejectReason::NotLaidOut => "not laid out",
            RejectReason::EmptyText => "empty text",
            RejectReason::TextTooLong => "text too long",
            RejectReason::RejectPattern => "reject pattern",
            RejectReason::NoAcceptPattern => "no accept pattern",
            RejectReason::SelectorRole => "selector role",
            RejectReason::Selected => "selected item",
            RejectReason::OutsideZone => "outside agent zone",
        };
        f.write_str(s)
    }
}

/// Classification result for one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Actionable {
        text: String,
        /// "Run" actions execute a command and must pass the guard.
        is_run: bool,
    },
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_actionable(&self) -> bool {
        matches!(self, Verdict::Actionable { .. })
    }
}

/// Text-level check shared by every IDE.
///
/// Accepts labels of 1 to 50 characters that start with an accept verb and
/// not with a reject verb.
pub fn is_actionable_text(text: &str) -> bool {
    text_verdict(text).is_ok()
}

fn text_verdict(text: &str) -> Result<(), RejectReason> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RejectReason::EmptyText);
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(RejectReason::TextTooLong);
    }
    if REJECT_RE.is_match(text) {
        return Err(RejectReason::RejectPattern);
    }
    if !ACCEPT_RE.is_match(text) {
        return Err(RejectReason::NoAcceptPattern);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ActionClassifier {
    zone: ZoneMarkers,
}

impl ActionClassifier {
    pub fn new(zone: ZoneMarkers) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> &ZoneMarkers {
        &self.zone
    }

    /// Everything that can be decided from the element alone.
    pub fn classify_snapshot(&self, snapshot: &ElementSnapshot) -> Verdict {
        if snapshot.disabled {
            return Verdict::Rejected(RejectReason::Disabled);
        }
        if !snapshot.layout.is_laid_out() {
            return Verdict::Rejected(RejectReason::NotLaidOut);
        }
        if let Err(reason) = text_verdict(&snapshot.text) {
            return Verdict::Rejected(reason);
        }
        let role = snapshot.role().to_lowercase();
        if SELECTOR_ROLES.contains(&role.as_str()) {
            return Verdict::Rejected(RejectReason::SelectorRole);
        }
        if snapshot.attr("aria-selected").is_some() {
            return Verdict::Rejected(RejectReason::Selected);
        }
        let text = snapshot.text.trim().to_string();
        let is_run = RUN_RE.is_match(&text);
        Verdict::Actionable { text, is_run }
    }

    /// Whether any of the ancestors marks the agent/chat/dialog zone.
    pub fn in_agent_zone(&self, ancestors: &[ElementSnapshot]) -> bool {
        ancestors.iter().take(self.zone.max_depth).any(|a| {
            let class = a.class_name().to_lowercase();
            let id = a.id().to_lowercase();
            let role = a.role().to_lowercase();
            self.zone.class_markers.iter().any(|m| class.contains(m.as_str()))
                || self.zone.id_markers.iter().any(|m| id.contains(m.as_str()))
                || self.zone.roles.iter().any(|r| *r == role)
        })
    }

    /// Full classification including the zone walk for non-"run" actions.
    ///
    /// "Run" actions skip the zone check; the caller must send them through
    /// the command guard instead.
    pub async fn evaluate(
        &self,
        inspector: &dyn PageInspector,
        snapshot: &ElementSnapshot,
    ) -> Result<Verdict, InspectError> {
        let verdict = self.classify_snapshot(snapshot);
        match &verdict {
            Verdict::Actionable { is_run: false, .. } => {
                let ancestors = inspector
                    .ancestors_of(snapshot.handle, self.zone.max_depth)
                    .await?;
                if self.in_agent_zone(&ancestors) {
                    Ok(verdict)
                } else {
                    trace!("{} {:?} is outside the agent zone", snapshot.handle, snapshot.text);
                    Ok(Verdict::Rejected(RejectReason::OutsideZone))
                }
            }
            _ => Ok(verdict),
        }
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
