//! Banned-command blocking for "run" actions.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::InspectError;
use crate::inspector::{ElementSnapshot, PageInspector};

const MAX_LEVELS: usize = 10;
const MAX_SIBLINGS: usize = 5;
const ENOUGH_TEXT: usize = 10;

/// One entry of the banned-command list, compiled once.
#[derive(Debug, Clone)]
pub enum BannedPattern {
    /// Case-insensitive substring.
    Literal { raw: String, lower: String },
    /// `/body/flags` pattern.
    Regex { raw: String, regex: Regex },
}

impl BannedPattern {
    /// Parse a configured entry. Empty entries yield `None`.
    ///
    /// `/body/flags` entries compile to a regex honouring the `i`, `m`, `s`
    /// and `x` flags (others are ignored). Without `i` the regex is case
    /// sensitive, unlike literal entries. An entry whose regex fails to
    /// compile is matched as a literal.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(regex) = compile_slash_regex(raw) {
            return Some(BannedPattern::Regex {
                raw: raw.to_string(),
                regex,
            });
        }
        Some(BannedPattern::Literal {
            raw: raw.to_string(),
            lower: raw.to_lowercase(),
        })
    }

    pub fn raw(&self) -> &str {
        match self {
            BannedPattern::Literal { raw, .. } | BannedPattern::Regex { raw, .. } => raw,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            BannedPattern::Literal { lower, .. } => text.to_lowercase().contains(lower.as_str()),
            BannedPattern::Regex { regex, .. } => regex.is_match(text),
        }
    }
}

fn compile_slash_regex(raw: &str) -> Option<Regex> {
    if !raw.starts_with('/') {
        return None;
    }
    let last = raw.rfind('/')?;
    if last == 0 {
        return None;
    }
    let body = &raw[1..last];
    let flags = &raw[last + 1..];

    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            _ => continue,
        };
    }
    match builder.build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            debug!("Banned pattern {} is not a valid regex, matching literally: {}", raw, e);
            None
        }
    }
}

/// Parse a configured list, dropping empty entries.
pub fn parse_patterns(list: &[String]) -> Vec<BannedPattern> {
    list.iter().filter_map(|p| BannedPattern::parse(p)).collect()
}

/// First pattern matching `text`. Empty text never matches.
pub fn is_banned<'a>(text: &str, patterns: &'a [BannedPattern]) -> Option<&'a BannedPattern> {
    if text.trim().is_empty() {
        return None;
    }
    patterns.iter().find(|p| p.matches(text))
}

/// Holds the active banned list and counts blocked actions.
#[derive(Debug, Default)]
pub struct CommandGuard {
    patterns: RwLock<Vec<BannedPattern>>,
    blocked: AtomicU64,
}

impl CommandGuard {
    pub fn new(list: &[String]) -> Self {
        Self {
            patterns: RwLock::new(parse_patterns(list)),
            blocked: AtomicU64::new(0),
        }
    }

    /// Replace the whole list at once.
    pub fn update(&self, list: &[String]) {
        let parsed = parse_patterns(list);
        debug!("Banned command list updated ({} patterns)", parsed.len());
        *self.patterns.write() = parsed;
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.read().len()
    }

    /// Returns the matching pattern and counts the block, if `text` is banned.
    pub fn check(&self, text: &str) -> Option<String> {
        let patterns = self.patterns.read();
        let hit = is_banned(text, &patterns)?;
        self.blocked.fetch_add(1, Ordering::Relaxed);
        warn!(
            "Blocked command matching banned pattern {:?}: {}",
            hit.raw(),
            preview(text)
        );
        Some(hit.raw().to_string())
    }

    pub fn blocked_count(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }

    /// Read and zero the blocked counter.
    pub fn take_blocked(&self) -> u64 {
        self.blocked.swap(0, Ordering::Relaxed)
    }
}

/// Best-effort recovery of the command a "run" action would execute.
///
/// Walks from the element up through its ancestors and gathers code text
/// from the nearest preceding siblings, then appends the element's
/// `aria-label` and `title`.
pub async fn extract_nearby_command_text(
    inspector: &dyn PageInspector,
    element: &ElementSnapshot,
    command_selectors: &[String],
) -> Result<String, InspectError> {
    let ancestors = inspector
        .ancestors_of(element.handle, MAX_LEVELS - 1)
        .await?;
    let levels = std::iter::once(element).chain(ancestors.iter());

    let mut parts: Vec<String> = Vec::new();
    for node in levels {
        let siblings = match inspector.previous_siblings(node.handle, MAX_SIBLINGS).await {
            Ok(siblings) => siblings,
            Err(InspectError::StaleHandle(_)) => continue,
            Err(e) => return Err(e),
        };
        for sibling in siblings {
            if sibling.is_code_block() {
                push_text(&mut parts, &sibling.text);
            } else {
                for code in inspector.find_within(sibling.handle, command_selectors).await? {
                    push_text(&mut parts, &code.text);
                }
            }
        }
        if parts.iter().map(|p| p.len()).sum::<usize>() > ENOUGH_TEXT {
            break;
        }
    }

    for attr in ["aria-label", "title"] {
        if let Some(value) = element.attr(attr) {
            push_text(&mut parts, value);
        }
    }
    Ok(parts.join(" "))
}

fn push_text(parts: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        parts.push(text.to_string());
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(80).collect();
    if text.chars().count() > 80 {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
