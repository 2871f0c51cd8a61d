//! Tab label extraction.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static TIME_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\d+[smh]$").expect("valid time suffix regex"));

const MAX_LABEL_LEN: usize = 100;

/// Drop a trailing relative-time marker such as `" 5m"`.
pub fn strip_time_suffix(label: &str) -> String {
    TIME_SUFFIX_RE.replace(label.trim(), "").trim().to_string()
}

/// Human label for a tab.
///
/// Prefers the last short line of the text, skipping lines that look like
/// code, then the first 50 characters, then the `aria-label`. Relative-time
/// suffixes are stripped throughout.
pub fn tab_label(text: &str, aria_label: Option<&str>) -> Option<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    if let Some(last) = lines.last() {
        if last.chars().count() < MAX_LABEL_LEN {
            let label = strip_time_suffix(last);
            if !label.is_empty() {
                return Some(label);
            }
        }
    }
    let from_lines = lines
        .iter()
        .rev()
        .filter(|l| l.chars().count() < MAX_LABEL_LEN && !looks_like_code(l))
        .map(|l| strip_time_suffix(l))
        .find(|l| !l.is_empty());
    if from_lines.is_some() {
        return from_lines;
    }

    let head: String = text.trim().chars().take(50).collect();
    let head = strip_time_suffix(&head);
    if !head.is_empty() {
        return Some(head);
    }
    aria_label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

fn looks_like_code(line: &str) -> bool {
    line.starts_with("//") || line.starts_with("/*") || line.contains('{')
}

/// Make labels unique: repeats get `" (2)"`, `" (3)"`, ...
pub fn deduplicate_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name
            } else {
                format!("{} ({})", name, count)
            }
        })
        .collect()
}
