//! Tab names and completion tracking for one session.

use std::collections::HashMap;

use tracing::warn;

use crate::overlay::CompletionStatus;

/// Result of applying a fresh tab read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamesUpdate {
    /// Same names as before; the overlay needs no update.
    Unchanged,
    /// The read was empty and the previous names were kept.
    Retained,
    Changed,
}

#[derive(Debug, Clone, Default)]
pub struct TabState {
    tab_names: Vec<String>,
    completion_status: HashMap<String, CompletionStatus>,
    no_tab_streak: u32,
}

impl TabState {
    pub fn tab_names(&self) -> &[String] {
        &self.tab_names
    }

    pub fn completion_status(&self) -> &HashMap<String, CompletionStatus> {
        &self.completion_status
    }

    pub fn status_of(&self, name: &str) -> CompletionStatus {
        self.completion_status
            .get(name)
            .copied()
            .unwrap_or(CompletionStatus::InProgress)
    }

    /// Replace the names with a deduplicated read.
    ///
    /// New names start as in progress; names that disappeared lose their
    /// status. An empty read keeps the previous names.
    pub fn apply_read(&mut self, names: Vec<String>) -> NamesUpdate {
        if names.is_empty() {
            return NamesUpdate::Retained;
        }
        if names == self.tab_names {
            return NamesUpdate::Unchanged;
        }
        self.completion_status.retain(|name, _| names.contains(name));
        for name in &names {
            self.completion_status
                .entry(name.clone())
                .or_insert(CompletionStatus::InProgress);
        }
        self.tab_names = names;
        NamesUpdate::Changed
    }

    /// Record the status of the tab at `index`, returning its name.
    pub fn mark(&mut self, index: usize, status: CompletionStatus) -> Option<String> {
        let name = self.tab_names.get(index)?.clone();
        self.completion_status.insert(name.clone(), status);
        Some(name)
    }

    pub fn no_tab_streak(&self) -> u32 {
        self.no_tab_streak
    }

    /// Count a cycle that found no tabs. Logs the first three and every
    /// tenth occurrence.
    pub fn record_no_tabs(&mut self) -> u32 {
        self.no_tab_streak += 1;
        let streak = self.no_tab_streak;
        if streak <= 3 || streak % 10 == 0 {
            warn!("No conversation tabs found ({} cycles in a row)", streak);
        }
        streak
    }

    pub fn clear_streak(&mut self) {
        self.no_tab_streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_apply_read() {
        let mut state = TabState::default();
        assert_eq!(state.apply_read(names(&["a", "b"])), NamesUpdate::Changed);
        assert_eq!(state.status_of("a"), CompletionStatus::InProgress);

        assert_eq!(state.apply_read(names(&["a", "b"])), NamesUpdate::Unchanged);
        assert_eq!(state.apply_read(Vec::new()), NamesUpdate::Retained);
        assert_eq!(state.tab_names(), names(&["a", "b"]).as_slice());
    }

    #[test]
    fn test_status_survives_reorder_and_prunes() {
        let mut state = TabState::default();
        state.apply_read(names(&["a", "b"]));
        assert_eq!(state.mark(1, CompletionStatus::Done).as_deref(), Some("b"));

        state.apply_read(names(&["b", "c"]));
        assert_eq!(state.status_of("b"), CompletionStatus::Done);
        assert_eq!(state.status_of("c"), CompletionStatus::InProgress);
        assert!(!state.completion_status().contains_key("a"));
    }

    #[test]
    fn test_mark_out_of_range() {
        let mut state = TabState::default();
        assert!(state.mark(0, CompletionStatus::Done).is_none());
    }

    #[test]
    fn test_streak() {
        let mut state = TabState::default();
        for _ in 0..12 {
            state.record_no_tabs();
        }
        assert_eq!(state.no_tab_streak(), 12);
        state.clear_streak();
        assert_eq!(state.no_tab_streak(), 0);
    }
}
