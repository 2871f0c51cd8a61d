//! The background loop that walks the conversation tabs.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::names::{deduplicate_names, tab_label};
use super::state::{NamesUpdate, TabState};
use crate::clicker::Clicker;
use crate::error::InspectError;
use crate::inspector::ElementHandle;
use crate::overlay::{CompletionStatus, OverlayPresenter};
use crate::profile::IdeProfile;
use crate::scanner::{collect_candidates, first_matching_set, has_compilation_errors, has_feedback_badge};
use crate::session::SessionToken;

/// Delays of one background cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTimings {
    /// Pause between the click pass and opening the tab list.
    pub pre_open: Duration,
    /// Interval between tab list reads.
    pub tab_poll: Duration,
    /// Give up waiting for tabs after this long.
    pub tab_wait: Duration,
    /// Pause after switching tabs before checking the result.
    pub settle: Duration,
    /// Pause between cycles.
    pub cycle: Duration,
}

impl Default for CycleTimings {
    fn default() -> Self {
        Self {
            pre_open: Duration::from_millis(800),
            tab_poll: Duration::from_millis(300),
            tab_wait: Duration::from_millis(5000),
            settle: Duration::from_millis(1500),
            cycle: Duration::from_millis(3000),
        }
    }
}

/// Drives the background loop of one session generation.
pub(crate) struct TabCycler {
    clicker: Clicker,
    presenter: Arc<OverlayPresenter>,
    state: Arc<Mutex<TabState>>,
    profile: IdeProfile,
    timings: CycleTimings,
    token: SessionToken,
    index: usize,
}

impl TabCycler {
    pub(crate) fn new(
        clicker: Clicker,
        presenter: Arc<OverlayPresenter>,
        state: Arc<Mutex<TabState>>,
        profile: IdeProfile,
        timings: CycleTimings,
        token: SessionToken,
    ) -> Self {
        Self {
            clicker,
            presenter,
            state,
            profile,
            timings,
            token,
            index: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Background cycling started (generation {})", self.token.generation());
        while self.token.is_live() {
            if let Err(e) = self.cycle().await {
                warn!("Background cycle failed: {}", e);
            }
            if !self.token.sleep(self.timings.cycle).await {
                break;
            }
        }
        debug!("Background cycling for generation {} ended", self.token.generation());
    }

    /// One full cycle. Returns early, without error, once the token goes
    /// stale.
    pub(crate) async fn cycle(&mut self) -> Result<(), InspectError> {
        let inspector = self.clicker.inspector();

        if !has_feedback_badge(inspector, &self.profile).await? {
            let clicked = self
                .clicker
                .run_pass(&self.profile.action_buttons, &self.token)
                .await?;
            if clicked > 0 {
                debug!("Clicked {} action(s) in the focused conversation", clicked);
            }
        }

        if !self.token.sleep(self.timings.pre_open).await {
            return Ok(());
        }

        if let Some(reveal) = &self.profile.tab_list_reveal {
            let controls = collect_candidates(inspector, std::slice::from_ref(reveal)).await?;
            if let Some(control) = controls.first() {
                if !self.token.is_live() {
                    return Ok(());
                }
                if let Err(e) = inspector.click(*control).await {
                    debug!("Failed to open the conversation list: {}", e);
                }
            }
        }

        let Some(tabs) = self.wait_for_tabs().await else {
            return Ok(());
        };
        if !self.token.is_live() {
            return Ok(());
        }
        if tabs.is_empty() {
            self.state.lock().record_no_tabs();
            return Ok(());
        }
        self.state.lock().clear_streak();

        let names = self.read_names(&tabs).await;
        if !self.token.is_live() {
            return Ok(());
        }
        let update = self.state.lock().apply_read(names);
        if update == NamesUpdate::Changed {
            let (names, statuses) = {
                let state = self.state.lock();
                (state.tab_names().to_vec(), state.completion_status().clone())
            };
            self.presenter
                .load(&names, |name| {
                    statuses
                        .get(name)
                        .copied()
                        .unwrap_or(CompletionStatus::InProgress)
                })
                .await;
        }

        let target = self.index % tabs.len();
        self.index = self.index.wrapping_add(1);
        if !self.token.is_live() {
            return Ok(());
        }
        inspector.click(tabs[target]).await?;

        if !self.token.sleep(self.timings.settle).await {
            return Ok(());
        }

        if has_feedback_badge(inspector, &self.profile).await? {
            let status = if has_compilation_errors(inspector, &self.profile).await? {
                CompletionStatus::DoneWithErrors
            } else {
                CompletionStatus::Done
            };
            if !self.token.is_live() {
                return Ok(());
            }
            let marked = self.state.lock().mark(target, status);
            if let Some(name) = marked {
                info!("Conversation {:?} concluded ({:?})", name, status);
                self.presenter.mark(&name, status).await;
            }
        }
        Ok(())
    }

    /// Poll the tab selector groups until one yields tabs or the wait
    /// expires. `None` when the token went stale meanwhile.
    async fn wait_for_tabs(&self) -> Option<Vec<ElementHandle>> {
        let inspector = self.clicker.inspector();
        let deadline = Instant::now() + self.timings.tab_wait;
        loop {
            let tabs = first_matching_set(inspector, &self.profile.tab_selectors).await;
            if !tabs.is_empty() {
                return Some(tabs);
            }
            if Instant::now() >= deadline {
                return Some(Vec::new());
            }
            if !self.token.sleep(self.timings.tab_poll).await {
                return None;
            }
        }
    }

    async fn read_names(&self, tabs: &[ElementHandle]) -> Vec<String> {
        let inspector = self.clicker.inspector();
        let mut names = Vec::with_capacity(tabs.len());
        for (i, tab) in tabs.iter().enumerate() {
            let label = match inspector.describe(*tab).await {
                Ok(snapshot) => tab_label(&snapshot.text, snapshot.attr("aria-label")),
                Err(e) => {
                    debug!("Failed to read tab {}: {}", tab, e);
                    None
                }
            };
            names.push(label.unwrap_or_else(|| format!("Tab {}", i + 1)));
        }
        deduplicate_names(names)
    }
}

#[cfg(test)]
#[path = "cycler_tests.rs"]
mod tests;
