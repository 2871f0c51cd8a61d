use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::error::InspectError;
use crate::inspector::{ElementHandle, ElementSnapshot, PageInspector};
use crate::memory::{ClickAction, MemoryPage, NodeSpec};
use crate::overlay::{CompletionStatus, OverlaySurface, StatusCard};
use crate::profile::Ide;

fn session(page: &MemoryPage) -> AgentSession {
    AgentSession::for_page(Arc::new(page.clone()), SessionOptions::default())
}

fn background(ide: Ide) -> SessionConfig {
    SessionConfig {
        background_mode: true,
        ..SessionConfig::new(ide)
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Accept button inside a chat zone that disappears once clicked.
fn chat_with_accept(page: &MemoryPage) -> ElementHandle {
    let chat = page.append(page.root(), NodeSpec::new("div").class("chat-widget"));
    let accept = page.append(chat, NodeSpec::new("button").text("Accept"));
    page.on_click(accept, vec![ClickAction::Detach(accept)]);
    accept
}

struct CursorTabs {
    tabs: Vec<ElementHandle>,
    badge: ElementHandle,
}

/// Cursor auxiliary bar with two tabs. Focusing the first shows a feedback
/// badge, focusing the second hides it.
fn cursor_tabs(page: &MemoryPage) -> CursorTabs {
    let bar = page.append(page.root(), NodeSpec::new("div").id("workbench.parts.auxiliarybar"));
    let list = page.append(bar, NodeSpec::new("ul").role("tablist"));
    let first = page.append(list, NodeSpec::new("li").role("tab").text("Fix bug 2m"));
    let second = page.append(list, NodeSpec::new("li").role("tab").text("Write docs"));
    let badge = page.append(page.root(), NodeSpec::new("span").text("Good"));
    page.detach(badge);
    page.on_click(first, vec![ClickAction::Attach(badge)]);
    page.on_click(second, vec![ClickAction::Detach(badge)]);
    CursorTabs {
        tabs: vec![first, second],
        badge,
    }
}

#[tokio::test(start_paused = true)]
async fn test_simple_mode_clicks_and_counts() {
    let page = MemoryPage::new();
    let accept = chat_with_accept(&page);
    let session = session(&page);

    session.start(SessionConfig::new(Ide::Cursor)).await;
    advance(10).await;
    assert!(session.is_running());
    assert_eq!(session.mode(), Some(Mode::Simple));
    assert_eq!(page.click_count(accept), 1);
    assert_eq!(session.stats(), SessionStats { clicks: 1, blocked: 0 });

    assert_eq!(session.reset_stats().clicks, 1);
    assert_eq!(session.stats(), SessionStats::default());
}

#[tokio::test(start_paused = true)]
async fn test_simple_mode_blocks_banned_run() {
    let page = MemoryPage::new();
    let block = page.append(page.root(), NodeSpec::new("div"));
    page.append(block, NodeSpec::new("code").text("chmod -R 777 / "));
    let run = page.append(block, NodeSpec::new("button").text("Run"));
    let session = session(&page);

    let config = SessionConfig {
        banned_patterns: vec!["chmod -R 777 /".to_string()],
        ..SessionConfig::new(Ide::Cursor)
    };
    session.start(config).await;
    advance(10).await;
    assert_eq!(page.click_count(run), 0);
    assert_eq!(session.stats().blocked, 1);

    // A cleared list lets the next poll through.
    session.update_banned_patterns(&[]);
    advance(1000).await;
    assert_eq!(page.click_count(run), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_beside_banned_command_is_blocked() {
    let page = MemoryPage::new();
    let block = page.append(page.root(), NodeSpec::new("div"));
    page.append(block, NodeSpec::new("code").text("rm -rf node_modules && npm install"));
    let run = page.append(block, NodeSpec::new("button").text("Run npm install"));
    page.on_click(run, vec![ClickAction::Detach(block)]);
    let session = session(&page);

    let config = SessionConfig {
        banned_patterns: vec!["rm -rf".to_string()],
        ..SessionConfig::new(Ide::Cursor)
    };
    session.start(config).await;
    advance(10).await;
    assert_eq!(session.stats(), SessionStats { clicks: 0, blocked: 1 });
    assert!(page.clicks().is_empty());
    assert!(page.describe(run).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_identical_start_is_noop() {
    let page = MemoryPage::new();
    let session = session(&page);

    session.start(SessionConfig::new(Ide::Cursor)).await;
    let generation = session.generation();

    let again = SessionConfig {
        poll_interval_ms: 250,
        ..SessionConfig::new(Ide::Cursor)
    };
    session.start(again).await;
    assert_eq!(session.generation(), generation);
    assert_eq!(session.poll_interval_ms(), 250);

    session.start(background(Ide::Cursor)).await;
    assert_eq!(session.generation(), generation + 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_loop() {
    let page = MemoryPage::new();
    let session = session(&page);
    session.start(SessionConfig::new(Ide::Cursor)).await;
    advance(10).await;

    session.stop().await;
    assert!(!session.is_running());
    assert_eq!(session.mode(), None);

    let accept = chat_with_accept(&page);
    advance(5000).await;
    assert_eq!(page.click_count(accept), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let page = MemoryPage::new();
    let session = session(&page);
    session.start(SessionConfig::new(Ide::Cursor)).await;
    session.stop().await;
    session.start(SessionConfig::new(Ide::Cursor)).await;
    assert!(session.is_running());
    assert_eq!(session.generation(), 2);

    let accept = chat_with_accept(&page);
    advance(1100).await;
    assert_eq!(page.click_count(accept), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_ide_takes_no_action() {
    let page = MemoryPage::new();
    let accept = chat_with_accept(&page);
    let session = session(&page);

    session.start(SessionConfig::new(Ide::Unknown)).await;
    assert!(session.is_running());
    advance(5000).await;
    assert_eq!(page.click_count(accept), 0);
    assert!(page.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_background_cycle_marks_concluded_tab() {
    let page = MemoryPage::new();
    let accept = chat_with_accept(&page);
    let fixture = cursor_tabs(&page);
    let session = session(&page);

    session.start(background(Ide::Cursor)).await;
    assert!(page.overlay_mounted());
    assert_eq!(
        page.overlay_panel().as_deref(),
        Some("#workbench\\.parts\\.auxiliarybar")
    );

    // Click pass, 800ms pre-open, tab switch, 1500ms settle.
    advance(2400).await;
    assert_eq!(page.click_count(accept), 1);
    assert_eq!(page.clicks()[1], fixture.tabs[0]);
    assert_eq!(session.tab_names(), vec!["Fix bug", "Write docs"]);

    let status = session.completion_status();
    assert_eq!(status["Fix bug"], CompletionStatus::Done);
    assert_eq!(status["Write docs"], CompletionStatus::InProgress);

    let cards = page.overlay_cards();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].status, CompletionStatus::Done);

    // Next cycle moves on to the second tab, which has no badge.
    advance(5400).await;
    assert_eq!(page.click_count(fixture.tabs[1]), 1);
    assert_eq!(
        session.completion_status()["Write docs"],
        CompletionStatus::InProgress
    );
    assert!(matches!(
        page.describe(fixture.badge).await,
        Err(InspectError::StaleHandle(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_background_cycle_reports_errors() {
    let page = MemoryPage::new();
    let fixture = cursor_tabs(&page);
    page.append(page.root(), NodeSpec::new("div").class("marker-count").text("3"));
    let session = session(&page);

    session.start(background(Ide::Cursor)).await;
    advance(2400).await;
    assert_eq!(page.click_count(fixture.tabs[0]), 1);
    assert_eq!(
        session.completion_status()["Fix bug"],
        CompletionStatus::DoneWithErrors
    );
}

#[tokio::test(start_paused = true)]
async fn test_background_without_tabs_keeps_running() {
    let page = MemoryPage::new();
    let session = session(&page);

    session.start(background(Ide::Antigravity)).await;
    // Pre-open plus the full tab wait, twice.
    advance(2 * (800 + 5000 + 3000) + 500).await;
    assert!(session.is_running());
    assert!(session.tab_names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_antigravity_reveals_tab_list() {
    let page = MemoryPage::new();
    let reveal = page.append(
        page.root(),
        NodeSpec::new("div").attr("data-tooltip-id", "new-conversation-tooltip"),
    );
    let list = page.append(page.root(), NodeSpec::new("div"));
    page.detach(list);
    page.append(list, NodeSpec::new("button").class("grow").text("Refactor\n3h"));
    page.on_click(reveal, vec![ClickAction::Attach(list)]);
    let session = session(&page);

    session.start(background(Ide::Antigravity)).await;
    advance(1000).await;
    assert_eq!(page.click_count(reveal), 1);
    assert_eq!(session.tab_names(), vec!["Refactor"]);
}

#[tokio::test(start_paused = true)]
async fn test_leaving_background_dismounts_overlay() {
    let page = MemoryPage::new();
    let session = session(&page);

    session.start(background(Ide::Cursor)).await;
    assert!(page.overlay_mounted());

    session.start(SessionConfig::new(Ide::Cursor)).await;
    assert!(!page.overlay_mounted());
    assert_eq!(session.mode(), Some(Mode::Simple));
    assert_eq!(session.generation(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hide_overlay_keeps_session() {
    let page = MemoryPage::new();
    let session = session(&page);

    session.start(background(Ide::Cursor)).await;
    session.hide_overlay().await;
    assert!(!page.overlay_mounted());
    assert!(session.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_stop_dismounts_overlay() {
    let page = MemoryPage::new();
    let session = session(&page);

    session.start(background(Ide::Cursor)).await;
    session.stop().await;
    assert!(!page.overlay_mounted());
    assert!(!session.is_running());
}

#[test]
fn test_zero_poll_interval_ignored() {
    let page = MemoryPage::new();
    let session = session(&page);
    session.update_poll_interval(0);
    assert_eq!(session.poll_interval_ms(), 1000);
    session.update_poll_interval(200);
    assert_eq!(session.poll_interval_ms(), 200);
}

#[tokio::test(start_paused = true)]
async fn test_background_overlay_lists_deduplicated_tabs() {
    let page = MemoryPage::new();
    let bar = page.append(page.root(), NodeSpec::new("div").id("workbench.parts.auxiliarybar"));
    let list = page.append(bar, NodeSpec::new("ul").role("tablist"));
    for label in ["Refactor", "Refactor", "Tests"] {
        page.append(list, NodeSpec::new("li").role("tab").text(label));
    }
    let session = session(&page);

    session.start(background(Ide::Cursor)).await;
    advance(1000).await;

    let cards = page.overlay_cards();
    let names: Vec<&str> = cards.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Refactor", "Refactor (2)", "Tests"]);
    assert!(cards.iter().all(|c| c.status == CompletionStatus::InProgress));
}

/// `MemoryPage` whose `describe` stalls for a chosen set of elements.
struct SlowDescribe {
    page: MemoryPage,
    slow: Vec<ElementHandle>,
    delay: Duration,
}

#[async_trait]
impl PageInspector for SlowDescribe {
    async fn find_candidates(&self, selectors: &[String]) -> Result<Vec<ElementHandle>, InspectError> {
        self.page.find_candidates(selectors).await
    }

    async fn describe(&self, handle: ElementHandle) -> Result<ElementSnapshot, InspectError> {
        if self.slow.contains(&handle) {
            tokio::time::sleep(self.delay).await;
        }
        self.page.describe(handle).await
    }

    async fn ancestors_of(
        &self,
        handle: ElementHandle,
        max_depth: usize,
    ) -> Result<Vec<ElementSnapshot>, InspectError> {
        self.page.ancestors_of(handle, max_depth).await
    }

    async fn previous_siblings(
        &self,
        handle: ElementHandle,
        limit: usize,
    ) -> Result<Vec<ElementSnapshot>, InspectError> {
        self.page.previous_siblings(handle, limit).await
    }

    async fn find_within(
        &self,
        handle: ElementHandle,
        selectors: &[String],
    ) -> Result<Vec<ElementSnapshot>, InspectError> {
        self.page.find_within(handle, selectors).await
    }

    async fn click(&self, handle: ElementHandle) -> Result<(), InspectError> {
        self.page.click(handle).await
    }
}

#[async_trait]
impl OverlaySurface for SlowDescribe {
    async fn mount(&self, panel_selectors: &[String]) -> Result<(), InspectError> {
        self.page.mount(panel_selectors).await
    }

    async fn render(&self, cards: &[StatusCard]) -> Result<(), InspectError> {
        self.page.render(cards).await
    }

    async fn dismount(&self) -> Result<(), InspectError> {
        self.page.dismount().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_restart_during_tab_read_leaves_new_generation_clean() {
    let page = MemoryPage::new();
    let fixture = cursor_tabs(&page);
    let slow = Arc::new(SlowDescribe {
        page: page.clone(),
        slow: fixture.tabs.clone(),
        delay: Duration::from_secs(1),
    });
    let session = AgentSession::for_page(slow, SessionOptions::default());

    session.start(background(Ide::Cursor)).await;
    // The cycle is now inside the first tab read.
    advance(1000).await;
    session.stop().await;
    session.start(SessionConfig::new(Ide::Cursor)).await;
    advance(3000).await;

    assert!(session.tab_names().is_empty());
    assert!(session.completion_status().is_empty());
    assert!(page.overlay_cards().is_empty());
    for tab in &fixture.tabs {
        assert_eq!(page.click_count(*tab), 0);
    }
}
