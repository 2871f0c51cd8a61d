use std::sync::atomic::AtomicU64;

use super::*;
use crate::classifier::ActionClassifier;
use crate::guard::CommandGuard;
use crate::memory::{ClickAction, MemoryPage, NodeSpec};
use crate::session::Liveness;

struct Harness {
    cycler: TabCycler,
    presenter: Arc<OverlayPresenter>,
    state: Arc<Mutex<TabState>>,
    liveness: Arc<Liveness>,
}

fn harness(page: &MemoryPage) -> Harness {
    let profile = IdeProfile::cursor();
    let clicker = Clicker::new(
        Arc::new(page.clone()),
        ActionClassifier::new(profile.zone.clone()),
        Arc::new(CommandGuard::default()),
        Arc::new(AtomicU64::new(0)),
        profile.command_selectors.clone(),
    );
    let presenter = Arc::new(OverlayPresenter::new(Arc::new(page.clone())));
    let state = Arc::new(Mutex::new(TabState::default()));
    let liveness = Liveness::started();
    let cycler = TabCycler::new(
        clicker,
        presenter.clone(),
        state.clone(),
        profile,
        CycleTimings::default(),
        liveness.token(),
    );
    Harness {
        cycler,
        presenter,
        state,
        liveness,
    }
}

fn tab_list(page: &MemoryPage, labels: &[&str]) -> Vec<ElementHandle> {
    let bar = page.append(page.root(), NodeSpec::new("div").id("workbench.parts.auxiliarybar"));
    let list = page.append(bar, NodeSpec::new("ul").role("tablist"));
    labels
        .iter()
        .map(|label| page.append(list, NodeSpec::new("li").role("tab").text(*label)))
        .collect()
}

fn tab_clicks(page: &MemoryPage, tabs: &[ElementHandle]) -> Vec<ElementHandle> {
    page.clicks().into_iter().filter(|h| tabs.contains(h)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_cycles_round_robin() {
    let page = MemoryPage::new();
    let tabs = tab_list(&page, &["One", "Two", "Three"]);
    let mut h = harness(&page);

    for _ in 0..4 {
        h.cycler.cycle().await.unwrap();
    }
    assert_eq!(tab_clicks(&page, &tabs), vec![tabs[0], tabs[1], tabs[2], tabs[0]]);
    assert_eq!(h.state.lock().tab_names(), ["One", "Two", "Three"]);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_labels_get_suffix() {
    let page = MemoryPage::new();
    tab_list(&page, &["Fix bug 2m", "Fix bug", "Docs"]);
    let mut h = harness(&page);

    h.cycler.cycle().await.unwrap();
    assert_eq!(h.state.lock().tab_names(), ["Fix bug", "Fix bug (2)", "Docs"]);
}

#[tokio::test(start_paused = true)]
async fn test_concluded_tab_marked() {
    let page = MemoryPage::new();
    let tabs = tab_list(&page, &["Refactor", "Tests"]);
    let badge = page.append(page.root(), NodeSpec::new("span").text("Bad"));
    page.detach(badge);
    page.on_click(tabs[0], vec![ClickAction::Attach(badge)]);
    page.on_click(tabs[1], vec![ClickAction::Detach(badge)]);

    let mut h = harness(&page);
    h.presenter.mount(&[]).await;

    h.cycler.cycle().await.unwrap();
    assert_eq!(h.state.lock().status_of("Refactor"), CompletionStatus::Done);
    assert_eq!(h.state.lock().status_of("Tests"), CompletionStatus::InProgress);
    assert_eq!(
        page.overlay_cards()
            .iter()
            .map(|c| c.status)
            .collect::<Vec<_>>(),
        vec![CompletionStatus::Done, CompletionStatus::InProgress]
    );
}

#[tokio::test(start_paused = true)]
async fn test_compile_errors_mark_done_with_errors() {
    let page = MemoryPage::new();
    let tabs = tab_list(&page, &["Refactor"]);
    let badge = page.append(page.root(), NodeSpec::new("span").text("Good"));
    page.append(page.root(), NodeSpec::new("div").class("monaco-editor squiggly-error"));
    page.detach(badge);
    page.on_click(tabs[0], vec![ClickAction::Attach(badge)]);

    let mut h = harness(&page);
    h.cycler.cycle().await.unwrap();
    assert_eq!(
        h.state.lock().status_of("Refactor"),
        CompletionStatus::DoneWithErrors
    );
}

#[tokio::test(start_paused = true)]
async fn test_badge_skips_click_pass() {
    let page = MemoryPage::new();
    let chat = page.append(page.root(), NodeSpec::new("div").class("chat-widget"));
    let accept = page.append(chat, NodeSpec::new("button").text("Accept"));
    page.append(page.root(), NodeSpec::new("span").text("Good"));

    let mut h = harness(&page);
    h.cycler.cycle().await.unwrap();
    assert_eq!(page.click_count(accept), 0);

    // Without the badge the focused conversation is still working.
    let page = MemoryPage::new();
    let chat = page.append(page.root(), NodeSpec::new("div").class("chat-widget"));
    let accept = page.append(chat, NodeSpec::new("button").text("Accept"));
    let mut h = harness(&page);
    h.cycler.cycle().await.unwrap();
    assert_eq!(page.click_count(accept), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_tabs_counts_streak() {
    let page = MemoryPage::new();
    let mut h = harness(&page);

    h.cycler.cycle().await.unwrap();
    h.cycler.cycle().await.unwrap();
    assert_eq!(h.state.lock().no_tab_streak(), 2);

    let tabs = tab_list(&page, &["Late"]);
    h.cycler.cycle().await.unwrap();
    assert_eq!(h.state.lock().no_tab_streak(), 0);
    assert_eq!(tab_clicks(&page, &tabs), vec![tabs[0]]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_token_stops_before_clicking() {
    let page = MemoryPage::new();
    let tabs = tab_list(&page, &["One"]);
    let mut h = harness(&page);

    h.liveness.halt();
    h.cycler.cycle().await.unwrap();
    assert!(tab_clicks(&page, &tabs).is_empty());
    assert!(h.state.lock().tab_names().is_empty());

    // A newer generation also invalidates the captured token.
    h.liveness.begin();
    h.cycler.cycle().await.unwrap();
    assert!(tab_clicks(&page, &tabs).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_tab_read_keeps_names() {
    let page = MemoryPage::new();
    let tabs = tab_list(&page, &["A", "B"]);
    let mut h = harness(&page);
    h.presenter.mount(&[]).await;

    h.cycler.cycle().await.unwrap();
    assert_eq!(h.state.lock().tab_names(), ["A", "B"]);

    for tab in &tabs {
        page.detach(*tab);
    }
    h.cycler.cycle().await.unwrap();
    assert_eq!(h.state.lock().tab_names(), ["A", "B"]);
    assert_eq!(h.state.lock().no_tab_streak(), 1);
    assert_eq!(page.overlay_cards().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_generation_bump_during_settle_skips_marking() {
    let page = MemoryPage::new();
    let tabs = tab_list(&page, &["Refactor"]);
    let badge = page.append(page.root(), NodeSpec::new("span").text("Good"));
    page.detach(badge);
    page.on_click(tabs[0], vec![ClickAction::Attach(badge)]);

    let Harness {
        mut cycler,
        state,
        liveness,
        ..
    } = harness(&page);
    let running = tokio::spawn(async move { cycler.cycle().await });

    // Past the tab switch, inside the settle delay.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(tab_clicks(&page, &tabs), vec![tabs[0]]);
    liveness.begin();

    running.await.unwrap().unwrap();
    assert_eq!(state.lock().status_of("Refactor"), CompletionStatus::InProgress);
}
