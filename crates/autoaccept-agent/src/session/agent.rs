//! [`AgentSession`] and its simple-mode loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::{Mode, SessionConfig};
use super::{Liveness, SessionToken};
use crate::classifier::ActionClassifier;
use crate::clicker::Clicker;
use crate::guard::CommandGuard;
use crate::inspector::PageInspector;
use crate::overlay::{CompletionStatus, OverlayPresenter, OverlaySurface};
use crate::profile::{Ide, IdeProfile, ProfileSet};
use crate::tabs::{CycleTimings, TabCycler, TabState};

/// Counters reported by a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub clicks: u64,
    pub blocked: u64,
}

impl std::ops::AddAssign for SessionStats {
    fn add_assign(&mut self, other: Self) {
        self.clicks += other.clicks;
        self.blocked += other.blocked;
    }
}

/// Host-side settings shared by every session of a client.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub profiles: ProfileSet,
    pub timings: CycleTimings,
}

struct SessionInner {
    inspector: Arc<dyn PageInspector>,
    presenter: Arc<OverlayPresenter>,
    options: SessionOptions,
    liveness: Arc<Liveness>,
    guard: Arc<CommandGuard>,
    clicks: Arc<AtomicU64>,
    poll_interval_ms: Arc<AtomicU64>,
    /// Tab state of the current generation. Replaced on every start so a
    /// stale loop can only write into its own copy.
    state: Mutex<Arc<Mutex<TabState>>>,
    active: Mutex<Option<(Ide, Mode)>>,
    warned_unknown: AtomicBool,
    lifecycle: tokio::sync::Mutex<()>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.liveness.halt();
    }
}

/// Automation state machine for one page.
///
/// Cheap to clone; clones control the same session. Dropping the last clone
/// halts its loops.
#[derive(Clone)]
pub struct AgentSession {
    inner: Arc<SessionInner>,
}

impl AgentSession {
    pub fn new(
        inspector: Arc<dyn PageInspector>,
        surface: Arc<dyn OverlaySurface>,
        options: SessionOptions,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                inspector,
                presenter: Arc::new(OverlayPresenter::new(surface)),
                options,
                liveness: Arc::new(Liveness::default()),
                guard: Arc::new(CommandGuard::default()),
                clicks: Arc::new(AtomicU64::new(0)),
                poll_interval_ms: Arc::new(AtomicU64::new(1000)),
                state: Mutex::new(Arc::new(Mutex::new(TabState::default()))),
                active: Mutex::new(None),
                warned_unknown: AtomicBool::new(false),
                lifecycle: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Session over a page that provides both capabilities.
    pub fn for_page<P>(page: Arc<P>, options: SessionOptions) -> Self
    where
        P: PageInspector + OverlaySurface + 'static,
    {
        Self::new(page.clone(), page, options)
    }

    /// Apply `config` and (re)start the loops.
    ///
    /// Restarting with the same IDE and mode while running only refreshes the
    /// banned list and poll interval.
    pub async fn start(&self, config: SessionConfig) {
        let inner = &self.inner;
        let _lifecycle = inner.lifecycle.lock().await;

        inner.guard.update(&config.banned_patterns);
        self.update_poll_interval(config.poll_interval_ms);

        let mode = config.mode();
        let previous = *inner.active.lock();
        if inner.liveness.is_running() && previous == Some((config.ide, mode)) {
            debug!("Session already running for {} in {:?} mode", config.ide, mode);
            return;
        }

        if previous.map(|(_, m)| m) == Some(Mode::Background) && mode != Mode::Background {
            inner.presenter.dismount().await;
        }

        let generation = inner.liveness.begin();
        *inner.active.lock() = Some((config.ide, mode));
        let state = Arc::new(Mutex::new(TabState::default()));
        *inner.state.lock() = state.clone();

        let Some(profile) = inner.options.profiles.get(config.ide).cloned() else {
            if !inner.warned_unknown.swap(true, Ordering::Relaxed) {
                warn!("Unknown IDE, no actions will be taken on this page");
            }
            return;
        };

        let token = inner.liveness.token();
        let clicker = Clicker::new(
            inner.inspector.clone(),
            ActionClassifier::new(profile.zone.clone()),
            inner.guard.clone(),
            inner.clicks.clone(),
            profile.command_selectors.clone(),
        );

        info!(
            "Session started for {} in {:?} mode (generation {})",
            config.ide, mode, generation
        );
        match mode {
            Mode::Background => {
                inner.presenter.mount(&profile.panel_selectors).await;
                let cycler = TabCycler::new(
                    clicker,
                    inner.presenter.clone(),
                    state,
                    profile,
                    inner.options.timings,
                    token,
                );
                tokio::spawn(cycler.run());
            }
            Mode::Simple => {
                tokio::spawn(simple_loop(
                    clicker,
                    profile,
                    inner.poll_interval_ms.clone(),
                    token,
                ));
            }
        }
    }

    /// Halt the loops and remove the overlay.
    pub async fn stop(&self) {
        let inner = &self.inner;
        let _lifecycle = inner.lifecycle.lock().await;
        inner.liveness.halt();
        *inner.active.lock() = None;
        self.tab_state().lock().clear_streak();
        inner.presenter.dismount().await;
        info!("Session stopped");
    }

    pub fn update_banned_patterns(&self, patterns: &[String]) {
        self.inner.guard.update(patterns);
    }

    /// Takes effect at the next poll. Zero is ignored.
    pub fn update_poll_interval(&self, interval_ms: u64) {
        if interval_ms == 0 {
            warn!("Ignoring zero poll interval");
            return;
        }
        self.inner.poll_interval_ms.store(interval_ms, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            clicks: self.inner.clicks.load(Ordering::Relaxed),
            blocked: self.inner.guard.blocked_count(),
        }
    }

    /// Read and zero the counters.
    pub fn reset_stats(&self) -> SessionStats {
        SessionStats {
            clicks: self.inner.clicks.swap(0, Ordering::Relaxed),
            blocked: self.inner.guard.take_blocked(),
        }
    }

    /// Remove the overlay without touching the loops.
    pub async fn hide_overlay(&self) {
        self.inner.presenter.dismount().await;
    }

    pub fn is_running(&self) -> bool {
        self.inner.liveness.is_running()
    }

    pub fn generation(&self) -> u64 {
        self.inner.liveness.generation()
    }

    pub fn mode(&self) -> Option<Mode> {
        if !self.is_running() {
            return None;
        }
        self.inner.active.lock().map(|(_, mode)| mode)
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.inner.poll_interval_ms.load(Ordering::Relaxed)
    }

    pub fn tab_names(&self) -> Vec<String> {
        self.tab_state().lock().tab_names().to_vec()
    }

    pub fn completion_status(&self) -> HashMap<String, CompletionStatus> {
        self.tab_state().lock().completion_status().clone()
    }

    fn tab_state(&self) -> Arc<Mutex<TabState>> {
        self.inner.state.lock().clone()
    }
}

async fn simple_loop(
    clicker: Clicker,
    profile: IdeProfile,
    poll_interval_ms: Arc<AtomicU64>,
    token: SessionToken,
) {
    debug!("Simple loop started (generation {})", token.generation());
    while token.is_live() {
        if let Err(e) = clicker.run_pass(&profile.simple_buttons, &token).await {
            warn!("Click pass failed: {}", e);
        }
        let interval = Duration::from_millis(poll_interval_ms.load(Ordering::Relaxed));
        if !token.sleep(interval).await {
            break;
        }
    }
    debug!("Simple loop for generation {} ended", token.generation());
}
