//! Host supervisor.
//!
//! Drives one [`PageDriver`] on behalf of this process: a heartbeat tick wins
//! or keeps the instance lock and resyncs pages while leading, and a slower
//! tick drains session counters into the weekly stats.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use autoaccept_agent::{Ide, SessionConfig, SessionStats};
use autoaccept_cdp::RemotePageClient;

use crate::coordinator::{DEFAULT_STALE_THRESHOLD_MS, Election, InstanceCoordinator, lock_key, new_owner_id};
use crate::error::HostError;
use crate::stats::{DEFAULT_SECONDS_PER_CLICK, StatsRecorder, WeeklyStats, week_start_ms};
use crate::store::KeyValueStore;

/// What the supervisor needs from the page side.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Sync every eligible page to `config`, returning the connection count.
    async fn start(&self, config: &SessionConfig) -> usize;

    async fn stop(&self);

    /// Take and zero the counters.
    fn reset_stats(&self) -> SessionStats;

    fn get_stats(&self) -> SessionStats;

    fn connection_count(&self) -> usize;

    async fn hide_overlays(&self);

    fn set_poll_interval(&self, interval_ms: u64);
}

#[async_trait]
impl PageDriver for RemotePageClient {
    async fn is_available(&self) -> bool {
        RemotePageClient::is_available(self).await
    }

    async fn start(&self, config: &SessionConfig) -> usize {
        RemotePageClient::start(self, config).await
    }

    async fn stop(&self) {
        RemotePageClient::stop(self).await
    }

    fn reset_stats(&self) -> SessionStats {
        RemotePageClient::reset_stats(self)
    }

    fn get_stats(&self) -> SessionStats {
        RemotePageClient::get_stats(self)
    }

    fn connection_count(&self) -> usize {
        RemotePageClient::connection_count(self)
    }

    async fn hide_overlays(&self) {
        RemotePageClient::hide_overlays(self).await
    }

    fn set_poll_interval(&self, interval_ms: u64) {
        RemotePageClient::set_poll_interval(self, interval_ms)
    }
}

/// Supervisor settings.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub ide: Ide,
    pub background_mode: bool,
    pub poll_interval_ms: u64,
    pub banned_commands: Vec<String>,
    /// Heartbeat and resync period.
    pub tick_interval: Duration,
    /// Stats collection period.
    pub stats_interval: Duration,
    pub seconds_per_click: u64,
    pub stale_threshold_ms: u64,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            ide: Ide::Cursor,
            background_mode: false,
            poll_interval_ms: 1000,
            banned_commands: Vec::new(),
            tick_interval: Duration::from_secs(5),
            stats_interval: Duration::from_secs(30),
            seconds_per_click: DEFAULT_SECONDS_PER_CLICK,
            stale_threshold_ms: DEFAULT_STALE_THRESHOLD_MS,
        }
    }
}

impl SupervisorSettings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ide: self.ide,
            background_mode: self.background_mode,
            poll_interval_ms: self.poll_interval_ms,
            banned_patterns: self.banned_commands.clone(),
        }
    }
}

/// Owns the driver, the election and the stats for one host process.
pub struct Supervisor {
    driver: Arc<dyn PageDriver>,
    coordinator: InstanceCoordinator,
    stats: StatsRecorder,
    owner_id: String,
    lock_key: String,
    settings: RwLock<SupervisorSettings>,
    /// `None` until the first election.
    leading: Mutex<Option<bool>>,
}

impl Supervisor {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        store: Arc<dyn KeyValueStore>,
        settings: SupervisorSettings,
    ) -> Self {
        Self::with_owner_id(driver, store, settings, new_owner_id())
    }

    pub fn with_owner_id(
        driver: Arc<dyn PageDriver>,
        store: Arc<dyn KeyValueStore>,
        settings: SupervisorSettings,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            coordinator: InstanceCoordinator::with_threshold(store.clone(), settings.stale_threshold_ms),
            stats: StatsRecorder::new(store, settings.seconds_per_click),
            owner_id: owner_id.into(),
            lock_key: lock_key(settings.ide),
            settings: RwLock::new(settings),
            leading: Mutex::new(None),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn settings(&self) -> SupervisorSettings {
        self.settings.read().clone()
    }

    pub fn is_leader(&self) -> bool {
        *self.leading.lock() == Some(true)
    }

    pub fn connection_count(&self) -> usize {
        self.driver.connection_count()
    }

    /// Counters not yet collected.
    pub fn pending_stats(&self) -> SessionStats {
        self.driver.get_stats()
    }

    /// One heartbeat at the current time.
    pub async fn tick(&self) -> bool {
        self.tick_at(now_ms()).await
    }

    /// Run the election at `now_ms` and resync when leading. Returns whether
    /// this instance drove the pages.
    pub async fn tick_at(&self, now_ms: u64) -> bool {
        let election = match self
            .coordinator
            .try_acquire_or_renew(&self.lock_key, &self.owner_id, now_ms)
            .await
        {
            Ok(election) => election,
            Err(e) => {
                warn!("Election failed, skipping tick: {}", e);
                return false;
            }
        };

        let previous = self.leading.lock().replace(election.is_leader());
        match (&election, previous) {
            (Election::Standby { .. }, Some(false)) => return false,
            (Election::Standby { owner }, previous) => {
                info!("Locked by another instance ({}), standing by", owner);
                if previous == Some(true) {
                    self.driver.stop().await;
                }
                return false;
            }
            (_, Some(false)) => info!("Lock acquired, resuming control"),
            (Election::Acquired, None) => debug!("Lock {} acquired", self.lock_key),
            _ => {}
        }

        self.resync().await;
        true
    }

    async fn resync(&self) {
        let config = self.settings.read().session_config();
        let connected = self.driver.start(&config).await;
        debug!("Resynced {} page(s)", connected);
    }

    async fn resync_if_leading(&self) {
        if self.is_leader() {
            self.resync().await;
        }
    }

    /// Drain session counters into the current week.
    pub async fn collect_stats(&self) -> Result<WeeklyStats, HostError> {
        self.collect_stats_at(current_week_start()).await
    }

    pub async fn collect_stats_at(&self, week_start: i64) -> Result<WeeklyStats, HostError> {
        let delta = self.driver.reset_stats();
        Ok(self.stats.collect(delta, week_start).await?)
    }

    /// Current week's stats without draining the sessions.
    pub async fn weekly_stats(&self) -> Result<WeeklyStats, HostError> {
        Ok(self.stats.load(current_week_start()).await?)
    }

    pub async fn set_background_mode(&self, enabled: bool) {
        let was = std::mem::replace(&mut self.settings.write().background_mode, enabled);
        if was && !enabled {
            self.driver.hide_overlays().await;
        }
        info!("Background mode {}", if enabled { "enabled" } else { "disabled" });
        self.resync_if_leading().await;
    }

    pub async fn set_poll_interval(&self, interval_ms: u64) -> Result<(), HostError> {
        if interval_ms == 0 {
            return Err(HostError::InvalidSetting {
                name: "poll_interval_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        self.settings.write().poll_interval_ms = interval_ms;
        self.driver.set_poll_interval(interval_ms);
        self.resync_if_leading().await;
        Ok(())
    }

    pub async fn set_banned_commands(&self, banned: Vec<String>) {
        let count = banned.len();
        self.settings.write().banned_commands = banned;
        debug!("Banned command list replaced ({} entries)", count);
        self.resync_if_leading().await;
    }

    /// Tick until `shutdown` resolves, then [`Self::shutdown`].
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.stats.increment_sessions(current_week_start()).await {
            warn!("Failed to record session start: {}", e);
        }

        let (tick_every, stats_every) = {
            let settings = self.settings.read();
            (settings.tick_interval, settings.stats_interval)
        };
        let mut heartbeat = tokio::time::interval(tick_every);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut collect = tokio::time::interval_at(Instant::now() + stats_every, stats_every);
        collect.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Supervisor {} started (ide: {}, tick: {:?})",
            self.owner_id,
            self.settings.read().ide.as_str(),
            tick_every
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Supervisor shutting down");
                    break;
                }
                _ = heartbeat.tick() => {
                    self.tick().await;
                }
                _ = collect.tick() => {
                    if let Err(e) = self.collect_stats().await {
                        warn!("Failed to collect stats: {}", e);
                    }
                }
            }
        }

        self.shutdown().await;
    }

    /// Collect outstanding stats, stop every session and release the lock.
    pub async fn shutdown(&self) {
        if let Err(e) = self.collect_stats().await {
            warn!("Failed to collect stats on shutdown: {}", e);
        }
        self.driver.stop().await;
        match self.coordinator.release(&self.lock_key, &self.owner_id).await {
            Ok(true) => debug!("Released {}", self.lock_key),
            Ok(false) => {}
            Err(e) => warn!("Failed to release {}: {}", self.lock_key, e),
        }
        *self.leading.lock() = None;
    }
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

fn current_week_start() -> i64 {
    week_start_ms(&Local::now())
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
