//! Weekly usage counters persisted in the shared store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use autoaccept_agent::SessionStats;

use crate::error::StoreError;
use crate::store::{KeyValueStore, get_json, set_json};

/// Store key of the weekly record.
pub const STATS_KEY: &str = "auto-accept-roi-stats";

/// Default estimate of time saved per automated click.
pub const DEFAULT_SECONDS_PER_CLICK: u64 = 5;

/// Counters for the week starting at `week_start` (epoch millis).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub week_start: i64,
    #[serde(default)]
    pub clicks_this_week: u64,
    #[serde(default)]
    pub blocked_this_week: u64,
    #[serde(default)]
    pub sessions_this_week: u64,
}

impl WeeklyStats {
    pub fn new(week_start: i64) -> Self {
        Self {
            week_start,
            ..Default::default()
        }
    }

    pub fn time_saved(&self, seconds_per_click: u64) -> Duration {
        Duration::from_secs(self.clicks_this_week.saturating_mul(seconds_per_click))
    }

    /// Reset for a later week, returning the finished one.
    pub fn roll(&mut self, current_week_start: i64) -> Option<WeeklyStats> {
        if self.week_start >= current_week_start {
            return None;
        }
        Some(std::mem::replace(self, WeeklyStats::new(current_week_start)))
    }

    fn absorb(&mut self, delta: SessionStats) {
        self.clicks_this_week += delta.clicks;
        self.blocked_this_week += delta.blocked;
    }
}

/// Millis of the most recent Sunday 00:00 in `now`'s time zone.
pub fn week_start_ms<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    let date = now.date_naive();
    let sunday = date
        .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_sunday())))
        .unwrap_or(date);
    let midnight = sunday.and_time(chrono::NaiveTime::MIN);
    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(start) => start.timestamp_millis(),
        None => Utc.from_utc_datetime(&midnight).timestamp_millis(),
    }
}

/// Human form of a saved duration, e.g. `1h 5m`.
pub fn format_saved(saved: Duration) -> String {
    let secs = saved.as_secs();
    let (hours, minutes) = (secs / 3600, (secs % 3600) / 60);
    match (hours, minutes) {
        (0, 0) => format!("{}s", secs),
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Reads and updates [`WeeklyStats`] in a store.
pub struct StatsRecorder {
    store: Arc<dyn KeyValueStore>,
    seconds_per_click: u64,
}

impl StatsRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>, seconds_per_click: u64) -> Self {
        Self {
            store,
            seconds_per_click,
        }
    }

    pub fn seconds_per_click(&self) -> u64 {
        self.seconds_per_click
    }

    /// Current week's record, rolling over a finished week first.
    pub async fn load(&self, week_start: i64) -> Result<WeeklyStats, StoreError> {
        let Some(mut stats) = get_json::<WeeklyStats>(self.store.as_ref(), STATS_KEY).await? else {
            let fresh = WeeklyStats::new(week_start);
            set_json(self.store.as_ref(), STATS_KEY, &fresh).await?;
            return Ok(fresh);
        };

        if let Some(previous) = stats.roll(week_start) {
            if previous.clicks_this_week > 0 || previous.blocked_this_week > 0 {
                info!(
                    "Weekly summary: {} clicks, {} blocked, {} sessions, ~{} saved",
                    previous.clicks_this_week,
                    previous.blocked_this_week,
                    previous.sessions_this_week,
                    format_saved(previous.time_saved(self.seconds_per_click))
                );
            }
            set_json(self.store.as_ref(), STATS_KEY, &stats).await?;
        }
        Ok(stats)
    }

    /// Add a drained session delta to the week.
    pub async fn collect(&self, delta: SessionStats, week_start: i64) -> Result<WeeklyStats, StoreError> {
        let mut stats = self.load(week_start).await?;
        if delta == SessionStats::default() {
            return Ok(stats);
        }
        stats.absorb(delta);
        set_json(self.store.as_ref(), STATS_KEY, &stats).await?;
        debug!(
            "Collected {} clicks, {} blocked ({} this week)",
            delta.clicks, delta.blocked, stats.clicks_this_week
        );
        Ok(stats)
    }

    pub async fn increment_sessions(&self, week_start: i64) -> Result<WeeklyStats, StoreError> {
        let mut stats = self.load(week_start).await?;
        stats.sessions_this_week += 1;
        set_json(self.store.as_ref(), STATS_KEY, &stats).await?;
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
