//! Host runtime configuration (coordination, stats, cycle timings).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::auto_accept_dir;

/// Single-driver election between host instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Supervisor tick: election plus resync.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// A lock whose heartbeat is this old may be taken over.
    #[serde(default = "default_stale_threshold_ms")]
    pub stale_threshold_ms: u64,

    /// Shared state file. Defaults to `~/.auto-accept/state.json`.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            stale_threshold_ms: default_stale_threshold_ms(),
            state_path: None,
        }
    }
}

impl CoordinatorConfig {
    /// Configured state file, or the default location.
    pub fn state_path(&self) -> PathBuf {
        self.state_path
            .clone()
            .unwrap_or_else(|| auto_accept_dir().join("state.json"))
    }
}

fn default_tick_interval_ms() -> u64 {
    5000
}

fn default_stale_threshold_ms() -> u64 {
    15_000
}

/// Usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// How often session counters are folded into the weekly totals.
    #[serde(default = "default_collect_interval_secs")]
    pub collect_interval_secs: u64,

    /// Time credited for each automated click.
    #[serde(default = "default_seconds_per_click")]
    pub seconds_per_click: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            collect_interval_secs: default_collect_interval_secs(),
            seconds_per_click: default_seconds_per_click(),
        }
    }
}

fn default_collect_interval_secs() -> u64 {
    30
}

fn default_seconds_per_click() -> u64 {
    5
}

/// Background cycle delays, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingsConfig {
    #[serde(default = "default_pre_open_ms")]
    pub pre_open_ms: u64,

    #[serde(default = "default_tab_poll_ms")]
    pub tab_poll_ms: u64,

    #[serde(default = "default_tab_wait_ms")]
    pub tab_wait_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            pre_open_ms: default_pre_open_ms(),
            tab_poll_ms: default_tab_poll_ms(),
            tab_wait_ms: default_tab_wait_ms(),
            settle_ms: default_settle_ms(),
            cycle_ms: default_cycle_ms(),
        }
    }
}

fn default_pre_open_ms() -> u64 {
    800
}

fn default_tab_poll_ms() -> u64 {
    300
}

fn default_tab_wait_ms() -> u64 {
    5000
}

fn default_settle_ms() -> u64 {
    1500
}

fn default_cycle_ms() -> u64 {
    3000
}
