//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

mod schema_profiles;
mod schema_runtime;

pub use schema_profiles::*;
pub use schema_runtime::*;

/// Root of every file the host writes: `~/.auto-accept`.
pub fn auto_accept_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".auto-accept")
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub cdp: CdpSettings,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub timings: TimingsConfig,

    /// Selector overrides keyed by IDE name (`cursor`, `antigravity`).
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverride>,
}

/// Agent behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// IDE whose selectors are used: `cursor` or `antigravity`.
    #[serde(default = "default_ide")]
    pub ide: String,

    /// Cycle through conversation tabs instead of polling the focused one.
    #[serde(default)]
    pub background_mode: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Commands never run. Plain entries match as case-insensitive
    /// substrings; `/body/flags` entries are regular expressions.
    #[serde(default = "default_banned_commands")]
    pub banned_commands: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ide: default_ide(),
            background_mode: false,
            poll_interval_ms: default_poll_interval_ms(),
            banned_commands: default_banned_commands(),
        }
    }
}

fn default_ide() -> String {
    "cursor".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

pub fn default_banned_commands() -> Vec<String> {
    [
        "rm -rf /",
        "rm -rf ~",
        "rm -rf *",
        "format c:",
        "del /f /s /q",
        "del /f",
        "rmdir /s /q",
        "Remove-Item",
        ":(){:|:&};:",
        "dd if=",
        "mkfs.",
        "> /dev/sda",
        "chmod -R 777 /",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Debugging endpoint discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpSettings {
    #[serde(default = "default_cdp_host")]
    pub host: String,

    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Ports within `base_port ± port_range` are probed.
    #[serde(default = "default_port_range")]
    pub port_range: u16,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default = "default_eval_timeout_ms")]
    pub eval_timeout_ms: u64,
}

impl Default for CdpSettings {
    fn default() -> Self {
        Self {
            host: default_cdp_host(),
            base_port: default_base_port(),
            port_range: default_port_range(),
            probe_timeout_ms: default_probe_timeout_ms(),
            eval_timeout_ms: default_eval_timeout_ms(),
        }
    }
}

fn default_cdp_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_port() -> u16 {
    9000
}

fn default_port_range() -> u16 {
    3
}

fn default_probe_timeout_ms() -> u64 {
    500
}

fn default_eval_timeout_ms() -> u64 {
    2000
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
