//! Typed session configuration pushed by the host.

use serde::{Deserialize, Serialize};

use crate::profile::Ide;

/// Loop style of a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Simple,
    Background,
}

impl Mode {
    pub fn from_background(background_mode: bool) -> Self {
        if background_mode {
            Mode::Background
        } else {
            Mode::Simple
        }
    }
}

/// Configuration pushed to a session by `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub ide: Ide,
    #[serde(default)]
    pub background_mode: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub banned_patterns: Vec<String>,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl SessionConfig {
    pub fn new(ide: Ide) -> Self {
        Self {
            ide,
            background_mode: false,
            poll_interval_ms: default_poll_interval_ms(),
            banned_patterns: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_background(self.background_mode)
    }
}
