//! Port window and timeouts of the remote page client.

use std::time::Duration;

/// Remote page client configuration.
#[derive(Debug, Clone)]
pub struct CdpConfig {
    /// Host serving the debugging endpoints.
    pub host: String,
    /// Center of the probed port window.
    pub base_port: u16,
    /// Ports `base_port - port_range ..= base_port + port_range` are probed.
    pub port_range: u16,
    /// Per-port discovery timeout.
    pub probe_timeout: Duration,
    /// Per-call control channel timeout.
    pub eval_timeout: Duration,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            base_port: 9000,
            port_range: 3,
            probe_timeout: Duration::from_millis(500),
            eval_timeout: Duration::from_secs(2),
        }
    }
}

impl CdpConfig {
    /// Every port to probe, lowest first.
    pub fn ports(&self) -> Vec<u16> {
        let low = self.base_port.saturating_sub(self.port_range);
        let high = self.base_port.saturating_add(self.port_range);
        (low..=high).collect()
    }
}
