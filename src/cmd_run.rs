//! `auto-accept run`.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use autoaccept_cdp::RemotePageClient;
use autoaccept_config::{Config, ConfigLoader, ConfigValidator};
use autoaccept_host::Supervisor;

use crate::adapters::{cdp_config, open_store, session_options, supervisor_settings};

/// Command-line overrides for the `[agent]` and `[cdp]` sections.
#[derive(Debug, Default)]
pub(crate) struct RunOverrides {
    pub ide: Option<String>,
    pub background: bool,
    pub poll_interval: Option<u64>,
    pub port: Option<u16>,
}

impl RunOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(ide) = self.ide {
            config.agent.ide = ide;
        }
        if self.background {
            config.agent.background_mode = true;
        }
        if let Some(ms) = self.poll_interval {
            config.agent.poll_interval_ms = ms;
        }
        if let Some(port) = self.port {
            config.cdp.base_port = port;
        }
    }
}

/// Load, override and validate the configuration. Warnings are logged.
pub(crate) fn prepare_config(config_path: Option<&Path>, overrides: RunOverrides) -> anyhow::Result<Config> {
    let mut config = ConfigLoader::load_or_default(config_path)?;
    overrides.apply(&mut config);

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    if let Some(err) = validation.into_error() {
        return Err(err.into());
    }
    Ok(config)
}

/// Supervise the IDE pages until Ctrl-C.
pub(crate) async fn run(config_path: Option<&Path>, overrides: RunOverrides) -> anyhow::Result<()> {
    let config = prepare_config(config_path, overrides)?;
    info!("Starting auto-accept v{}", env!("CARGO_PKG_VERSION"));

    let cdp = cdp_config(&config.cdp);
    let ports = cdp.ports();
    let client = Arc::new(RemotePageClient::new(cdp, session_options(&config)));
    if !client.is_available().await {
        warn!(
            "No debugging endpoint on {}:{:?}, start the IDE with --remote-debugging-port={}. Still watching.",
            config.cdp.host, ports, config.cdp.base_port
        );
    }

    let settings = supervisor_settings(&config);
    info!(
        "IDE: {}, mode: {}, poll interval: {}ms, {} banned command(s)",
        settings.ide.as_str(),
        if settings.background_mode { "background" } else { "simple" },
        settings.poll_interval_ms,
        settings.banned_commands.len()
    );

    let supervisor = Supervisor::new(client, open_store(&config), settings);
    supervisor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("auto-accept stopped");
    Ok(())
}
