//! Conversions from the loaded configuration to the runtime types of each crate.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use autoaccept_agent::{CycleTimings, Ide, IdeProfile, ProfileSet, SessionOptions};
use autoaccept_cdp::CdpConfig;
use autoaccept_config::{CdpSettings, Config, ProfileOverride, TimingsConfig};
use autoaccept_host::{FileStore, KeyValueStore, SupervisorSettings};

pub(crate) fn ide(config: &Config) -> Ide {
    config.agent.ide.parse().unwrap_or(Ide::Unknown)
}

pub(crate) fn cdp_config(settings: &CdpSettings) -> CdpConfig {
    CdpConfig {
        host: settings.host.clone(),
        base_port: settings.base_port,
        port_range: settings.port_range,
        probe_timeout: Duration::from_millis(settings.probe_timeout_ms),
        eval_timeout: Duration::from_millis(settings.eval_timeout_ms),
    }
}

pub(crate) fn cycle_timings(timings: &TimingsConfig) -> CycleTimings {
    CycleTimings {
        pre_open: Duration::from_millis(timings.pre_open_ms),
        tab_poll: Duration::from_millis(timings.tab_poll_ms),
        tab_wait: Duration::from_millis(timings.tab_wait_ms),
        settle: Duration::from_millis(timings.settle_ms),
        cycle: Duration::from_millis(timings.cycle_ms),
    }
}

/// Built-in profiles with `[profiles.<ide>]` overrides applied.
pub(crate) fn profiles(config: &Config) -> ProfileSet {
    let mut profiles = ProfileSet::default();
    for (name, overrides) in &config.profiles {
        let ide: Ide = name.parse().unwrap_or(Ide::Unknown);
        match profiles.get_mut(ide) {
            Some(profile) => apply_override(profile, overrides),
            None => warn!("Ignoring selector overrides for unknown IDE '{}'", name),
        }
    }
    profiles
}

fn apply_override(profile: &mut IdeProfile, overrides: &ProfileOverride) {
    let ProfileOverride {
        action_buttons,
        simple_buttons,
        tab_selectors,
        tab_list_reveal,
        badge_selector,
        badge_texts,
        error_badges,
        error_squiggles,
        command_selectors,
        panel_selectors,
    } = overrides.clone();

    if let Some(v) = action_buttons {
        profile.action_buttons = v;
    }
    if let Some(v) = simple_buttons {
        profile.simple_buttons = v;
    }
    if let Some(v) = tab_selectors {
        profile.tab_selectors = v;
    }
    if let Some(v) = tab_list_reveal {
        profile.tab_list_reveal = Some(v);
    }
    if let Some(v) = badge_selector {
        profile.badge_selector = v;
    }
    if let Some(v) = badge_texts {
        profile.badge_texts = v;
    }
    if let Some(v) = error_badges {
        profile.error_badges = v;
    }
    if let Some(v) = error_squiggles {
        profile.error_squiggles = v;
    }
    if let Some(v) = command_selectors {
        profile.command_selectors = v;
    }
    if let Some(v) = panel_selectors {
        profile.panel_selectors = v;
    }
}

pub(crate) fn session_options(config: &Config) -> SessionOptions {
    SessionOptions {
        profiles: profiles(config),
        timings: cycle_timings(&config.timings),
    }
}

pub(crate) fn supervisor_settings(config: &Config) -> SupervisorSettings {
    SupervisorSettings {
        ide: ide(config),
        background_mode: config.agent.background_mode,
        poll_interval_ms: config.agent.poll_interval_ms,
        banned_commands: config.agent.banned_commands.clone(),
        tick_interval: Duration::from_millis(config.coordinator.tick_interval_ms),
        stats_interval: Duration::from_secs(config.stats.collect_interval_secs),
        seconds_per_click: config.stats.seconds_per_click,
        stale_threshold_ms: config.coordinator.stale_threshold_ms,
    }
}

/// The shared state file every instance on this machine uses.
pub(crate) fn open_store(config: &Config) -> Arc<dyn KeyValueStore> {
    Arc::new(FileStore::new(config.coordinator.state_path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoaccept_config::ConfigLoader;

    #[test]
    fn test_defaults_map_through() {
        let config = Config::default();
        assert_eq!(ide(&config), Ide::Cursor);

        let cdp = cdp_config(&config.cdp);
        assert_eq!(cdp.ports(), CdpConfig::default().ports());
        assert_eq!(cdp.eval_timeout, Duration::from_secs(2));

        let settings = supervisor_settings(&config);
        assert_eq!(settings.tick_interval, Duration::from_secs(5));
        assert_eq!(settings.stats_interval, Duration::from_secs(30));
        assert_eq!(settings.stale_threshold_ms, 15_000);
        assert_eq!(settings.banned_commands.len(), 13);

        let timings = cycle_timings(&config.timings);
        assert_eq!(timings.cycle, CycleTimings::default().cycle);
        assert_eq!(timings.tab_wait, CycleTimings::default().tab_wait);
    }

    #[test]
    fn test_unknown_ide() {
        let config = ConfigLoader::load_str("[agent]\nide = \"zed\"").unwrap();
        assert_eq!(ide(&config), Ide::Unknown);
    }

    #[test]
    fn test_profile_overrides_applied() {
        let config = ConfigLoader::load_str(
            r#"
            [profiles.antigravity]
            tab_selectors = [".my-tab"]
            tab_list_reveal = ".history"

            [profiles.zed]
            simple_buttons = ["a"]
            "#,
        )
        .unwrap();

        let profiles = profiles(&config);
        assert_eq!(profiles.antigravity.tab_selectors, vec![".my-tab".to_string()]);
        assert_eq!(profiles.antigravity.tab_list_reveal.as_deref(), Some(".history"));
        assert_eq!(
            profiles.antigravity.action_buttons,
            IdeProfile::antigravity().action_buttons
        );
        assert_eq!(profiles.cursor.tab_selectors, IdeProfile::cursor().tab_selectors);
    }
}
