use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.agent.ide, "cursor");
    assert!(!config.agent.background_mode);
    assert_eq!(config.agent.poll_interval_ms, 1000);
    assert_eq!(config.cdp.base_port, 9000);
    assert_eq!(config.cdp.port_range, 3);
    assert_eq!(config.coordinator.stale_threshold_ms, 15_000);
    assert_eq!(config.stats.collect_interval_secs, 30);
    assert_eq!(config.timings.cycle_ms, 3000);
    assert!(config.profiles.is_empty());
}

#[test]
fn test_default_banned_commands() {
    let banned = default_banned_commands();
    assert_eq!(banned.len(), 13);
    assert!(banned.iter().any(|b| b == "rm -rf /"));
    assert!(banned.iter().any(|b| b == ":(){:|:&};:"));
}

#[test]
fn test_empty_banned_list_is_kept() {
    let config: Config = toml::from_str(
        r#"
        [agent]
        banned_commands = []
        "#,
    )
    .unwrap();
    assert!(config.agent.banned_commands.is_empty());
}

#[test]
fn test_partial_sections_use_defaults() {
    let config: Config = toml::from_str(
        r#"
        [cdp]
        base_port = 9222

        [timings]
        settle_ms = 500
        "#,
    )
    .unwrap();
    assert_eq!(config.cdp.base_port, 9222);
    assert_eq!(config.cdp.host, "127.0.0.1");
    assert_eq!(config.cdp.eval_timeout_ms, 2000);
    assert_eq!(config.timings.settle_ms, 500);
    assert_eq!(config.timings.pre_open_ms, 800);
}

#[test]
fn test_state_path_default() {
    let config = CoordinatorConfig::default();
    assert!(config.state_path().ends_with(".auto-accept/state.json"));

    let config = CoordinatorConfig {
        state_path: Some(PathBuf::from("/tmp/aa.json")),
        ..Default::default()
    };
    assert_eq!(config.state_path(), PathBuf::from("/tmp/aa.json"));
}

#[test]
fn test_profile_override() {
    let config: Config = toml::from_str(
        r#"
        [profiles.cursor]
        tab_selectors = [".tab-a", ".tab-b"]
        badge_selector = "span.badge"
        "#,
    )
    .unwrap();
    let cursor = &config.profiles["cursor"];
    assert!(cursor.action_buttons.is_none());
    assert_eq!(
        cursor.selectors(),
        vec![
            ("tab_selectors", ".tab-a"),
            ("tab_selectors", ".tab-b"),
            ("badge_selector", "span.badge"),
        ]
    );
}

#[test]
fn test_config_roundtrip() {
    let config = Config::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.agent.banned_commands, config.agent.banned_commands);
    assert_eq!(parsed.cdp.base_port, config.cdp.base_port);
}
