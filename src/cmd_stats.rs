//! `auto-accept stats`.

use std::path::Path;

use chrono::{Local, TimeZone};

use autoaccept_config::ConfigLoader;
use autoaccept_host::{InstanceCoordinator, StatsRecorder, format_saved, lock_key, week_start_ms};

use crate::adapters::{ide, open_store};

/// Print this week's counters and the current lock holder.
pub(crate) async fn stats(config_path: Option<&Path>, format: &str) -> anyhow::Result<()> {
    let config = ConfigLoader::load_or_default(config_path)?;
    let store = open_store(&config);
    let recorder = StatsRecorder::new(store.clone(), config.stats.seconds_per_click);
    let stats = recorder.load(week_start_ms(&Local::now())).await?;

    let key = lock_key(ide(&config));
    let lock = InstanceCoordinator::with_threshold(store, config.coordinator.stale_threshold_ms)
        .current(&key)
        .await?;

    let saved = stats.time_saved(config.stats.seconds_per_click);
    if format == "json" {
        let json = serde_json::json!({
            "stats": stats,
            "timeSavedSecs": saved.as_secs(),
            "lock": lock,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let week = Local
        .timestamp_millis_opt(stats.week_start)
        .earliest()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());

    println!("Week of {}", week);
    println!("{}", "=".repeat(40));
    println!("Clicks:      {}", stats.clicks_this_week);
    println!("Blocked:     {}", stats.blocked_this_week);
    println!("Sessions:    {}", stats.sessions_this_week);
    println!("Time saved:  ~{}", format_saved(saved));
    match lock {
        Some(lock) => println!("Driver:      {} ({})", lock.owner_id, key),
        None => println!("Driver:      none"),
    }

    Ok(())
}
