//! `auto-accept probe`.

use std::path::Path;

use autoaccept_cdp::discovery::{is_eligible, list_pages};
use autoaccept_config::ConfigLoader;

use crate::adapters::cdp_config;

/// List every target on the configured ports and whether it would be driven.
pub(crate) async fn probe(config_path: Option<&Path>, format: &str) -> anyhow::Result<()> {
    let config = ConfigLoader::load_or_default(config_path)?;
    let cdp = cdp_config(&config.cdp);
    let http = reqwest::Client::new();

    let mut rows = Vec::new();
    for port in cdp.ports() {
        let Ok(pages) = list_pages(&http, &cdp.host, port, cdp.probe_timeout).await else {
            continue;
        };
        for page in pages {
            let eligible = is_eligible(&page);
            rows.push((port, page, eligible));
        }
    }

    if format == "json" {
        let json: Vec<_> = rows
            .iter()
            .map(|(port, page, eligible)| {
                serde_json::json!({
                    "port": port,
                    "id": page.id,
                    "type": page.page_type,
                    "title": page.title,
                    "url": page.url,
                    "eligible": eligible,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if rows.is_empty() {
        let ports = cdp.ports();
        println!(
            "No debugging endpoint on {} ports {}-{}.",
            cdp.host,
            ports.first().copied().unwrap_or(cdp.base_port),
            ports.last().copied().unwrap_or(cdp.base_port)
        );
        println!(
            "Start the IDE with --remote-debugging-port={} to enable automation.",
            cdp.base_port
        );
        return Ok(());
    }

    println!("{:<6} {:<10} {:<9} {:<40} {}", "PORT", "TYPE", "DRIVEN", "TITLE", "URL");
    println!("{}", "-".repeat(100));
    for (port, page, eligible) in rows {
        let title: String = page.title.chars().take(38).collect();
        println!(
            "{:<6} {:<10} {:<9} {:<40} {}",
            port,
            page.page_type,
            if eligible { "yes" } else { "no" },
            title,
            page.url
        );
    }

    Ok(())
}
