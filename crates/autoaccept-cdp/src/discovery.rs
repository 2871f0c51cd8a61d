//! Debuggable page discovery over the `/json/list` HTTP endpoint.

use std::time::Duration;

use tracing::{debug, trace};
use url::Url;

use crate::error::CdpError;
use crate::protocol::PageInfo;

/// Build the discovery URL for a port.
pub fn list_url(host: &str, port: u16) -> Result<Url, CdpError> {
    Ok(Url::parse(&format!("http://{}:{}/json/list", host, port))?)
}

/// Every target the endpoint lists.
pub async fn list_pages(
    http: &reqwest::Client,
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<Vec<PageInfo>, CdpError> {
    let url = list_url(host, port)?;
    trace!("Listing pages at {}", url);
    let pages: Vec<PageInfo> = http
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(pages)
}

/// Whether the driver should attach to a target.
///
/// Only `page`/`webview` targets with a debugger URL qualify, and DevTools
/// windows themselves are skipped.
pub fn is_eligible(page: &PageInfo) -> bool {
    if page.web_socket_debugger_url.is_none() {
        return false;
    }
    if page.page_type != "page" && page.page_type != "webview" {
        return false;
    }
    let url = page.url.to_lowercase();
    !(url.starts_with("devtools://")
        || url.starts_with("chrome-devtools://")
        || url.contains("devtools/devtools"))
}

/// Eligible targets on a port. Unreachable ports yield an empty list.
pub async fn list_eligible_pages(
    http: &reqwest::Client,
    host: &str,
    port: u16,
    timeout: Duration,
) -> Vec<PageInfo> {
    match list_pages(http, host, port, timeout).await {
        Ok(pages) => pages.into_iter().filter(is_eligible).collect(),
        Err(e) => {
            debug!("No debuggable pages on port {}: {}", port, e);
            Vec::new()
        }
    }
}

/// Whether a port lists at least one eligible page.
pub async fn probe(http: &reqwest::Client, host: &str, port: u16, timeout: Duration) -> bool {
    !list_eligible_pages(http, host, port, timeout).await.is_empty()
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
