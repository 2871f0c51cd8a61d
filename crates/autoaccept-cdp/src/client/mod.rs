//! Remote page client.
//!
//! Discovers debuggable pages on the configured port window, keeps one
//! control channel and one [`AgentSession`] per page, and pushes session
//! configuration on every resync.

mod config;

pub use config::CdpConfig;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};

use autoaccept_agent::{AgentSession, Mode, SessionConfig, SessionOptions, SessionStats};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::channel::ControlChannel;
use crate::discovery;
use crate::error::CdpError;
use crate::inspector::CdpInspector;
use crate::protocol::PageInfo;

/// Identity of a connection: the port it was found on and the page id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub port: u16,
    pub page_id: String,
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.port, self.page_id)
    }
}

struct PageConnection {
    channel: Arc<ControlChannel>,
    inspector: CdpInspector,
    session: AgentSession,
    /// Mode last pushed to the session.
    mode: Option<Mode>,
    watcher: tokio::task::JoinHandle<()>,
}

type ConnectionMap = HashMap<ConnectionKey, PageConnection>;

/// Drives every debuggable page of an IDE.
pub struct RemotePageClient {
    config: CdpConfig,
    options: SessionOptions,
    http: reqwest::Client,
    request_id: Arc<AtomicU64>,
    connections: Arc<Mutex<ConnectionMap>>,
    sync_lock: tokio::sync::Mutex<()>,
}

impl RemotePageClient {
    pub fn new(config: CdpConfig, options: SessionOptions) -> Self {
        Self {
            config,
            options,
            http: reqwest::Client::new(),
            request_id: Arc::new(AtomicU64::new(1)),
            connections: Arc::new(Mutex::new(HashMap::new())),
            sync_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CdpConfig {
        &self.config
    }

    /// Whether any port in the window lists an eligible page.
    pub async fn is_available(&self) -> bool {
        for port in self.config.ports() {
            if discovery::probe(&self.http, &self.config.host, port, self.config.probe_timeout).await {
                debug!("Debugging endpoint found on port {}", port);
                return true;
            }
        }
        false
    }

    /// Resync every eligible page with `config`. Returns the number of live
    /// connections afterwards.
    ///
    /// New pages are connected and get the bridge; pages whose last pushed
    /// mode differs are stopped and started again; every page receives the
    /// banned list and poll interval.
    pub async fn start(&self, config: &SessionConfig) -> usize {
        let _sync = self.sync_lock.lock().await;

        for port in self.config.ports() {
            let pages =
                discovery::list_eligible_pages(&self.http, &self.config.host, port, self.config.probe_timeout)
                    .await;
            for page in pages {
                let key = ConnectionKey {
                    port,
                    page_id: page.id.clone(),
                };
                if let Err(e) = self.sync_page(&key, &page, config).await {
                    debug!("Resync of {} failed: {}", key, e);
                }
            }
        }

        self.connection_count()
    }

    async fn sync_page(
        &self,
        key: &ConnectionKey,
        page: &PageInfo,
        config: &SessionConfig,
    ) -> Result<(), CdpError> {
        let existing = self
            .connections
            .lock()
            .get(key)
            .map(|c| (c.channel.clone(), c.inspector.clone(), c.session.clone(), c.mode));

        let (channel, inspector, session, pushed) = match existing {
            Some(existing) => existing,
            None => {
                let (channel, inspector, session) = self.connect(key, page).await?;
                (channel, inspector, session, None)
            }
        };

        if !inspector.is_injected() {
            inspector.inject().await?;
        }

        let mode = config.mode();
        if pushed != Some(mode) {
            if pushed.is_some() {
                info!("Mode change on {}: {:?} -> {:?}", key, pushed, mode);
                session.stop().await;
            }
            session.start(config.clone()).await;
            if let Some(conn) = self.connections.lock().get_mut(key) {
                if Arc::ptr_eq(&conn.channel, &channel) {
                    conn.mode = Some(mode);
                }
            }
        } else {
            session.update_banned_patterns(&config.banned_patterns);
            session.update_poll_interval(config.poll_interval_ms);
        }
        Ok(())
    }

    async fn connect(
        &self,
        key: &ConnectionKey,
        page: &PageInfo,
    ) -> Result<(Arc<ControlChannel>, CdpInspector, AgentSession), CdpError> {
        let ws_url = page
            .web_socket_debugger_url
            .as_deref()
            .ok_or_else(|| CdpError::InvalidResponse(format!("{} has no debugger URL", key)))?;

        let channel =
            Arc::new(ControlChannel::connect(ws_url, self.request_id.clone(), self.config.eval_timeout).await?);
        let inspector = CdpInspector::new(channel.clone());
        let session = AgentSession::for_page(Arc::new(inspector.clone()), self.options.clone());
        let watcher = spawn_watcher(key.clone(), channel.clone(), Arc::downgrade(&self.connections));

        info!("Connected to {} ({})", key, page.url);
        self.connections.lock().insert(
            key.clone(),
            PageConnection {
                channel: channel.clone(),
                inspector: inspector.clone(),
                session: session.clone(),
                mode: None,
                watcher,
            },
        );
        Ok((channel, inspector, session))
    }

    /// Stop every session and close every channel.
    pub async fn stop(&self) {
        let _sync = self.sync_lock.lock().await;
        let drained: Vec<_> = self.connections.lock().drain().collect();
        for (key, conn) in drained {
            conn.watcher.abort();
            conn.session.stop().await;
            conn.channel.close().await;
            debug!("Disconnected from {}", key);
        }
    }

    /// Counters summed over every session.
    pub fn get_stats(&self) -> SessionStats {
        let mut total = SessionStats::default();
        for session in self.sessions() {
            total += session.stats();
        }
        total
    }

    /// Take and zero every session's counters, returning the sum.
    pub fn reset_stats(&self) -> SessionStats {
        let mut total = SessionStats::default();
        for session in self.sessions() {
            total += session.reset_stats();
        }
        total
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Remove the overlay from every page.
    pub async fn hide_overlays(&self) {
        for session in self.sessions() {
            session.hide_overlay().await;
        }
    }

    pub fn set_poll_interval(&self, interval_ms: u64) {
        for session in self.sessions() {
            session.update_poll_interval(interval_ms);
        }
    }

    fn sessions(&self) -> Vec<AgentSession> {
        self.connections.lock().values().map(|c| c.session.clone()).collect()
    }
}

/// Removes the entry for `key` once its channel closes, unless it has been
/// replaced by a newer connection.
fn spawn_watcher(
    key: ConnectionKey,
    channel: Arc<ControlChannel>,
    connections: Weak<Mutex<ConnectionMap>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        channel.closed().await;
        let Some(connections) = connections.upgrade() else {
            return;
        };
        let removed = {
            let mut map = connections.lock();
            let same = map.get(&key).is_some_and(|c| Arc::ptr_eq(&c.channel, &channel));
            if same { map.remove(&key) } else { None }
        };
        if let Some(conn) = removed {
            warn!("Connection to {} closed", key);
            conn.session.stop().await;
        }
    })
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
