//! [`PageInspector`] and [`OverlaySurface`] over a control channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use autoaccept_agent::{
    ElementHandle, ElementSnapshot, InspectError, OverlaySurface, PageInspector, StatusCard,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::bridge::{BRIDGE_SCRIPT, BridgeReply, BridgeRequest};
use crate::channel::ControlChannel;
use crate::error::CdpError;

/// Drives one page through its injected bridge.
///
/// When the page reloads, the bridge disappears and calls fail with
/// [`InspectError::BridgeMissing`]. The inspector then marks itself as not
/// injected so the next resync installs the bridge again.
#[derive(Clone)]
pub struct CdpInspector {
    channel: Arc<ControlChannel>,
    injected: Arc<AtomicBool>,
}

impl CdpInspector {
    pub fn new(channel: Arc<ControlChannel>) -> Self {
        Self {
            channel,
            injected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn channel(&self) -> &Arc<ControlChannel> {
        &self.channel
    }

    pub fn is_injected(&self) -> bool {
        self.injected.load(Ordering::SeqCst)
    }

    /// Install the bridge. Safe to repeat: an installed bridge is kept.
    pub async fn inject(&self) -> Result<(), CdpError> {
        self.channel.evaluate(BRIDGE_SCRIPT).await?;
        self.injected.store(true, Ordering::SeqCst);
        info!("Bridge injected into {}", self.channel.ws_url());
        Ok(())
    }

    async fn call_raw(&self, request: BridgeRequest) -> Result<serde_json::Value, InspectError> {
        let expression = request.to_expression()?;
        let raw = self.channel.evaluate(&expression).await?;
        let reply: BridgeReply = serde_json::from_value(raw)
            .map_err(|e| InspectError::InvalidResponse(e.to_string()))?;
        let result = reply.into_result();
        if matches!(result, Err(InspectError::BridgeMissing)) && self.injected.swap(false, Ordering::SeqCst) {
            debug!("Bridge gone from {}, page reloaded", self.channel.ws_url());
        }
        result
    }

    async fn call<T: DeserializeOwned>(&self, request: BridgeRequest) -> Result<T, InspectError> {
        let value = self.call_raw(request).await?;
        serde_json::from_value(value).map_err(|e| InspectError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PageInspector for CdpInspector {
    async fn find_candidates(&self, selectors: &[String]) -> Result<Vec<ElementHandle>, InspectError> {
        self.call(BridgeRequest::Find {
            selectors: selectors.to_vec(),
        })
        .await
    }

    async fn describe(&self, handle: ElementHandle) -> Result<ElementSnapshot, InspectError> {
        self.call(BridgeRequest::Describe { handle: handle.0 }).await
    }

    async fn ancestors_of(
        &self,
        handle: ElementHandle,
        max_depth: usize,
    ) -> Result<Vec<ElementSnapshot>, InspectError> {
        self.call(BridgeRequest::Ancestors {
            handle: handle.0,
            depth: max_depth,
        })
        .await
    }

    async fn previous_siblings(
        &self,
        handle: ElementHandle,
        limit: usize,
    ) -> Result<Vec<ElementSnapshot>, InspectError> {
        self.call(BridgeRequest::PreviousSiblings {
            handle: handle.0,
            limit,
        })
        .await
    }

    async fn find_within(
        &self,
        handle: ElementHandle,
        selectors: &[String],
    ) -> Result<Vec<ElementSnapshot>, InspectError> {
        self.call(BridgeRequest::FindWithin {
            handle: handle.0,
            selectors: selectors.to_vec(),
        })
        .await
    }

    async fn click(&self, handle: ElementHandle) -> Result<(), InspectError> {
        self.call_raw(BridgeRequest::Click { handle: handle.0 }).await?;
        Ok(())
    }

    async fn query(&self, selectors: &[String]) -> Result<Vec<ElementSnapshot>, InspectError> {
        self.call(BridgeRequest::Query {
            selectors: selectors.to_vec(),
        })
        .await
    }
}

#[async_trait]
impl OverlaySurface for CdpInspector {
    async fn mount(&self, panel_selectors: &[String]) -> Result<(), InspectError> {
        self.call_raw(BridgeRequest::OverlayMount {
            panels: panel_selectors.to_vec(),
        })
        .await?;
        Ok(())
    }

    async fn render(&self, cards: &[StatusCard]) -> Result<(), InspectError> {
        self.call_raw(BridgeRequest::OverlayRender { cards: cards.to_vec() })
            .await?;
        Ok(())
    }

    async fn dismount(&self) -> Result<(), InspectError> {
        self.call_raw(BridgeRequest::OverlayDismount).await?;
        Ok(())
    }
}
