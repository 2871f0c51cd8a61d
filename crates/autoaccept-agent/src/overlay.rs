//! Background-mode status overlay.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::InspectError;

/// Completion state of one conversation tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    InProgress,
    Done,
    DoneWithErrors,
}

impl CompletionStatus {
    pub fn is_concluded(&self) -> bool {
        !matches!(self, CompletionStatus::InProgress)
    }
}

/// One row of the overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCard {
    pub name: String,
    pub status: CompletionStatus,
}

/// Page-side rendering of the overlay.
#[async_trait]
pub trait OverlaySurface: Send + Sync {
    /// Attach the overlay to the first panel found; idempotent.
    async fn mount(&self, panel_selectors: &[String]) -> Result<(), InspectError>;

    /// Replace the rendered cards.
    async fn render(&self, cards: &[StatusCard]) -> Result<(), InspectError>;

    /// Remove the overlay; a no-op when it is not mounted.
    async fn dismount(&self) -> Result<(), InspectError>;
}

/// Keeps the card model and pushes it to an [`OverlaySurface`].
///
/// Rendering is best-effort. Surface failures are logged and never reach the
/// cycler.
pub struct OverlayPresenter {
    surface: Arc<dyn OverlaySurface>,
    cards: Mutex<Vec<StatusCard>>,
}

impl OverlayPresenter {
    pub fn new(surface: Arc<dyn OverlaySurface>) -> Self {
        Self {
            surface,
            cards: Mutex::new(Vec::new()),
        }
    }

    /// Attach to the first of `panel_selectors` present on the page.
    pub async fn mount(&self, panel_selectors: &[String]) {
        if let Err(e) = self.surface.mount(panel_selectors).await {
            warn!("Failed to mount overlay: {}", e);
        }
    }

    pub async fn dismount(&self) {
        self.cards.lock().clear();
        if let Err(e) = self.surface.dismount().await {
            debug!("Failed to dismount overlay: {}", e);
        }
    }

    /// Rebuild the cards from the current tab names.
    pub async fn load<F>(&self, names: &[String], status_of: F)
    where
        F: Fn(&str) -> CompletionStatus,
    {
        let cards: Vec<StatusCard> = names
            .iter()
            .map(|name| StatusCard {
                name: name.clone(),
                status: status_of(name),
            })
            .collect();
        *self.cards.lock() = cards.clone();
        self.push(&cards).await;
    }

    /// Update a single card. Unknown names are ignored.
    pub async fn mark(&self, name: &str, status: CompletionStatus) {
        let cards = {
            let mut cards = self.cards.lock();
            match cards.iter_mut().find(|c| c.name == name) {
                Some(card) if card.status != status => card.status = status,
                _ => return,
            }
            cards.clone()
        };
        self.push(&cards).await;
    }

    pub fn cards(&self) -> Vec<StatusCard> {
        self.cards.lock().clone()
    }

    async fn push(&self, cards: &[StatusCard]) {
        if let Err(e) = self.surface.render(cards).await {
            debug!("Failed to render overlay: {}", e);
        }
    }
}
