//! One pass over the action buttons of a page.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, trace};

use crate::classifier::{ActionClassifier, Verdict};
use crate::error::InspectError;
use crate::guard::{CommandGuard, extract_nearby_command_text};
use crate::inspector::{ElementHandle, PageInspector};
use crate::scanner::collect_candidates;
use crate::session::SessionToken;

/// Finds, vets and clicks actionable elements.
#[derive(Clone)]
pub(crate) struct Clicker {
    inspector: Arc<dyn PageInspector>,
    classifier: ActionClassifier,
    guard: Arc<CommandGuard>,
    clicks: Arc<AtomicU64>,
    command_selectors: Vec<String>,
}

impl Clicker {
    pub(crate) fn new(
        inspector: Arc<dyn PageInspector>,
        classifier: ActionClassifier,
        guard: Arc<CommandGuard>,
        clicks: Arc<AtomicU64>,
        command_selectors: Vec<String>,
    ) -> Self {
        Self {
            inspector,
            classifier,
            guard,
            clicks,
            command_selectors,
        }
    }

    pub(crate) fn inspector(&self) -> &dyn PageInspector {
        self.inspector.as_ref()
    }

    /// Click every actionable element matched by `selectors`.
    ///
    /// Per-element failures skip that element. A missing bridge aborts the
    /// pass because nothing else on the page can succeed either.
    pub(crate) async fn run_pass(
        &self,
        selectors: &[String],
        token: &SessionToken,
    ) -> Result<usize, InspectError> {
        let candidates = collect_candidates(self.inspector(), selectors).await?;
        let mut clicked = 0;
        for handle in candidates {
            if !token.is_live() {
                break;
            }
            match self.try_click(handle, token).await {
                Ok(true) => clicked += 1,
                Ok(false) => {}
                Err(InspectError::BridgeMissing) => return Err(InspectError::BridgeMissing),
                Err(e) => debug!("Skipping {}: {}", handle, e),
            }
        }
        Ok(clicked)
    }

    async fn try_click(&self, handle: ElementHandle, token: &SessionToken) -> Result<bool, InspectError> {
        let snapshot = self.inspector.describe(handle).await?;
        let (text, is_run) = match self.classifier.evaluate(self.inspector(), &snapshot).await? {
            Verdict::Actionable { text, is_run } => (text, is_run),
            Verdict::Rejected(reason) => {
                trace!("Not clicking {} {:?}: {}", handle, snapshot.text, reason);
                return Ok(false);
            }
        };

        if is_run {
            let command =
                extract_nearby_command_text(self.inspector(), &snapshot, &self.command_selectors)
                    .await?;
            if self.guard.check(&command).is_some() {
                return Ok(false);
            }
        }

        if !token.is_live() {
            return Ok(false);
        }
        self.inspector.click(handle).await?;
        self.clicks.fetch_add(1, Ordering::Relaxed);
        info!("Clicked {:?}", text);
        Ok(true)
    }
}
