//! Generation-checked cancellation for session loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Shared `(running, generation)` pair of a session.
#[derive(Debug, Default)]
pub(crate) struct Liveness {
    running: AtomicBool,
    generation: AtomicU64,
}

impl Liveness {
    #[cfg(test)]
    pub(crate) fn started() -> Arc<Self> {
        let liveness = Arc::new(Self::default());
        liveness.begin();
        liveness
    }

    /// Invalidate running loops and open a new generation.
    pub(crate) fn begin(&self) -> u64 {
        self.running.store(false, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.store(true, Ordering::SeqCst);
        generation
    }

    pub(crate) fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Token bound to the current generation.
    pub(crate) fn token(self: &Arc<Self>) -> SessionToken {
        SessionToken {
            liveness: Arc::clone(self),
            generation: self.generation(),
        }
    }
}

/// Cancellation token captured by a loop when it is spawned.
#[derive(Debug, Clone)]
pub(crate) struct SessionToken {
    liveness: Arc<Liveness>,
    generation: u64,
}

impl SessionToken {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_live(&self) -> bool {
        self.liveness.is_running() && self.liveness.generation() == self.generation
    }

    /// Sleep, then report whether the loop may continue.
    pub(crate) async fn sleep(&self, duration: Duration) -> bool {
        tokio::time::sleep(duration).await;
        self.is_live()
    }
}
