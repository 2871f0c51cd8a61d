//! Single-driver election between host instances.
//!
//! Every instance attached to the same IDE competes for one lock record in the
//! shared store. The holder renews it on each tick; a record whose heartbeat is
//! older than the stale threshold can be claimed by anyone.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use autoaccept_agent::Ide;

use crate::error::StoreError;
use crate::store::{KeyValueStore, get_json, set_json};

/// Heartbeat age after which a lock may be taken over.
pub const DEFAULT_STALE_THRESHOLD_MS: u64 = 15_000;

/// Store key of the lock for `ide`.
pub fn lock_key(ide: Ide) -> String {
    format!("{}-instance-lock", ide.as_str())
}

/// Fresh owner id for this process.
pub fn new_owner_id() -> String {
    Uuid::new_v4().to_string()
}

/// The persisted lock record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceLock {
    pub owner_id: String,
    pub last_heartbeat_ms: u64,
}

impl InstanceLock {
    /// Held while the heartbeat is younger than `threshold_ms`.
    pub fn is_fresh(&self, now_ms: u64, threshold_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_heartbeat_ms) < threshold_ms
    }
}

/// Outcome of one election round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Election {
    /// The lock was absent or stale and is now ours.
    Acquired,
    /// We already held the lock and refreshed the heartbeat.
    Renewed,
    /// Another instance holds a fresh lock.
    Standby { owner: String },
}

impl Election {
    pub fn is_leader(&self) -> bool {
        !matches!(self, Election::Standby { .. })
    }
}

/// Lock arbitration over a [`KeyValueStore`].
pub struct InstanceCoordinator {
    store: Arc<dyn KeyValueStore>,
    stale_threshold_ms: u64,
}

impl InstanceCoordinator {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_threshold(store, DEFAULT_STALE_THRESHOLD_MS)
    }

    pub fn with_threshold(store: Arc<dyn KeyValueStore>, stale_threshold_ms: u64) -> Self {
        Self {
            store,
            stale_threshold_ms,
        }
    }

    pub fn stale_threshold_ms(&self) -> u64 {
        self.stale_threshold_ms
    }

    /// Current lock record, if readable.
    pub async fn current(&self, lock_key: &str) -> Result<Option<InstanceLock>, StoreError> {
        get_json(self.store.as_ref(), lock_key).await
    }

    /// Claim the lock when absent or stale, renew it when owned, otherwise
    /// report standby. A malformed record counts as absent.
    pub async fn try_acquire_or_renew(
        &self,
        lock_key: &str,
        owner_id: &str,
        now_ms: u64,
    ) -> Result<Election, StoreError> {
        let current = self.current(lock_key).await?;

        let election = match current {
            Some(lock) if lock.owner_id == owner_id => Election::Renewed,
            Some(lock) if lock.is_fresh(now_ms, self.stale_threshold_ms) => {
                debug!(
                    "Lock {} held by {} (heartbeat {})",
                    lock_key, lock.owner_id, lock.last_heartbeat_ms
                );
                return Ok(Election::Standby {
                    owner: lock.owner_id,
                });
            }
            Some(lock) => {
                info!(
                    "Taking over stale lock {} from {} (age {}ms)",
                    lock_key,
                    lock.owner_id,
                    now_ms.saturating_sub(lock.last_heartbeat_ms)
                );
                Election::Acquired
            }
            None => Election::Acquired,
        };

        let record = InstanceLock {
            owner_id: owner_id.to_string(),
            last_heartbeat_ms: now_ms,
        };
        set_json(self.store.as_ref(), lock_key, &record).await?;
        Ok(election)
    }

    /// Drop the lock if `owner_id` still holds it.
    pub async fn release(&self, lock_key: &str, owner_id: &str) -> Result<bool, StoreError> {
        match self.current(lock_key).await? {
            Some(lock) if lock.owner_id == owner_id => {
                self.store.remove(lock_key).await?;
                debug!("Released lock {}", lock_key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
