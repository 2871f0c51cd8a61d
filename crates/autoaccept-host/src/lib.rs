//! Host-side supervision for auto-accept.
//!
//! One [`Supervisor`] runs per host process. Several processes may attach to
//! the same IDE; they share a [`KeyValueStore`] and elect a single driver
//! through the [`InstanceCoordinator`] so pages are never automated twice.

mod coordinator;
mod error;
mod stats;
mod store;
mod supervisor;

pub use coordinator::{
    DEFAULT_STALE_THRESHOLD_MS, Election, InstanceCoordinator, InstanceLock, lock_key, new_owner_id,
};
pub use error::{HostError, StoreError};
pub use stats::{
    DEFAULT_SECONDS_PER_CLICK, STATS_KEY, StatsRecorder, WeeklyStats, format_saved, week_start_ms,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, get_json, set_json};
pub use supervisor::{PageDriver, Supervisor, SupervisorSettings};
