//! Page automation core for auto-accept.
//!
//! Everything in this crate runs against the [`PageInspector`] and
//! [`OverlaySurface`] capabilities, so the same logic drives a real webview
//! over the DevTools protocol (see `autoaccept-cdp`) and the in-memory
//! [`MemoryPage`] used by tests.
//!
//! ## Architecture
//!
//! ```text
//! AgentSession ──► simple loop ──► click pass ──► ActionClassifier
//!      │                                │
//!      └────────► TabCycler ────────────┤──────► CommandGuard
//!                    │                  │
//!                    └► OverlayPresenter└──────► PageInspector
//! ```
//!
//! ## Cancellation
//!
//! Loops are cooperative. Each one captures the session generation when it is
//! spawned and re-checks `(running, generation)` after every sleep and before
//! every click, so `stop()` and restarts never wait for an old loop to unwind.

pub mod classifier;
mod clicker;
mod error;
pub mod guard;
pub mod inspector;
pub mod memory;
pub mod overlay;
pub mod profile;
pub mod scanner;
pub mod session;
pub mod tabs;

pub use classifier::{ActionClassifier, RejectReason, Verdict};
pub use error::InspectError;
pub use guard::{BannedPattern, CommandGuard};
pub use inspector::{ElementHandle, ElementSnapshot, Layout, PageInspector};
pub use memory::{ClickAction, MemoryPage, NodeSpec};
pub use overlay::{CompletionStatus, OverlayPresenter, OverlaySurface, StatusCard};
pub use profile::{Ide, IdeProfile, ProfileSet, ZoneMarkers};
pub use session::{AgentSession, Mode, SessionConfig, SessionOptions, SessionStats};
pub use tabs::{CycleTimings, TabState};
