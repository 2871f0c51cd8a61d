//! Background-mode conversation tab cycling.
//!
//! The cycler clicks through the open conversation tabs of the agent panel,
//! runs a click pass on each, and records which conversations have
//! concluded so the overlay can show progress.

mod cycler;
mod names;
mod state;

pub(crate) use cycler::TabCycler;
pub use cycler::CycleTimings;
pub use names::{deduplicate_names, strip_time_suffix, tab_label};
pub use state::{NamesUpdate, TabState};
