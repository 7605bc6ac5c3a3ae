//! asyncstate-core - state reducer with async update tracking
//!
//! A value slot plus loading/failed/error flags, a setter that accepts plain
//! values or sync/async derivations, and a reset back to the value captured
//! at creation. Framework-agnostic: the UI host is injected through
//! [`Host`]. See `asyncstate-ui` for the Dioxus binding.

pub mod host;
pub mod reducer;
pub mod state;
pub mod update;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use host::{Host, SlotError, StateSlot};
pub use reducer::{ReducerConfig, Settlement, Setter, StateReducer, Status};
pub use state::{reduce, Action, Phase, State};
pub use update::{producer, Producer, Update};
