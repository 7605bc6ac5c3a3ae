//! Capabilities a UI framework provides to a state reducer instance.
//!
//! The reducer never talks to a framework directly. It registers one state
//! slot, one run-once effect and a few stable values through [`Host`], and
//! hands its async continuations to [`Host::spawn`]. The Dioxus binding lives
//! in `asyncstate-ui`; an in-process host for tests lives in
//! [`crate::testing`].

use futures::future::LocalBoxFuture;

use crate::state::State;

#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    /// The slot was dropped with its instance, or is mutably borrowed.
    #[error("state slot unavailable: {0}")]
    Unavailable(String),
}

/// Storage for one [`State`], owned by the host and shared by the handles
/// returned from a reducer.
///
/// A slot is a handle, not an owner. Pending settlements hold clones of it,
/// so a clone must not keep the instance (or the host) alive: once the host
/// tears the instance down, every method returns [`SlotError::Unavailable`].
pub trait StateSlot<T, E>: Clone + 'static {
    /// Render-time read. Subscribes the current component where the host
    /// tracks reads.
    fn snapshot<R>(&self, f: impl FnOnce(&State<T, E>) -> R) -> Result<R, SlotError>;

    /// Read without subscribing.
    fn peek<R>(&self, f: impl FnOnce(&State<T, E>) -> R) -> Result<R, SlotError>;

    /// Replace the stored state with `f(old)`.
    fn update(&self, f: impl FnOnce(State<T, E>) -> State<T, E>) -> Result<(), SlotError>;
}

pub trait Host: Clone + 'static {
    type Slot<T: 'static, E: 'static>: StateSlot<T, E>;

    /// Register a state slot. `init` runs on first activation only; later
    /// activations get the same slot back.
    fn register_state<T: 'static, E: 'static>(
        &self,
        init: impl FnOnce() -> State<T, E>,
    ) -> Self::Slot<T, E>;

    /// Run `effect` once, after the first activation.
    fn run_once(&self, effect: impl FnOnce() + 'static);

    /// Value with stable identity across activations. `init` runs once.
    fn stable<V: Clone + 'static>(&self, init: impl FnOnce() -> V) -> V;

    /// Drive `task` on the host's single-threaded executor.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}
