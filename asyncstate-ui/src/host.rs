//! Dioxus implementation of the reducer host.
//!
//! Every [`Host`] call maps to one hook call, so a component must create its
//! reducers unconditionally and in the same order on every render, like any
//! other Dioxus hook.

use std::fmt;

use asyncstate_core::{Host, SlotError, State, StateSlot};
use dioxus::core::{current_scope_id, Runtime, ScopeId};
use dioxus::prelude::*;
use futures::future::{FutureExt, LocalBoxFuture};
use tracing::debug;

/// Host bound to the component that owns the reducer.
///
/// Tasks are spawned into the owner's scope, not whichever scope happens to
/// be current, so a setter passed down to a child keeps settling after that
/// child unmounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DioxusHost {
    scope: ScopeId,
}

impl DioxusHost {
    /// Host for the component currently rendering.
    pub fn current() -> Self {
        Self {
            scope: current_scope_id(),
        }
    }
}

/// State slot backed by a component-scoped `Signal`.
pub struct SignalSlot<T: 'static, E: 'static> {
    signal: Signal<State<T, E>>,
}

impl<T: 'static, E: 'static> Clone for SignalSlot<T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static, E: 'static> Copy for SignalSlot<T, E> {}

fn unavailable(e: impl fmt::Display) -> SlotError {
    SlotError::Unavailable(e.to_string())
}

impl<T: 'static, E: 'static> StateSlot<T, E> for SignalSlot<T, E> {
    fn snapshot<R>(&self, f: impl FnOnce(&State<T, E>) -> R) -> Result<R, SlotError> {
        let state = self.signal.try_read().map_err(unavailable)?;
        Ok(f(&*state))
    }

    fn peek<R>(&self, f: impl FnOnce(&State<T, E>) -> R) -> Result<R, SlotError> {
        let state = self.signal.try_peek().map_err(unavailable)?;
        Ok(f(&*state))
    }

    fn update(&self, f: impl FnOnce(State<T, E>) -> State<T, E>) -> Result<(), SlotError> {
        let mut signal = self.signal;
        let mut state = signal.try_write().map_err(unavailable)?;
        let current = std::mem::take(&mut *state);
        *state = f(current);
        Ok(())
    }
}

impl Host for DioxusHost {
    type Slot<T: 'static, E: 'static> = SignalSlot<T, E>;

    fn register_state<T: 'static, E: 'static>(
        &self,
        init: impl FnOnce() -> State<T, E>,
    ) -> SignalSlot<T, E> {
        SignalSlot {
            signal: use_signal(init),
        }
    }

    fn run_once(&self, effect: impl FnOnce() + 'static) {
        // The task is polled after the render that spawned it, and only the
        // first render's closure is ever used.
        let host = *self;
        use_hook(move || host.spawn(async move { effect() }.boxed_local()));
    }

    fn stable<V: Clone + 'static>(&self, init: impl FnOnce() -> V) -> V {
        use_hook(init)
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        match Runtime::try_current() {
            Some(runtime) => {
                runtime.spawn(self.scope, task);
            }
            None => debug!(scope = ?self.scope, "no dioxus runtime, task dropped"),
        }
    }
}
