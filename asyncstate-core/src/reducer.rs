use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, trace, warn};

use crate::host::{Host, SlotError, StateSlot};
use crate::state::{reduce, Action, State};
use crate::update::{Producer, Update};

/// How overlapping async updates settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Every settlement is applied; whichever arrives last wins, even if it
    /// was issued earlier.
    LastToSettle,
    /// Only the settlement of the most recent `set`/`reset` call is applied.
    LatestCall,
}

#[allow(clippy::derivable_impls)]
impl Default for Settlement {
    fn default() -> Self {
        Settlement::LastToSettle
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReducerConfig {
    pub settlement: Settlement,
}

impl ReducerConfig {
    pub fn latest_call() -> Self {
        Self {
            settlement: Settlement::LatestCall,
        }
    }
}

/// Captured once per instance.
struct Shared<T> {
    initial: Option<T>,
    config: ReducerConfig,
    /// Ticket of the most recent call.
    latest: Cell<u64>,
}

impl<T> Shared<T> {
    fn next_ticket(&self) -> u64 {
        let ticket = self.latest.get() + 1;
        self.latest.set(ticket);
        ticket
    }

    fn is_stale(&self, ticket: u64) -> bool {
        self.config.settlement == Settlement::LatestCall && self.latest.get() != ticket
    }
}

/// Applies actions to the slot. Held by spawned settlements; see
/// [`StateSlot`] for the lifetime rule.
struct Dispatcher<T, E, S> {
    slot: S,
    shared: Rc<Shared<T>>,
    _error: PhantomData<fn(E)>,
}

impl<T, E, S: Clone> Clone for Dispatcher<T, E, S> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            shared: self.shared.clone(),
            _error: PhantomData,
        }
    }
}

impl<T, E, S> Dispatcher<T, E, S>
where
    T: Clone + 'static,
    E: 'static,
    S: StateSlot<T, E>,
{
    fn dispatch(&self, action: Action<T, E>) {
        let kind = action.kind();
        trace!(action = kind, "dispatch");
        if let Err(e) = self.slot.update(|state| reduce(state, action)) {
            debug!(action = kind, error = %e, "dropping dispatch");
        }
    }

    fn current(&self) -> Result<Option<T>, SlotError> {
        self.slot.peek(|state| state.data().cloned())
    }

    async fn settle(self, task: LocalBoxFuture<'static, Result<T, E>>, ticket: u64) {
        let outcome = task.await;
        if self.shared.is_stale(ticket) {
            debug!(
                ticket,
                latest = self.shared.latest.get(),
                "dropping stale async update"
            );
            return;
        }
        let action = match outcome {
            Ok(data) => Action::Replace(Some(data)),
            Err(error) => Action::Failed(error),
        };
        self.dispatch(action);
    }
}

/// Handle to one state reducer instance.
///
/// Returned pieces ([`Setter`], [`Status`]) share it; cloning is cheap.
pub struct StateReducer<T: 'static, E: 'static, H: Host> {
    host: H,
    dispatcher: Dispatcher<T, E, H::Slot<T, E>>,
}

impl<T: 'static, E: 'static, H: Host> Clone for StateReducer<T, E, H> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<T, E, H> StateReducer<T, E, H>
where
    T: Clone + 'static,
    E: Clone + 'static,
    H: Host,
{
    /// Create (or, on later activations, re-attach to) a state reducer.
    ///
    /// Returns the current value, a setter, and the async status. `initial`
    /// is evaluated on first activation only and is what [`Status::reset`]
    /// restores. `initializer`, if any, runs once after first activation;
    /// the state starts out loading in that case.
    pub fn create(
        host: H,
        initial: impl FnOnce() -> Option<T>,
        initializer: Option<Producer<T, E>>,
    ) -> (Option<T>, Setter<T, E, H>, Status<T, E, H>) {
        Self::create_with(host, ReducerConfig::default(), initial, initializer)
    }

    pub fn create_with(
        host: H,
        config: ReducerConfig,
        initial: impl FnOnce() -> Option<T>,
        initializer: Option<Producer<T, E>>,
    ) -> (Option<T>, Setter<T, E, H>, Status<T, E, H>) {
        let shared = host.stable(move || {
            Rc::new(Shared {
                initial: initial(),
                config,
                latest: Cell::new(0),
            })
        });

        let has_initializer = initializer.is_some();
        let slot: H::Slot<T, E> = host.register_state({
            let shared = shared.clone();
            move || {
                let state = State::<T, E>::idle(shared.initial.clone());
                if has_initializer {
                    reduce(state, Action::Loading)
                } else {
                    state
                }
            }
        });

        let reducer = StateReducer {
            host: host.clone(),
            dispatcher: Dispatcher {
                slot,
                shared,
                _error: PhantomData,
            },
        };

        // Registered unconditionally so hook order never depends on the
        // initializer.
        {
            let reducer = reducer.clone();
            host.run_once(move || reducer.run_initializer(initializer));
        }

        let (value, loading, failed, error) = reducer
            .dispatcher
            .slot
            .snapshot(|s| {
                (
                    s.data().cloned(),
                    s.is_loading(),
                    s.is_failed(),
                    s.error().cloned(),
                )
            })
            .unwrap_or_else(|e| {
                warn!(error = %e, "state unreadable during activation");
                (None, false, false, None)
            });

        let status = Status {
            loading,
            failed,
            error,
            reducer: reducer.clone(),
        };
        (value, Setter { reducer }, status)
    }

    pub fn set(&self, update: impl Into<Update<T, E>>) {
        let update = update.into();
        let ticket = self.dispatcher.shared.next_ticket();
        match update {
            Update::Value(data) => self.dispatcher.dispatch(Action::Replace(Some(data))),
            Update::Clear => self.dispatcher.dispatch(Action::Replace(None)),
            Update::Derive(derive) => {
                let Some(current) = self.current_or_log() else {
                    return;
                };
                let next = derive(current.as_ref());
                self.dispatcher.dispatch(Action::Replace(Some(next)));
            }
            Update::DeriveAsync(derive) => {
                let Some(current) = self.current_or_log() else {
                    return;
                };
                let task = derive(current.as_ref());
                self.dispatcher.dispatch(Action::Loading);
                self.spawn_settlement(task, ticket);
            }
        }
    }

    /// Restore the value captured at creation and clear the async status.
    pub fn reset(&self) {
        self.dispatcher.shared.next_ticket();
        let initial = self.dispatcher.shared.initial.clone();
        self.dispatcher.dispatch(Action::Reset(initial));
    }

    /// Committed state, read without subscribing.
    pub fn state(&self) -> Result<State<T, E>, SlotError> {
        self.dispatcher.slot.peek(|state| state.clone())
    }

    pub fn config(&self) -> ReducerConfig {
        self.dispatcher.shared.config
    }

    fn run_initializer(&self, producer: Option<Producer<T, E>>) {
        let Some(producer) = producer else {
            return;
        };
        // Loading was already applied to the initial state.
        let ticket = self.dispatcher.shared.next_ticket();
        self.spawn_settlement(producer(), ticket);
    }

    fn spawn_settlement(&self, task: LocalBoxFuture<'static, Result<T, E>>, ticket: u64) {
        let dispatcher = self.dispatcher.clone();
        self.host.spawn(dispatcher.settle(task, ticket).boxed_local());
    }

    fn current_or_log(&self) -> Option<Option<T>> {
        match self.dispatcher.current() {
            Ok(current) => Some(current),
            Err(e) => {
                debug!(error = %e, "ignoring update");
                None
            }
        }
    }

    fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.dispatcher.shared, &other.dispatcher.shared)
    }
}

/// Setter returned by [`StateReducer::create`].
///
/// Identity is stable across re-renders: two setters compare equal when they
/// drive the same instance.
pub struct Setter<T: 'static, E: 'static, H: Host> {
    reducer: StateReducer<T, E, H>,
}

impl<T: 'static, E: 'static, H: Host> Clone for Setter<T, E, H> {
    fn clone(&self) -> Self {
        Self {
            reducer: self.reducer.clone(),
        }
    }
}

impl<T, E, H> Setter<T, E, H>
where
    T: Clone + 'static,
    E: Clone + 'static,
    H: Host,
{
    /// Apply a literal value, a sync derivation, or an async derivation.
    ///
    /// Sync derivations run immediately; a panic inside one propagates to the
    /// caller. Async derivations flip the status to loading and settle later.
    pub fn set(&self, update: impl Into<Update<T, E>>) {
        self.reducer.set(update)
    }

    pub fn reducer(&self) -> &StateReducer<T, E, H> {
        &self.reducer
    }
}

impl<T, E, H> PartialEq for Setter<T, E, H>
where
    T: Clone + 'static,
    E: Clone + 'static,
    H: Host,
{
    fn eq(&self, other: &Self) -> bool {
        self.reducer.same_instance(&other.reducer)
    }
}

impl<T: 'static, E: 'static, H: Host> fmt::Debug for Setter<T, E, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").finish_non_exhaustive()
    }
}

/// Async status snapshot taken at activation, plus `reset`.
pub struct Status<T: 'static, E: 'static, H: Host> {
    pub loading: bool,
    pub failed: bool,
    pub error: Option<E>,
    reducer: StateReducer<T, E, H>,
}

impl<T, E, H> Status<T, E, H>
where
    T: Clone + 'static,
    E: Clone + 'static,
    H: Host,
{
    pub fn reset(&self) {
        self.reducer.reset()
    }
}

impl<T: 'static, E: Clone + 'static, H: Host> Clone for Status<T, E, H> {
    fn clone(&self) -> Self {
        Self {
            loading: self.loading,
            failed: self.failed,
            error: self.error.clone(),
            reducer: self.reducer.clone(),
        }
    }
}

impl<T, E, H> PartialEq for Status<T, E, H>
where
    T: Clone + 'static,
    E: Clone + PartialEq + 'static,
    H: Host,
{
    fn eq(&self, other: &Self) -> bool {
        self.loading == other.loading
            && self.failed == other.failed
            && self.error == other.error
            && self.reducer.same_instance(&other.reducer)
    }
}

impl<T: 'static, E: fmt::Debug + 'static, H: Host> fmt::Debug for Status<T, E, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Status")
            .field("loading", &self.loading)
            .field("failed", &self.failed)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
