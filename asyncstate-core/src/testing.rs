//! In-process host for driving a reducer without a UI framework.
//!
//! [`TestHost`] keeps hook storage by call order, queues run-once effects
//! until the end of the first render, and runs spawned tasks on a
//! `futures` [`LocalPool`] only when asked to. [`render_hook`] wraps it the
//! way a component test renderer would: mount once, re-render on demand.
//!
//! ```ignore
//! let hook = render_hook(|host| StateReducer::<i32, String, _>::create(host.clone(), || Some(1), None));
//! let (_, set, _) = hook.result();
//! set.set(2);
//! assert_eq!(hook.result().0, Some(2));
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use tracing::debug;

use crate::host::{Host, SlotError, StateSlot};
use crate::state::State;

#[derive(Default)]
struct Hooks {
    values: Vec<Rc<dyn Any>>,
    cursor: usize,
    mounted: bool,
    pending_effects: Vec<Box<dyn FnOnce()>>,
    renders: usize,
}

#[derive(Clone)]
pub struct TestHost {
    hooks: Rc<RefCell<Hooks>>,
    pool: Rc<RefCell<LocalPool>>,
    spawner: LocalSpawner,
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHost {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            hooks: Rc::new(RefCell::new(Hooks::default())),
            pool: Rc::new(RefCell::new(pool)),
            spawner,
        }
    }

    /// Run one activation of `component`, then flush first-render effects.
    pub fn render<R>(&self, component: impl FnOnce(&TestHost) -> R) -> R {
        self.hooks.borrow_mut().cursor = 0;
        let out = component(self);
        let effects = {
            let mut hooks = self.hooks.borrow_mut();
            hooks.renders += 1;
            hooks.mounted = true;
            std::mem::take(&mut hooks.pending_effects)
        };
        for effect in effects {
            effect();
        }
        out
    }

    /// Poll spawned tasks until none can make progress.
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Drop all hook storage, as a host does when an instance is torn down.
    pub fn unmount(&self) {
        let mut hooks = self.hooks.borrow_mut();
        hooks.values.clear();
        hooks.pending_effects.clear();
        hooks.mounted = false;
    }

    pub fn renders(&self) -> usize {
        self.hooks.borrow().renders
    }

    /// Existing value at the cursor, or `init()` stored there on first
    /// activation.
    fn hook<V: Any>(&self, init: impl FnOnce() -> Rc<V>) -> Rc<V> {
        let index = {
            let mut hooks = self.hooks.borrow_mut();
            let index = hooks.cursor;
            hooks.cursor += 1;
            if let Some(existing) = hooks.values.get(index) {
                return existing
                    .clone()
                    .downcast::<V>()
                    .unwrap_or_else(|_| panic!("hook {index} changed type between renders"));
            }
            assert!(!hooks.mounted, "hook {index} registered after first render");
            index
        };
        let value = init();
        let mut hooks = self.hooks.borrow_mut();
        debug_assert_eq!(hooks.values.len(), index);
        hooks.values.push(value.clone());
        value
    }
}

/// Slot handed out by [`TestHost`]. Holds a weak reference so it stops
/// working once the host unmounts.
pub struct TestSlot<T, E> {
    state: Weak<RefCell<State<T, E>>>,
}

impl<T, E> Clone for TestSlot<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: 'static, E: 'static> TestSlot<T, E> {
    fn cell(&self) -> Result<Rc<RefCell<State<T, E>>>, SlotError> {
        self.state
            .upgrade()
            .ok_or_else(|| SlotError::Unavailable("instance unmounted".to_string()))
    }
}

impl<T: 'static, E: 'static> StateSlot<T, E> for TestSlot<T, E> {
    fn snapshot<R>(&self, f: impl FnOnce(&State<T, E>) -> R) -> Result<R, SlotError> {
        self.peek(f)
    }

    fn peek<R>(&self, f: impl FnOnce(&State<T, E>) -> R) -> Result<R, SlotError> {
        let cell = self.cell()?;
        let state = cell
            .try_borrow()
            .map_err(|e| SlotError::Unavailable(e.to_string()))?;
        Ok(f(&state))
    }

    fn update(&self, f: impl FnOnce(State<T, E>) -> State<T, E>) -> Result<(), SlotError> {
        let cell = self.cell()?;
        let mut state = cell
            .try_borrow_mut()
            .map_err(|e| SlotError::Unavailable(e.to_string()))?;
        let current = std::mem::take(&mut *state);
        *state = f(current);
        Ok(())
    }
}

impl Host for TestHost {
    type Slot<T: 'static, E: 'static> = TestSlot<T, E>;

    fn register_state<T: 'static, E: 'static>(
        &self,
        init: impl FnOnce() -> State<T, E>,
    ) -> TestSlot<T, E> {
        let cell = self.hook(|| Rc::new(RefCell::new(init())));
        TestSlot {
            state: Rc::downgrade(&cell),
        }
    }

    fn run_once(&self, effect: impl FnOnce() + 'static) {
        let mut hooks = self.hooks.borrow_mut();
        if !hooks.mounted {
            hooks.pending_effects.push(Box::new(effect));
        }
    }

    fn stable<V: Clone + 'static>(&self, init: impl FnOnce() -> V) -> V {
        let value = self.hook(|| Rc::new(init()));
        V::clone(&value)
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.spawner.spawn_local(task) {
            debug!(error = %e, "test executor shut down, task dropped");
        }
    }
}

/// A hook mounted on its own [`TestHost`].
pub struct RenderedHook<R> {
    host: TestHost,
    hook: Box<dyn Fn(&TestHost) -> R>,
}

/// Mount `hook` and return a handle that re-renders it on demand.
pub fn render_hook<R: 'static>(hook: impl Fn(&TestHost) -> R + 'static) -> RenderedHook<R> {
    let host = TestHost::new();
    host.render(&hook);
    RenderedHook {
        host,
        hook: Box::new(hook),
    }
}

impl<R> RenderedHook<R> {
    /// Re-render and return what the hook returns now.
    pub fn result(&self) -> R {
        self.host.render(&self.hook)
    }

    /// Let every pending async settlement run, without re-rendering.
    pub fn settle(&self) {
        self.host.run_until_stalled();
    }

    pub fn unmount(&self) {
        self.host.unmount();
    }

    pub fn host(&self) -> &TestHost {
        &self.host
    }
}
