use std::fmt;
use std::future::Future;

use futures::future::{FutureExt, LocalBoxFuture};

/// Boxed async producer, used for the initializer and async derivations.
pub type Producer<T, E> = Box<dyn FnOnce() -> LocalBoxFuture<'static, Result<T, E>>>;

type SyncDerivation<T> = Box<dyn FnOnce(Option<&T>) -> T>;
type AsyncDerivation<T, E> = Box<dyn FnOnce(Option<&T>) -> LocalBoxFuture<'static, Result<T, E>>>;

/// What a setter call should do, classified before dispatch.
///
/// Plain values convert through `From`, so `setter.set(5)` works directly.
pub enum Update<T, E> {
    /// Replace with this value.
    Value(T),
    /// Replace with no value.
    Clear,
    /// Compute the next value from the current one, synchronously.
    Derive(SyncDerivation<T>),
    /// Compute the next value from the current one, asynchronously.
    /// The state shows `loading` until the future settles.
    DeriveAsync(AsyncDerivation<T, E>),
}

impl<T: 'static, E: 'static> Update<T, E> {
    pub fn clear() -> Self {
        Update::Clear
    }

    pub fn derive(f: impl FnOnce(Option<&T>) -> T + 'static) -> Self {
        Update::Derive(Box::new(f))
    }

    pub fn derive_async<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Option<&T>) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        Update::DeriveAsync(Box::new(move |current| f(current).boxed_local()))
    }

    /// Async update that ignores the current value.
    pub fn from_future<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        Update::DeriveAsync(Box::new(move |_| fut.boxed_local()))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Update::DeriveAsync(_))
    }
}

impl<T, E> From<T> for Update<T, E> {
    fn from(value: T) -> Self {
        Update::Value(value)
    }
}

impl<T, E> fmt::Debug for Update<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Value(_) => f.write_str("Update::Value"),
            Update::Clear => f.write_str("Update::Clear"),
            Update::Derive(_) => f.write_str("Update::Derive"),
            Update::DeriveAsync(_) => f.write_str("Update::DeriveAsync"),
        }
    }
}

/// Box an async initializer.
pub fn producer<T, E, F, Fut>(f: F) -> Producer<T, E>
where
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    Box::new(move || f().boxed_local())
}
