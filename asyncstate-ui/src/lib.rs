//! asyncstate-ui - Dioxus hooks for async-aware component state
//!
//! ```ignore
//! #[component]
//! fn Profile(user_id: String) -> Element {
//!     let (profile, set_profile, status) =
//!         use_state_reducer_with(|| None, move || fetch_profile(user_id.clone()));
//!
//!     rsx! {
//!         if status.loading { LoadingSpinner {} }
//!         if let Some(error) = status.error.clone() { ErrorDisplay { message: error } }
//!         button { onclick: move |_| status.reset(), "Reset" }
//!     }
//! }
//! ```

pub mod host;

use std::future::Future;

use asyncstate_core::{Setter, StateReducer, Status};

pub use asyncstate_core::{producer, Phase, Producer, ReducerConfig, Settlement, State, Update};
pub use host::{DioxusHost, SignalSlot};

pub type StateSetter<T, E> = Setter<T, E, DioxusHost>;
pub type StateStatus<T, E> = Status<T, E, DioxusHost>;

/// Current value, setter, and async status.
pub type UseStateReducer<T, E> = (Option<T>, StateSetter<T, E>, StateStatus<T, E>);

/// Component state with async update tracking and reset.
///
/// `initial` runs on first render only; [`Status::reset`] restores its value.
pub fn use_state_reducer<T, E>(initial: impl FnOnce() -> Option<T>) -> UseStateReducer<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    StateReducer::create(DioxusHost::current(), initial, None)
}

/// Like [`use_state_reducer`], and runs `initializer` once after the first
/// render. The state reads as loading until it settles.
pub fn use_state_reducer_with<T, E, F, Fut>(
    initial: impl FnOnce() -> Option<T>,
    initializer: F,
) -> UseStateReducer<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    StateReducer::create(DioxusHost::current(), initial, Some(producer(initializer)))
}

/// Full form: explicit settlement config and optional initializer. `config`
/// is captured on first render like `initial`.
pub fn use_state_reducer_config<T, E>(
    config: ReducerConfig,
    initial: impl FnOnce() -> Option<T>,
    initializer: Option<Producer<T, E>>,
) -> UseStateReducer<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    StateReducer::create_with(DioxusHost::current(), config, initial, initializer)
}
