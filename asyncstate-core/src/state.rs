/// Value slot plus async status for one state reducer instance.
///
/// Only changed through [`reduce`], which keeps the flags consistent:
/// `loading` and `failed` are never both set, `error` is only present while
/// `failed`, and `data` survives a failed update untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct State<T, E> {
    data: Option<T>,
    loading: bool,
    failed: bool,
    error: Option<E>,
}

impl<T, E> Default for State<T, E> {
    fn default() -> Self {
        Self::idle(None)
    }
}

impl<T, E> State<T, E> {
    /// Fresh state holding `data`, not loading, not failed.
    pub fn idle(data: Option<T>) -> Self {
        Self {
            data,
            loading: false,
            failed: false,
            error: None,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Rejection reason of the most recent failed async update.
    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    pub fn phase(&self) -> Phase<'_, T, E> {
        match (self.loading, &self.error) {
            (true, _) => Phase::Loading {
                previous: self.data.as_ref(),
            },
            (false, Some(error)) if self.failed => Phase::Failed {
                previous: self.data.as_ref(),
                error,
            },
            _ => Phase::Idle {
                data: self.data.as_ref(),
            },
        }
    }
}

/// State machine view of a [`State`].
#[derive(Debug, PartialEq)]
pub enum Phase<'a, T, E> {
    Idle { data: Option<&'a T> },
    /// An async update is pending; `previous` is what it will replace.
    Loading { previous: Option<&'a T> },
    Failed {
        previous: Option<&'a T>,
        error: &'a E,
    },
}

/// Transition requested by the setter, reset or an async settlement.
#[derive(Debug, Clone, PartialEq)]
pub enum Action<T, E> {
    Replace(Option<T>),
    Reset(Option<T>),
    Loading,
    Failed(E),
}

impl<T, E> Action<T, E> {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Replace(_) => "replace",
            Action::Reset(_) => "reset",
            Action::Loading => "loading",
            Action::Failed(_) => "failed",
        }
    }
}

/// Pure transition function. No side effects; hosts apply it to their slot.
pub fn reduce<T, E>(state: State<T, E>, action: Action<T, E>) -> State<T, E> {
    match action {
        Action::Replace(data) | Action::Reset(data) => State::idle(data),
        Action::Loading => State {
            data: state.data,
            loading: true,
            failed: false,
            error: None,
        },
        Action::Failed(error) => State {
            data: state.data,
            loading: false,
            failed: true,
            error: Some(error),
        },
    }
}
