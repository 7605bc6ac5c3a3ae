//! Mounts components using the hooks in a headless `VirtualDom` and records
//! what each render observed.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use asyncstate_ui::{
    producer, use_state_reducer, use_state_reducer_config, use_state_reducer_with, ReducerConfig,
    StateSetter, StateStatus, Update,
};
use dioxus::prelude::*;
use dioxus_core::{NoOpMutations, VirtualDom};

#[derive(Debug, Clone, PartialEq)]
struct Seen {
    value: Option<i32>,
    loading: bool,
    failed: bool,
    error: Option<String>,
}

thread_local! {
    static SEEN: RefCell<Vec<Seen>> = const { RefCell::new(Vec::new()) };
    static INIT_CALLS: Cell<usize> = const { Cell::new(0) };
    static RESET_DONE: Cell<bool> = const { Cell::new(false) };
}

fn tracing_init() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_line_number(true)
        .with_target(false)
        .with_file(true)
        .try_init();
}

fn record(value: Option<i32>, status: &StateStatus<i32, String>) {
    SEEN.with(|seen| {
        seen.borrow_mut().push(Seen {
            value,
            loading: status.loading,
            failed: status.failed,
            error: status.error.clone(),
        })
    });
}

fn seen() -> Vec<Seen> {
    SEEN.with(|seen| seen.borrow().clone())
}

/// Render, then keep processing work until the dom goes quiet.
async fn run_to_idle(dom: &mut VirtualDom) {
    dom.rebuild_in_place();
    for _ in 0..16 {
        if tokio::time::timeout(Duration::from_millis(50), dom.wait_for_work())
            .await
            .is_err()
        {
            break;
        }
        dom.render_immediate(&mut NoOpMutations);
    }
}

fn initializer_app() -> Element {
    let (value, _set, status) = use_state_reducer_with(
        || Some(1),
        || {
            INIT_CALLS.with(|calls| calls.set(calls.get() + 1));
            async { Ok::<i32, String>(2) }
        },
    );
    record(value, &status);
    rsx! {}
}

#[tokio::test]
async fn test_initializer_settles_after_first_render() {
    tracing_init();
    let mut dom = VirtualDom::new(initializer_app);
    run_to_idle(&mut dom).await;

    let seen = seen();
    assert_eq!(
        seen.first(),
        Some(&Seen {
            value: Some(1),
            loading: true,
            failed: false,
            error: None,
        })
    );
    assert_eq!(
        seen.last(),
        Some(&Seen {
            value: Some(2),
            loading: false,
            failed: false,
            error: None,
        })
    );
    assert!(seen.len() >= 2);
    assert_eq!(INIT_CALLS.with(|calls| calls.get()), 1);
}

fn failing_setter_app() -> Element {
    let (value, set, status) = use_state_reducer::<i32, String>(|| Some(1));
    use_hook(move || {
        spawn(async move {
            set.set(Update::from_future(async { Err("Error".to_string()) }));
        });
    });
    record(value, &status);
    rsx! {}
}

#[tokio::test]
async fn test_async_setter_failure_keeps_value() {
    tracing_init();
    let mut dom = VirtualDom::new(failing_setter_app);
    run_to_idle(&mut dom).await;

    let seen = seen();
    assert_eq!(
        seen.first(),
        Some(&Seen {
            value: Some(1),
            loading: false,
            failed: false,
            error: None,
        })
    );
    assert_eq!(
        seen.last(),
        Some(&Seen {
            value: Some(1),
            loading: false,
            failed: true,
            error: Some("Error".into()),
        })
    );
}

fn reset_app() -> Element {
    let (value, set, status) = use_state_reducer::<i32, String>(|| Some(1));
    use_hook(move || {
        spawn(async move {
            set.set(Update::derive(|n| n.copied().unwrap_or(0) + 41));
        });
    });
    if value == Some(42) && !RESET_DONE.with(|done| done.replace(true)) {
        let status = status.clone();
        spawn(async move { status.reset() });
    }
    record(value, &status);
    rsx! {}
}

#[tokio::test]
async fn test_reset_restores_initial_value() {
    tracing_init();
    let mut dom = VirtualDom::new(reset_app);
    run_to_idle(&mut dom).await;

    let values: Vec<Option<i32>> = seen().into_iter().map(|s| s.value).collect();
    assert!(values.contains(&Some(42)));
    assert_eq!(values.last(), Some(&Some(1)));
}

fn latest_call_app() -> Element {
    let (value, set, status) = use_state_reducer_config(
        ReducerConfig::latest_call(),
        || Some(1),
        Some(producer(|| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<i32, String>(2)
        })),
    );
    use_hook(move || {
        spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            set.set(3);
        });
    });
    record(value, &status);
    rsx! {}
}

#[tokio::test]
async fn test_latest_call_drops_slow_initializer() {
    tracing_init();
    let mut dom = VirtualDom::new(latest_call_app);
    run_to_idle(&mut dom).await;

    let last = seen().pop();
    assert_eq!(
        last,
        Some(Seen {
            value: Some(3),
            loading: false,
            failed: false,
            error: None,
        })
    );
}

fn slow_two() -> Update<i32, String> {
    Update::from_future(async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(2)
    })
}

fn async_setter_app() -> Element {
    let (value, set, status) = use_state_reducer::<i32, String>(|| Some(1));
    use_hook(move || {
        spawn(async move { set.set(slow_two()) });
    });
    record(value, &status);
    rsx! {}
}

#[tokio::test]
async fn test_async_setter_shows_loading_then_value() {
    tracing_init();
    let mut dom = VirtualDom::new(async_setter_app);
    run_to_idle(&mut dom).await;

    let seen = seen();
    assert!(seen.contains(&Seen {
        value: Some(1),
        loading: true,
        failed: false,
        error: None,
    }));
    assert_eq!(
        seen.last(),
        Some(&Seen {
            value: Some(2),
            loading: false,
            failed: false,
            error: None,
        })
    );
}

fn failing_initializer_app() -> Element {
    let (value, _set, status) =
        use_state_reducer_with(|| Some(1), || async { Err::<i32, String>("boom".into()) });
    record(value, &status);
    rsx! {}
}

#[tokio::test]
async fn test_initializer_failure_keeps_initial_value() {
    tracing_init();
    let mut dom = VirtualDom::new(failing_initializer_app);
    run_to_idle(&mut dom).await;

    let seen = seen();
    assert_eq!(seen.first().map(|s| s.loading), Some(true));
    assert_eq!(
        seen.last(),
        Some(&Seen {
            value: Some(1),
            loading: false,
            failed: true,
            error: Some("boom".into()),
        })
    );
}

/// Only mounted while its owner is idle, so it unmounts as soon as its own
/// update starts.
#[component]
fn RefreshButton(set: StateSetter<i32, String>) -> Element {
    use_hook(move || {
        spawn(async move { set.set(slow_two()) });
    });
    rsx! {}
}

fn child_setter_app() -> Element {
    let (value, set, status) = use_state_reducer::<i32, String>(|| Some(1));
    record(value, &status);
    rsx! {
        if !status.loading && value == Some(1) {
            RefreshButton { set: set.clone() }
        }
    }
}

#[tokio::test]
async fn test_update_from_unmounted_child_still_settles() {
    tracing_init();
    let mut dom = VirtualDom::new(child_setter_app);
    run_to_idle(&mut dom).await;

    let seen = seen();
    assert!(seen.iter().any(|s| s.loading));
    assert_eq!(
        seen.last(),
        Some(&Seen {
            value: Some(2),
            loading: false,
            failed: false,
            error: None,
        })
    );
}

#[component]
fn Owner() -> Element {
    let (value, set, status) = use_state_reducer::<i32, String>(|| Some(1));
    use_hook(move || {
        spawn(async move { set.set(slow_two()) });
    });
    record(value, &status);
    rsx! {}
}

fn teardown_app() -> Element {
    let show = use_signal(|| true);
    use_hook(move || {
        let mut show = show;
        spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            show.set(false);
        });
    });
    rsx! {
        if show() {
            Owner {}
        }
    }
}

#[tokio::test]
async fn test_teardown_with_pending_update_is_quiet() {
    tracing_init();
    let mut dom = VirtualDom::new(teardown_app);
    run_to_idle(&mut dom).await;

    let seen = seen();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|s| s.value == Some(1)));
    assert_eq!(seen.last().map(|s| s.loading), Some(true));
}
