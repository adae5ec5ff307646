//! # State Reducer
//!
//! `(previous state, action) → next state`, with no side effects.
//!
//! The input is never touched: every transition clones what it needs and returns a new
//! [`AggregateState`], so a snapshot handed to listeners stays valid while the next one
//! is computed.
//!
//! `loading_count` counts resource instances whose status is not `Idle`. A triggering
//! action only increments it when the instance was idle, and completion, failure and
//! unload only decrement it when the instance was in flight. A synchronous completion
//! on an idle instance therefore leaves the counter alone.
//!
//! The counter is not the actor's `number_loading`. An instance unloaded mid-flight
//! drops out of `loading_count` at once, while its fetch stays awaited (and counted in
//! `number_loading` and the loading events) until it settles and is discarded. A
//! repeated trigger on a busy instance never counts twice; the orchestrator's
//! busy-guard keeps such a trigger from being dispatched at all.

use crate::action::Action;
use crate::error::LoadError;
use crate::state::{
    AggregateState, Data, LastAction, LoadKind, LoaderState, LoaderStatus, ResourceKey,
    ResourceMap,
};
use serde_json::Value;

pub fn reduce(state: &AggregateState, action: &Action) -> AggregateState {
    match action {
        Action::Init => init(),
        Action::Hydrate(hydrated) => hydrate(hydrated),
        Action::LoadData { key } => begin(state, key, LoaderStatus::Fetching),
        Action::Refresh { key } => begin(state, key, LoaderStatus::Refreshing),
        Action::NextPage { key } => begin(state, key, LoaderStatus::Paging),
        Action::LoadDataCompleted {
            key,
            result,
            from_server_render,
            trigger,
        } => complete(state, key, result, *from_server_render, *trigger),
        Action::LoadDataFailed {
            key,
            error,
            trigger,
        } => fail(state, key, error, *trigger),
        Action::UnloadData { key } => unload(state, key),
    }
}

fn init() -> AggregateState {
    AggregateState::default()
}

/// A resumed state has nothing in flight locally.
fn hydrate(hydrated: &AggregateState) -> AggregateState {
    let mut next = hydrated.clone();
    next.loading_count = 0;
    for loader in next.data.values_mut().flat_map(|ids| ids.values_mut()) {
        loader.status = LoaderStatus::Idle;
    }
    next
}

fn begin(state: &AggregateState, key: &ResourceKey, status: LoaderStatus) -> AggregateState {
    let mut next = state.clone();
    let entry = entry_mut(&mut next.data, key);
    let was_idle = entry.status.is_idle();
    // Prior data is kept so consumers can keep showing it while the load runs.
    entry.status = status;
    if was_idle {
        next.loading_count += 1;
    }
    next
}

fn complete(
    state: &AggregateState,
    key: &ResourceKey,
    result: &Value,
    from_server_render: bool,
    trigger: LoadKind,
) -> AggregateState {
    let mut next = state.clone();
    let entry = entry_mut(&mut next.data, key);
    let in_flight = entry.status.in_flight();
    *entry = LoaderState {
        status: LoaderStatus::Idle,
        last_action: LastAction::succeeded(in_flight.unwrap_or(trigger)),
        data: Data::loaded(result.clone(), from_server_render),
    };
    if in_flight.is_some() {
        next.loading_count = next.loading_count.saturating_sub(1);
    }
    next
}

fn fail(
    state: &AggregateState,
    key: &ResourceKey,
    error: &LoadError,
    trigger: LoadKind,
) -> AggregateState {
    let mut next = state.clone();
    let entry = entry_mut(&mut next.data, key);
    let in_flight = entry.status.in_flight();
    entry.status = LoaderStatus::Idle;
    entry.last_action = LastAction::failed(in_flight.unwrap_or(trigger), error.clone());
    // Data is left alone: a failure never destroys what was already held.
    if in_flight.is_some() {
        next.loading_count = next.loading_count.saturating_sub(1);
    }
    next
}

fn unload(state: &AggregateState, key: &ResourceKey) -> AggregateState {
    let mut next = state.clone();
    let mut removed = None;
    if let Some(ids) = next.data.get_mut(&key.resource_type) {
        removed = ids.remove(&key.resource_id);
        if ids.is_empty() {
            next.data.remove(&key.resource_type);
        }
    }
    // An instance unloaded mid-flight gives up its slot; its result will be discarded.
    if removed.is_some_and(|loader| loader.is_busy()) {
        next.loading_count = next.loading_count.saturating_sub(1);
    }
    next
}

fn entry_mut<'a>(data: &'a mut ResourceMap, key: &ResourceKey) -> &'a mut LoaderState {
    data.entry(key.resource_type.clone())
        .or_default()
        .entry(key.resource_id.clone())
        .or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LastActionKind;
    use serde_json::json;

    fn key(id: &str) -> ResourceKey {
        ResourceKey::new("data", id)
    }

    fn loaded(state: &AggregateState, id: &str, value: Value) -> AggregateState {
        let fetching = reduce(state, &Action::LoadData { key: key(id) });
        reduce(
            &fetching,
            &Action::LoadDataCompleted {
                key: key(id),
                result: value,
                from_server_render: false,
                trigger: LoadKind::InitialFetch,
            },
        )
    }

    #[test]
    fn test_init_is_empty() {
        let state = reduce(&loaded(&AggregateState::new(), "1", json!(1)), &Action::Init);
        assert_eq!(state, AggregateState::new());
    }

    #[test]
    fn test_load_data_enters_fetching() {
        let state = reduce(&AggregateState::new(), &Action::LoadData { key: key("1") });
        let loader = state.get(&key("1")).unwrap();
        assert_eq!(loader.status, LoaderStatus::Fetching);
        assert_eq!(loader.last_action, LastAction::none());
        assert!(!loader.data.has_data());
        assert_eq!(state.loading_count, 1);
    }

    #[test]
    fn test_completion_stamps_prior_status() {
        let state = loaded(&AggregateState::new(), "1", json!(42));
        let loader = state.get(&key("1")).unwrap();
        assert_eq!(loader.status, LoaderStatus::Idle);
        assert_eq!(loader.last_action.kind, LastActionKind::InitialFetch);
        assert!(loader.last_action.success);
        assert_eq!(loader.data.result(), Some(&json!(42)));
        assert_eq!(state.loading_count, 0);
    }

    #[test]
    fn test_refresh_and_page_keep_prior_data() {
        let state = loaded(&AggregateState::new(), "1", json!("v1"));

        let refreshing = reduce(&state, &Action::Refresh { key: key("1") });
        let loader = refreshing.get(&key("1")).unwrap();
        assert_eq!(loader.status, LoaderStatus::Refreshing);
        assert_eq!(loader.data.result(), Some(&json!("v1")));

        let done = reduce(
            &refreshing,
            &Action::LoadDataCompleted {
                key: key("1"),
                result: json!("v2"),
                from_server_render: false,
                trigger: LoadKind::InitialFetch,
            },
        );
        assert_eq!(done.get(&key("1")).unwrap().last_action.kind, LastActionKind::Refresh);

        let paging = reduce(&done, &Action::NextPage { key: key("1") });
        let loader = paging.get(&key("1")).unwrap();
        assert_eq!(loader.status, LoaderStatus::Paging);
        assert_eq!(loader.data.result(), Some(&json!("v2")));
        assert_eq!(paging.loading_count, 1);
    }

    #[test]
    fn test_failure_keeps_data() {
        let state = loaded(&AggregateState::new(), "1", json!("kept"));
        let refreshing = reduce(&state, &Action::Refresh { key: key("1") });
        let failed = reduce(
            &refreshing,
            &Action::LoadDataFailed {
                key: key("1"),
                error: LoadError::new("boom"),
                trigger: LoadKind::InitialFetch,
            },
        );
        let loader = failed.get(&key("1")).unwrap();
        assert_eq!(loader.status, LoaderStatus::Idle);
        assert_eq!(loader.last_action.kind, LastActionKind::Refresh);
        assert!(!loader.last_action.success);
        assert_eq!(loader.last_action.error.as_ref().unwrap().message, "boom");
        assert_eq!(loader.data.result(), Some(&json!("kept")));
        assert_eq!(failed.loading_count, 0);
    }

    #[test]
    fn test_success_after_failure_clears_error() {
        let fetching = reduce(&AggregateState::new(), &Action::LoadData { key: key("1") });
        let failed = reduce(
            &fetching,
            &Action::LoadDataFailed {
                key: key("1"),
                error: LoadError::new("boom"),
                trigger: LoadKind::InitialFetch,
            },
        );
        let recovered = loaded(&failed, "1", json!(1));
        let loader = recovered.get(&key("1")).unwrap();
        assert!(loader.last_action.success);
        assert!(loader.last_action.error.is_none());
    }

    #[test]
    fn test_synchronous_completion_uses_trigger_and_keeps_count() {
        let state = reduce(
            &AggregateState::new(),
            &Action::LoadDataCompleted {
                key: key("1"),
                result: json!(7),
                from_server_render: true,
                trigger: LoadKind::InitialFetch,
            },
        );
        let loader = state.get(&key("1")).unwrap();
        assert_eq!(loader.last_action.kind, LastActionKind::InitialFetch);
        assert!(loader.data.from_server_render());
        assert_eq!(state.loading_count, 0);
    }

    #[test]
    fn test_unload_removes_entry_and_empty_type() {
        let state = loaded(&loaded(&AggregateState::new(), "1", json!(1)), "2", json!(2));

        let one_left = reduce(&state, &Action::UnloadData { key: key("1") });
        assert!(!one_left.contains(&key("1")));
        assert!(one_left.data.contains_key("data"));

        let none_left = reduce(&one_left, &Action::UnloadData { key: key("2") });
        assert!(none_left.data.is_empty());
        assert_eq!(none_left.loading_count, 0);
    }

    #[test]
    fn test_unload_in_flight_releases_slot() {
        let fetching = reduce(&AggregateState::new(), &Action::LoadData { key: key("1") });
        let other = reduce(&fetching, &Action::LoadData { key: key("2") });
        assert_eq!(other.loading_count, 2);

        let unloaded = reduce(&other, &Action::UnloadData { key: key("1") });
        assert_eq!(unloaded.loading_count, 1);

        let missing = reduce(&unloaded, &Action::UnloadData { key: key("nope") });
        assert_eq!(missing.loading_count, 1);
    }

    #[test]
    fn test_trigger_on_busy_instance_counts_once() {
        let fetching = reduce(&AggregateState::new(), &Action::LoadData { key: key("1") });
        let again = reduce(&fetching, &Action::Refresh { key: key("1") });
        assert_eq!(again.loading_count, 1);

        let done = reduce(
            &again,
            &Action::LoadDataCompleted {
                key: key("1"),
                result: json!(1),
                from_server_render: false,
                trigger: LoadKind::Refresh,
            },
        );
        assert_eq!(done.loading_count, 0);
    }

    #[test]
    fn test_input_state_is_not_mutated() {
        let before = loaded(&AggregateState::new(), "1", json!(1));
        let snapshot = before.clone();
        let _ = reduce(&before, &Action::Refresh { key: key("1") });
        let _ = reduce(&before, &Action::UnloadData { key: key("1") });
        assert_eq!(before, snapshot);
    }

    #[test]
    fn test_hydrate_resets_in_flight_state() {
        let fetching = reduce(
            &loaded(&AggregateState::new(), "1", json!(1)),
            &Action::Refresh { key: key("1") },
        );
        let hydrated = reduce(&AggregateState::new(), &Action::Hydrate(fetching));
        assert_eq!(hydrated.loading_count, 0);
        let loader = hydrated.get(&key("1")).unwrap();
        assert_eq!(loader.status, LoaderStatus::Idle);
        assert_eq!(loader.data.result(), Some(&json!(1)));
    }

    #[test]
    fn test_loading_count_never_underflows() {
        let state = reduce(
            &AggregateState::new(),
            &Action::LoadDataFailed {
                key: key("1"),
                error: LoadError::new("late"),
                trigger: LoadKind::Refresh,
            },
        );
        assert_eq!(state.loading_count, 0);
        assert_eq!(
            state.get(&key("1")).unwrap().last_action.kind,
            LastActionKind::Refresh
        );
    }
}
