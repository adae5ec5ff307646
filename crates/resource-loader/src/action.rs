//! # Reducer Actions
//!
//! The closed set of transitions the reducer understands. Adding a variant forces every
//! `match` over actions (the reducer first of all) to handle it.

use crate::error::LoadError;
use crate::state::{AggregateState, LoadKind, ResourceKey};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Resets to an empty state.
    Init,
    /// Installs a state produced elsewhere, typically by a server render.
    Hydrate(AggregateState),
    LoadData {
        key: ResourceKey,
    },
    Refresh {
        key: ResourceKey,
    },
    NextPage {
        key: ResourceKey,
    },
    /// `trigger` is only used when the key is not in flight (synchronous completion).
    LoadDataCompleted {
        key: ResourceKey,
        result: Value,
        from_server_render: bool,
        trigger: LoadKind,
    },
    LoadDataFailed {
        key: ResourceKey,
        error: LoadError,
        trigger: LoadKind,
    },
    UnloadData {
        key: ResourceKey,
    },
}

impl Action {
    /// The triggering action for a load of the given kind.
    pub fn begin(kind: LoadKind, key: ResourceKey) -> Self {
        match kind {
            LoadKind::InitialFetch => Action::LoadData { key },
            LoadKind::Refresh => Action::Refresh { key },
            LoadKind::Page => Action::NextPage { key },
        }
    }

    /// The resource instance the action targets; `None` for whole-state actions.
    pub fn key(&self) -> Option<&ResourceKey> {
        match self {
            Action::Init | Action::Hydrate(_) => None,
            Action::LoadData { key }
            | Action::Refresh { key }
            | Action::NextPage { key }
            | Action::LoadDataCompleted { key, .. }
            | Action::LoadDataFailed { key, .. }
            | Action::UnloadData { key } => Some(key),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Init => "Init",
            Action::Hydrate(_) => "Hydrate",
            Action::LoadData { .. } => "LoadData",
            Action::Refresh { .. } => "Refresh",
            Action::NextPage { .. } => "NextPage",
            Action::LoadDataCompleted { .. } => "LoadDataCompleted",
            Action::LoadDataFailed { .. } => "LoadDataFailed",
            Action::UnloadData { .. } => "UnloadData",
        }
    }
}
