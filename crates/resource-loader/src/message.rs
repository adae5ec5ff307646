//! # Loader Messages
//!
//! This module defines the message types exchanged between the [`LoaderClient`] and the
//! [`LoaderActor`].
//!
//! Every variant carries the identifying `params` of the call. The binding layer forwards
//! whatever params it has on every interaction and the cache key is re-derived from them
//! each time, never cached on the binding side.
//!
//! [`LoaderClient`]: crate::client::LoaderClient
//! [`LoaderActor`]: crate::actor::LoaderActor

use crate::error::LoaderError;
use crate::state::{AggregateState, ResourceKey};
use crate::subscription::{ListenerId, StateListenerFn, Subscriber};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the loader.
pub type Response<T> = oneshot::Sender<Result<T, LoaderError>>;

/// What `load_if_needed` did after attaching the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// An asynchronous fetch is now in flight.
    Started,
    /// The fetch answered synchronously and its result is already in the state.
    Completed,
    /// The fetch failed synchronously.
    Failed,
    /// No load was needed; the current state was handed to the consumer.
    Delivered,
}

impl LoadOutcome {
    /// Whether the call invoked the fetch function.
    pub fn fetched(self) -> bool {
        !matches!(self, LoadOutcome::Delivered)
    }
}

/// Requests processed by the loader, one at a time, in arrival order.
///
/// `Refresh`, `NextPage` and `Update` answer `false` when the call was ignored because
/// the instance is busy or has no attached consumer. `Unload` answers whether the
/// detached consumer was the last one.
#[derive(Debug)]
pub enum LoaderRequest {
    LoadIfNeeded {
        key: ResourceKey,
        params: Value,
        subscriber: Subscriber,
        respond_to: Response<LoadOutcome>,
    },
    Refresh {
        key: ResourceKey,
        params: Value,
        respond_to: Response<bool>,
    },
    NextPage {
        key: ResourceKey,
        params: Value,
        respond_to: Response<bool>,
    },
    Update {
        key: ResourceKey,
        params: Value,
        respond_to: Response<bool>,
    },
    Unload {
        key: ResourceKey,
        params: Value,
        subscriber: Subscriber,
        respond_to: Response<bool>,
    },
    GetState {
        respond_to: Response<Arc<AggregateState>>,
    },
    AddListener {
        listener: StateListenerFn,
        respond_to: Response<ListenerId>,
    },
    RemoveListener {
        id: ListenerId,
        respond_to: Response<bool>,
    },
}
