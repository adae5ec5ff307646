//! # Loader Client
//!
//! The explicit handle the binding layer threads through every call into the loader.

use crate::error::LoaderError;
use crate::message::{LoadOutcome, LoaderRequest};
use crate::state::{AggregateState, LoaderState, ResourceKey};
use crate::subscription::{ListenerId, StateListenerFn, Subscriber};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// A cloneable client for a [`LoaderActor`](crate::actor::LoaderActor).
///
/// Every call returns once the actor has finished handling it: the dispatches and
/// events it caused have already happened. Fetches it started may still be in flight;
/// use [`wait_until_settled`](Self::wait_until_settled) to wait for them.
#[derive(Clone)]
pub struct LoaderClient {
    sender: mpsc::Sender<LoaderRequest>,
    loading: watch::Receiver<usize>,
}

impl LoaderClient {
    pub fn new(sender: mpsc::Sender<LoaderRequest>, loading: watch::Receiver<usize>) -> Self {
        Self { sender, loading }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, LoaderError>>) -> LoaderRequest,
    ) -> Result<T, LoaderError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| LoaderError::ActorClosed)?;
        response.await.map_err(|_| LoaderError::ActorDropped)?
    }

    /// Attaches `subscriber` to `key` and loads the resource if the render mode calls for it.
    pub async fn load_if_needed(
        &self,
        key: ResourceKey,
        params: Value,
        subscriber: Subscriber,
    ) -> Result<LoadOutcome, LoaderError> {
        self.request(|respond_to| LoaderRequest::LoadIfNeeded {
            key,
            params,
            subscriber,
            respond_to,
        })
        .await
    }

    pub async fn refresh(&self, key: ResourceKey, params: Value) -> Result<bool, LoaderError> {
        self.request(|respond_to| LoaderRequest::Refresh {
            key,
            params,
            respond_to,
        })
        .await
    }

    pub async fn next_page(&self, key: ResourceKey, params: Value) -> Result<bool, LoaderError> {
        self.request(|respond_to| LoaderRequest::NextPage {
            key,
            params,
            respond_to,
        })
        .await
    }

    /// Reloads after the identifying params changed.
    pub async fn update(&self, key: ResourceKey, params: Value) -> Result<bool, LoaderError> {
        self.request(|respond_to| LoaderRequest::Update {
            key,
            params,
            respond_to,
        })
        .await
    }

    /// Detaches `subscriber`. Returns true when it was the last consumer and the
    /// instance's state was unloaded.
    pub async fn unload(
        &self,
        key: ResourceKey,
        params: Value,
        subscriber: Subscriber,
    ) -> Result<bool, LoaderError> {
        self.request(|respond_to| LoaderRequest::Unload {
            key,
            params,
            subscriber,
            respond_to,
        })
        .await
    }

    /// A snapshot of the aggregate state.
    pub async fn state(&self) -> Result<Arc<AggregateState>, LoaderError> {
        self.request(|respond_to| LoaderRequest::GetState { respond_to })
            .await
    }

    pub async fn loader_state(&self, key: ResourceKey) -> Result<LoaderState, LoaderError> {
        Ok(self.state().await?.loader_state(&key))
    }

    pub async fn add_state_listener(
        &self,
        listener: StateListenerFn,
    ) -> Result<ListenerId, LoaderError> {
        self.request(|respond_to| LoaderRequest::AddListener {
            listener,
            respond_to,
        })
        .await
    }

    pub async fn remove_state_listener(&self, id: ListenerId) -> Result<bool, LoaderError> {
        self.request(|respond_to| LoaderRequest::RemoveListener { id, respond_to })
            .await
    }

    /// Async fetches currently awaited by the loader.
    pub fn number_loading(&self) -> usize {
        *self.loading.borrow()
    }

    /// Resolves once no async fetch is in flight.
    pub async fn wait_until_settled(&self) -> Result<(), LoaderError> {
        let mut loading = self.loading.clone();
        loading
            .wait_for(|n| *n == 0)
            .await
            .map(|_| ())
            .map_err(|_| LoaderError::ActorClosed)
    }
}
