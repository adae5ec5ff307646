//! # Typed Resource Handle
//!
//! [`ResourceHandle`] wraps a [`LoaderClient`] for one resource kind. Params go in as the
//! resource's own type and results come back decoded, so binding code never touches
//! JSON directly.

use crate::client::LoaderClient;
use crate::error::LoaderError;
use crate::message::LoadOutcome;
use crate::resource::Resource;
use crate::state::{LoaderState, ResourceKey};
use crate::subscription::Subscriber;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, instrument};

pub struct ResourceHandle<R: Resource> {
    client: LoaderClient,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Clone for ResourceHandle<R> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

impl<R: Resource> ResourceHandle<R> {
    pub fn new(client: LoaderClient) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    pub fn key(&self, id: impl Into<String>) -> ResourceKey {
        ResourceKey::new(R::NAME, id)
    }

    pub fn client(&self) -> &LoaderClient {
        &self.client
    }

    fn encode(params: &R::Params) -> Result<Value, LoaderError> {
        serde_json::to_value(params).map_err(LoaderError::Params)
    }

    #[instrument(skip(self, subscriber), fields(resource_type = R::NAME))]
    pub async fn load_if_needed(
        &self,
        id: &str,
        params: &R::Params,
        subscriber: &Subscriber,
    ) -> Result<LoadOutcome, LoaderError> {
        debug!("Sending request");
        self.client
            .load_if_needed(self.key(id), Self::encode(params)?, subscriber.clone())
            .await
    }

    #[instrument(skip(self), fields(resource_type = R::NAME))]
    pub async fn refresh(&self, id: &str, params: &R::Params) -> Result<bool, LoaderError> {
        debug!("Sending request");
        self.client
            .refresh(self.key(id), Self::encode(params)?)
            .await
    }

    #[instrument(skip(self), fields(resource_type = R::NAME))]
    pub async fn next_page(&self, id: &str, params: &R::Params) -> Result<bool, LoaderError> {
        debug!("Sending request");
        self.client
            .next_page(self.key(id), Self::encode(params)?)
            .await
    }

    #[instrument(skip(self), fields(resource_type = R::NAME))]
    pub async fn update(&self, id: &str, params: &R::Params) -> Result<bool, LoaderError> {
        debug!("Sending request");
        self.client
            .update(self.key(id), Self::encode(params)?)
            .await
    }

    #[instrument(skip(self, subscriber), fields(resource_type = R::NAME))]
    pub async fn unload(
        &self,
        id: &str,
        params: &R::Params,
        subscriber: &Subscriber,
    ) -> Result<bool, LoaderError> {
        debug!("Sending request");
        self.client
            .unload(self.key(id), Self::encode(params)?, subscriber.clone())
            .await
    }

    pub async fn loader_state(&self, id: &str) -> Result<LoaderState, LoaderError> {
        self.client.loader_state(self.key(id)).await
    }

    /// The decoded result held for `id`, if any.
    pub async fn data(&self, id: &str) -> Result<Option<R::Output>, LoaderError> {
        let loader = self.loader_state(id).await?;
        loader.data.decode().map_err(LoaderError::Decode)
    }
}
