//! # Fetch Results
//!
//! A fetch function either answers on the spot or hands back a future. The loader
//! treats the two very differently: a [`Fetch::Ready`] value on an initial load is
//! dispatched straight away without ever entering a loading state, while a
//! [`Fetch::Pending`] future goes through the full begin/settle cycle.

use crate::config::RenderMode;
use crate::error::BoxError;
use crate::state::LoadKind;
use futures::future::{self, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// Result produced by a fetch function.
pub type FetchResult<T> = Result<T, BoxError>;

/// What a fetch function returns.
pub enum Fetch<T> {
    /// The fetch completed synchronously.
    Ready(FetchResult<T>),
    /// The fetch completes later.
    Pending(BoxFuture<'static, FetchResult<T>>),
}

impl<T: Send + 'static> Fetch<T> {
    pub fn ready(value: T) -> Self {
        Fetch::Ready(Ok(value))
    }

    pub fn failed(error: impl Into<BoxError>) -> Self {
        Fetch::Ready(Err(error.into()))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = FetchResult<T>> + Send + 'static,
    {
        Fetch::Pending(future.boxed())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Fetch::Pending(_))
    }

    /// Converts the result, keeping a ready fetch ready.
    pub fn map<U, F>(self, f: F) -> Fetch<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> FetchResult<U> + Send + 'static,
    {
        match self {
            Fetch::Ready(result) => Fetch::Ready(result.and_then(f)),
            Fetch::Pending(fut) => Fetch::Pending(fut.map(|result| result.and_then(f)).boxed()),
        }
    }

    /// Wraps a ready result in an immediately-resolving future.
    pub fn into_future(self) -> BoxFuture<'static, FetchResult<T>> {
        match self {
            Fetch::Ready(result) => future::ready(result).boxed(),
            Fetch::Pending(fut) => fut,
        }
    }
}

impl<T> fmt::Debug for Fetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fetch::Ready(Ok(_)) => f.write_str("Fetch::Ready(Ok)"),
            Fetch::Ready(Err(e)) => write!(f, "Fetch::Ready(Err({e}))"),
            Fetch::Pending(_) => f.write_str("Fetch::Pending"),
        }
    }
}

/// Everything a fetch function is told about the load it performs.
#[derive(Debug, Clone)]
pub struct LoadContext<P, T> {
    pub resource_id: String,
    pub params: P,
    pub cache_key: String,
    /// The previous result for a page load; `None` for every other load.
    pub existing_data: Option<T>,
    pub trigger: LoadKind,
    pub mode: RenderMode,
}

impl LoadContext<Value, Value> {
    /// Decodes the JSON params and existing data into a resource's own types.
    pub fn decode<P, T>(self) -> Result<LoadContext<P, T>, serde_json::Error>
    where
        P: DeserializeOwned,
        T: DeserializeOwned,
    {
        Ok(LoadContext {
            resource_id: self.resource_id,
            params: serde_json::from_value(self.params)?,
            cache_key: self.cache_key,
            existing_data: self
                .existing_data
                .map(serde_json::from_value)
                .transpose()?,
            trigger: self.trigger,
            mode: self.mode,
        })
    }
}
