//! # Loader Errors
//!
//! This module defines the error types used throughout the resource loader.
//!
//! - [`LoaderError`]: returned from client, handle and registry calls. Configuration
//!   mistakes (unknown or duplicate resource types) surface here at the call site.
//! - [`LoadError`]: the normalized failure of a fetch function. It never escapes to the
//!   caller; it is stored in [`LastAction`](crate::state::LastAction) and reported through
//!   the `load-error` event.
//! - [`SinkError`]: what an [`EventSink`](crate::events::EventSink) may return. The loader
//!   logs it and carries on.

use crate::resource::Operation;
use crate::state::ResourceKey;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Boxed error returned by fetch functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur within the loader itself.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Loader closed")]
    ActorClosed,
    #[error("Loader dropped response channel")]
    ActorDropped,
    #[error("No loader registered for resource type '{0}'")]
    UnknownResource(String),
    #[error("Resource type '{0}' is already registered")]
    DuplicateResource(String),
    #[error("Resource type '{resource_type}' does not support {operation}")]
    Unsupported {
        resource_type: String,
        operation: Operation,
    },
    #[error("Invalid resource params: {0}")]
    Params(#[source] serde_json::Error),
    #[error("Failed to decode resource data: {0}")]
    Decode(#[source] serde_json::Error),
}

/// What produced a [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadErrorKind {
    /// The fetch function returned an error.
    #[default]
    Error,
    /// The fetch function panicked.
    Panic,
    /// Params or results could not be converted to or from JSON.
    Decode,
}

/// Identifies the resource instance a [`LoadError`] belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataLoadContext {
    pub resource_type: String,
    pub resource_id: String,
}

/// A fetch failure, normalized into plain data so it survives hydration.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct LoadError {
    pub message: String,
    #[serde(default)]
    pub kind: LoadErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_load_context: Option<DataLoadContext>,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: LoadErrorKind::Error,
            data_load_context: None,
        }
    }

    /// Normalizes an error returned by a fetch function.
    ///
    /// JSON conversion failures are classified as [`LoadErrorKind::Decode`].
    pub fn from_boxed(error: BoxError) -> Self {
        let kind = if error.downcast_ref::<serde_json::Error>().is_some() {
            LoadErrorKind::Decode
        } else {
            LoadErrorKind::Error
        };
        Self {
            message: error.to_string(),
            kind,
            data_load_context: None,
        }
    }

    /// Normalizes a panic payload caught while running a fetch function.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "fetch panicked with a non-string payload".to_string()
        };
        Self {
            message,
            kind: LoadErrorKind::Panic,
            data_load_context: None,
        }
    }

    /// Stamps the owning resource instance onto the error.
    pub fn with_context(mut self, key: &ResourceKey) -> Self {
        self.data_load_context = Some(DataLoadContext {
            resource_type: key.resource_type.clone(),
            resource_id: key.resource_id.clone(),
        });
        self
    }
}

/// Error an event sink can report back to the loader.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl From<&str> for SinkError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for SinkError {
    fn from(message: String) -> Self {
        Self(message)
    }
}
