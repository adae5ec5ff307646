//! # Event Channel
//!
//! The loader's single side channel. Every lifecycle event goes through one
//! [`EventSink`], synchronously and in order.
//!
//! | event | when |
//! |---|---|
//! | `state-changed` | after every reducer dispatch, including `Init` |
//! | `begin-loading-event` | right before an async fetch is awaited |
//! | `end-loading-event` | right after an async fetch settles, even if its result is discarded |
//! | `data-load-completed` | when the in-flight counter returns to zero |
//! | `load-error` | on any fetch failure, before the matching `LoadDataFailed` dispatch |
//!
//! ## Sink contract
//!
//! A sink may return an error or even panic. The loader catches both, logs a warning
//! and carries on with the state transition that produced the event.

use crate::error::{LoadError, SinkError};
use crate::state::{AggregateState, ResourceKey};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{trace, warn};

/// Payload of the loading-progress events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingProgress {
    pub resource_type: String,
    pub resource_id: String,
    /// Async fetches the loader is awaiting.
    pub number_loading: usize,
}

impl LoadingProgress {
    pub fn new(key: &ResourceKey, number_loading: usize) -> Self {
        Self {
            resource_type: key.resource_type.clone(),
            resource_id: key.resource_id.clone(),
            number_loading,
        }
    }
}

/// Payload of the `load-error` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadErrorEvent {
    pub error: LoadError,
    pub error_message: String,
    pub resource_type: String,
    pub resource_id: String,
}

/// Lifecycle events, tagged with their wire name.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LoaderEvent {
    #[serde(rename = "state-changed")]
    StateChanged { state: Arc<AggregateState> },
    #[serde(rename = "begin-loading-event")]
    BeginLoading(LoadingProgress),
    #[serde(rename = "end-loading-event")]
    EndLoading(LoadingProgress),
    #[serde(rename = "data-load-completed")]
    DataLoadCompleted(LoadingProgress),
    #[serde(rename = "load-error")]
    LoadError(LoadErrorEvent),
}

impl LoaderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LoaderEvent::StateChanged { .. } => "state-changed",
            LoaderEvent::BeginLoading(_) => "begin-loading-event",
            LoaderEvent::EndLoading(_) => "end-loading-event",
            LoaderEvent::DataLoadCompleted(_) => "data-load-completed",
            LoaderEvent::LoadError(_) => "load-error",
        }
    }
}

/// Receives loader events.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &LoaderEvent) -> Result<(), SinkError>;
}

impl<F> EventSink for F
where
    F: Fn(&LoaderEvent) -> Result<(), SinkError> + Send + Sync,
{
    fn on_event(&self, event: &LoaderEvent) -> Result<(), SinkError> {
        self(event)
    }
}

/// Delivers events to an optional sink, shielding the loader from sink failures.
#[derive(Clone, Default)]
pub struct EventChannel {
    sink: Option<Arc<dyn EventSink>>,
}

impl EventChannel {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: LoaderEvent) {
        trace!(event = event.name(), "Emit");
        let Some(sink) = &self.sink else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(|| sink.on_event(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(event = event.name(), error = %e, "Event sink failed"),
            Err(_) => warn!(event = event.name(), "Event sink panicked"),
        }
    }
}
