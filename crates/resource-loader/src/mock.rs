//! # Test Utilities
//!
//! Helpers for testing code built on the loader.
//!
//! | Tool | Use |
//! |------|-----|
//! | [`EventRecorder`] | An [`EventSink`] that keeps every event for later assertions |
//! | [`ManualResource`] | A resource whose fetches the test settles by hand |
//! | [`create_mock_client`] | A [`LoaderClient`] wired to a receiver the test drives |
//!
//! ## Driving a fetch by hand
//!
//! ```rust
//! use resource_loader::mock::{EventRecorder, ManualResource};
//! use resource_loader::{LoaderActor, LoaderConfig, ResourceKey, ResourceRegistry, Subscriber};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (resource, control) = ManualResource::new();
//!     let recorder = EventRecorder::new();
//!     let resources = ResourceRegistry::new().with(resource).unwrap();
//!     let (actor, client) = LoaderActor::new(LoaderConfig::client(), resources);
//!     tokio::spawn(actor.with_event_sink(Arc::new(recorder.clone())).run());
//!
//!     let key = ResourceKey::new("data", "1");
//!     client.load_if_needed(key.clone(), json!({}), Subscriber::noop()).await.unwrap();
//!     assert!(control.resolve_next(json!(42)));
//!     client.wait_until_settled().await.unwrap();
//!
//!     assert_eq!(recorder.names().last(), Some(&"data-load-completed"));
//! }
//! ```
//!
//! ## Testing binding code without an actor
//!
//! [`create_mock_client`] returns a client and the receiving end of its channel. The
//! `expect_*` helpers pull the next request and hand back its responder, so the test
//! decides what the "loader" answers.

use crate::client::LoaderClient;
use crate::error::{LoaderError, SinkError};
use crate::events::{EventSink, LoaderEvent};
use crate::fetch::{Fetch, FetchResult, LoadContext};
use crate::message::{LoadOutcome, LoaderRequest, Response};
use crate::resource::{Capabilities, Resource};
use crate::state::ResourceKey;
use crate::subscription::Subscriber;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// EVENTS
// =============================================================================

/// Records every event it receives.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<LoaderEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LoaderEvent> {
        lock(&self.events).clone()
    }

    /// The wire names of the recorded events, in order.
    pub fn names(&self) -> Vec<&'static str> {
        lock(&self.events).iter().map(LoaderEvent::name).collect()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl EventSink for EventRecorder {
    fn on_event(&self, event: &LoaderEvent) -> Result<(), SinkError> {
        lock(&self.events).push(event.clone());
        Ok(())
    }
}

// =============================================================================
// MANUAL RESOURCE
// =============================================================================

#[derive(Debug, Clone)]
enum Mode {
    Deferred,
    Immediate(Value),
    ImmediateError(String),
    Panic(String),
}

struct Inner {
    mode: Mode,
    calls: Vec<LoadContext<Value, Value>>,
    pending: VecDeque<oneshot::Sender<FetchResult<Value>>>,
}

/// A resource named `data` that supports every operation and answers however the
/// test tells it to. By default each fetch is deferred until the test settles it
/// through the [`ManualController`].
pub struct ManualResource {
    inner: Arc<Mutex<Inner>>,
}

/// Settles and inspects the fetches of a [`ManualResource`].
#[derive(Clone)]
pub struct ManualController {
    inner: Arc<Mutex<Inner>>,
}

impl ManualResource {
    pub fn new() -> (Self, ManualController) {
        let inner = Arc::new(Mutex::new(Inner {
            mode: Mode::Deferred,
            calls: Vec::new(),
            pending: VecDeque::new(),
        }));
        (
            Self {
                inner: inner.clone(),
            },
            ManualController { inner },
        )
    }
}

impl Resource for ManualResource {
    const NAME: &'static str = "data";
    type Params = Value;
    type Output = Value;

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn load(&self, ctx: LoadContext<Value, Value>) -> Fetch<Value> {
        let mode = {
            let mut inner = lock(&self.inner);
            inner.calls.push(ctx);
            inner.mode.clone()
        };
        match mode {
            Mode::Deferred => {
                let (tx, rx) = oneshot::channel();
                lock(&self.inner).pending.push_back(tx);
                Fetch::pending(async move {
                    rx.await
                        .unwrap_or_else(|_| Err("manual fetch was dropped".into()))
                })
            }
            Mode::Immediate(value) => Fetch::ready(value),
            Mode::ImmediateError(message) => Fetch::failed(message),
            Mode::Panic(message) => panic!("{message}"),
        }
    }
}

impl ManualController {
    /// Future fetches stay pending until settled by hand.
    pub fn defer(&self) {
        lock(&self.inner).mode = Mode::Deferred;
    }

    /// Future fetches return `value` synchronously.
    pub fn answer_immediately(&self, value: Value) {
        lock(&self.inner).mode = Mode::Immediate(value);
    }

    /// Future fetches fail synchronously with `message`.
    pub fn fail_immediately(&self, message: impl Into<String>) {
        lock(&self.inner).mode = Mode::ImmediateError(message.into());
    }

    /// Future fetches panic with `message`.
    pub fn panic_on_load(&self, message: impl Into<String>) {
        lock(&self.inner).mode = Mode::Panic(message.into());
    }

    /// Contexts of every fetch so far, oldest first.
    pub fn calls(&self) -> Vec<LoadContext<Value, Value>> {
        lock(&self.inner).calls.clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.inner).calls.len()
    }

    /// Deferred fetches not yet settled.
    pub fn pending(&self) -> usize {
        lock(&self.inner).pending.len()
    }

    /// Resolves the oldest pending fetch. False when nothing was pending.
    pub fn resolve_next(&self, value: Value) -> bool {
        let next = lock(&self.inner).pending.pop_front();
        next.is_some_and(|tx| tx.send(Ok(value)).is_ok())
    }

    /// Resolves the newest pending fetch.
    pub fn resolve_last(&self, value: Value) -> bool {
        let last = lock(&self.inner).pending.pop_back();
        last.is_some_and(|tx| tx.send(Ok(value)).is_ok())
    }

    /// Rejects the oldest pending fetch with `message`.
    pub fn reject_next(&self, message: impl Into<String>) -> bool {
        let next = lock(&self.inner).pending.pop_front();
        let message = message.into();
        next.is_some_and(|tx| tx.send(Err(message.into())).is_ok())
    }
}

// =============================================================================
// MOCK CLIENT
// =============================================================================

/// Creates a client and the receiver its requests arrive on.
///
/// No actor runs behind the client: the test reads requests off the receiver (the
/// `expect_*` helpers) and answers them itself. `wait_until_settled` resolves at once.
pub fn create_mock_client(buffer_size: usize) -> (LoaderClient, mpsc::Receiver<LoaderRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size.max(1));
    let (_, loading) = watch::channel(0);
    (LoaderClient::new(sender, loading), receiver)
}

/// Helper to verify that the next message is a LoadIfNeeded request.
pub async fn expect_load_if_needed(
    receiver: &mut mpsc::Receiver<LoaderRequest>,
) -> Option<(ResourceKey, Value, Subscriber, Response<LoadOutcome>)> {
    match receiver.recv().await {
        Some(LoaderRequest::LoadIfNeeded {
            key,
            params,
            subscriber,
            respond_to,
        }) => Some((key, params, subscriber, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Refresh request.
pub async fn expect_refresh(
    receiver: &mut mpsc::Receiver<LoaderRequest>,
) -> Option<(ResourceKey, Value, Response<bool>)> {
    match receiver.recv().await {
        Some(LoaderRequest::Refresh {
            key,
            params,
            respond_to,
        }) => Some((key, params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a NextPage request.
pub async fn expect_next_page(
    receiver: &mut mpsc::Receiver<LoaderRequest>,
) -> Option<(ResourceKey, Value, Response<bool>)> {
    match receiver.recv().await {
        Some(LoaderRequest::NextPage {
            key,
            params,
            respond_to,
        }) => Some((key, params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Unload request.
pub async fn expect_unload(
    receiver: &mut mpsc::Receiver<LoaderRequest>,
) -> Option<(ResourceKey, Value, Subscriber, Response<bool>)> {
    match receiver.recv().await {
        Some(LoaderRequest::Unload {
            key,
            params,
            subscriber,
            respond_to,
        }) => Some((key, params, subscriber, respond_to)),
        _ => None,
    }
}

/// Answers a request's responder with an error, as a closed loader would.
pub fn respond_closed<T>(respond_to: Response<T>) {
    let _ = respond_to.send(Err(LoaderError::ActorClosed));
}
