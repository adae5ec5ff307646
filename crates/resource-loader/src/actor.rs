//! # Loader Actor
//!
//! This module defines the [`LoaderActor`], the stateful coordinator of the resource
//! loader. It owns the [`AggregateState`], the [`SubscriptionRegistry`], the
//! [`EventChannel`] and every fetch currently in flight, and processes
//! [`LoaderRequest`]s sequentially.
//!
//! # Concurrency Model
//! The actor runs one loop that waits on two things at once: the next request from a
//! [`LoaderClient`], and the next in-flight fetch to settle. Whichever is ready is
//! handled to completion before the loop waits again, so reducer dispatches, registry
//! changes and event emission never interleave. The only suspension points are the
//! awaited fetches themselves.
//!
//! # Fetch Settlement
//! 1. The resource's fetch function is invoked (panics are caught).
//! 2. **Fast path**: a ready result on an initial load or update is dispatched right away.
//!    The instance never enters a loading state and no loading events are emitted.
//! 3. **Async path**: the triggering action is dispatched, the local counter is bumped
//!    and `begin-loading-event` is emitted. The future joins the in-flight set.
//! 4. On settlement the result is dispatched only if a consumer is still attached.
//!    `end-loading-event` is always emitted, and `data-load-completed` follows when
//!    nothing else is in flight.

use crate::action::Action;
use crate::client::LoaderClient;
use crate::config::{LoaderConfig, RenderMode};
use crate::error::{LoadError, LoaderError};
use crate::events::{EventChannel, EventSink, LoadErrorEvent, LoaderEvent, LoadingProgress};
use crate::fetch::{Fetch, LoadContext};
use crate::message::{LoadOutcome, LoaderRequest};
use crate::reducer::reduce;
use crate::resource::{Operation, RegisteredResource, ResourceRegistry};
use crate::state::{AggregateState, LoadKind, ResourceKey};
use crate::subscription::{Subscriber, SubscriptionRegistry};
use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

/// A fetch that has settled, on its way back into the actor loop.
struct Settled {
    key: ResourceKey,
    kind: LoadKind,
    result: Result<Value, LoadError>,
}

/// The loader's server half.
///
/// # Usage Pattern
/// 1. **Create**: `LoaderActor::new(config, resources)` returns the actor and a client.
/// 2. **Configure**: optionally attach an event sink or a hydrated starting state.
/// 3. **Run**: spawn `actor.run()`; it exits once every client is dropped.
///
/// ```rust
/// use resource_loader::{Fetch, LoadContext, LoaderActor, LoaderConfig, Resource, ResourceRegistry, Subscriber};
///
/// struct Answer;
///
/// impl Resource for Answer {
///     const NAME: &'static str = "answer";
///     type Params = ();
///     type Output = u32;
///
///     fn load(&self, _ctx: LoadContext<(), u32>) -> Fetch<u32> {
///         Fetch::ready(42)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let resources = ResourceRegistry::new().with(Answer).unwrap();
///     let (actor, client) = LoaderActor::new(LoaderConfig::client(), resources);
///     tokio::spawn(actor.run());
///
///     let key = resource_loader::ResourceKey::new("answer", "1");
///     client
///         .load_if_needed(key.clone(), serde_json::Value::Null, Subscriber::noop())
///         .await
///         .unwrap();
///     let loader = client.loader_state(key).await.unwrap();
///     assert_eq!(loader.data.result(), Some(&serde_json::json!(42)));
/// }
/// ```
pub struct LoaderActor {
    receiver: mpsc::Receiver<LoaderRequest>,
    config: LoaderConfig,
    resources: ResourceRegistry,
    state: Arc<AggregateState>,
    subscriptions: SubscriptionRegistry,
    events: EventChannel,
    in_flight: FuturesUnordered<BoxFuture<'static, Settled>>,
    /// Async fetches being awaited, including ones whose result will be discarded.
    number_loading: usize,
    loading_tx: watch::Sender<usize>,
    initial: Option<AggregateState>,
}

impl LoaderActor {
    /// Creates a new `LoaderActor` and its associated [`LoaderClient`].
    pub fn new(config: LoaderConfig, resources: ResourceRegistry) -> (Self, LoaderClient) {
        let (sender, receiver) = mpsc::channel(config.buffer_size.max(1));
        let (loading_tx, loading_rx) = watch::channel(0);
        let actor = Self {
            receiver,
            config,
            resources,
            state: Arc::new(AggregateState::new()),
            subscriptions: SubscriptionRegistry::new(),
            events: EventChannel::disconnected(),
            in_flight: FuturesUnordered::new(),
            number_loading: 0,
            loading_tx,
            initial: None,
        };
        (actor, LoaderClient::new(sender, loading_rx))
    }

    /// Routes lifecycle events to `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = EventChannel::new(sink);
        self
    }

    /// Starts from a state produced elsewhere, typically a server render.
    pub fn with_initial_state(mut self, state: AggregateState) -> Self {
        self.initial = Some(state);
        self
    }

    /// Runs the actor's event loop until every client is dropped.
    pub async fn run(mut self) {
        info!(
            mode = ?self.config.mode,
            resources = self.resources.len(),
            "Loader started"
        );

        match self.initial.take() {
            Some(state) => self.dispatch(Action::Hydrate(state)),
            None => self.dispatch(Action::Init),
        }

        loop {
            tokio::select! {
                request = self.receiver.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
                Some(settled) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.settle(settled);
                }
            }
        }

        info!(
            in_flight = self.in_flight.len(),
            instances = self.state.instance_count(),
            "Shutdown"
        );
    }

    fn handle(&mut self, request: LoaderRequest) {
        match request {
            LoaderRequest::LoadIfNeeded {
                key,
                params,
                subscriber,
                respond_to,
            } => {
                let _ = respond_to.send(self.load_if_needed(key, params, subscriber));
            }
            LoaderRequest::Refresh {
                key,
                params,
                respond_to,
            } => {
                let _ = respond_to.send(self.trigger(Operation::Refresh, key, params));
            }
            LoaderRequest::NextPage {
                key,
                params,
                respond_to,
            } => {
                let _ = respond_to.send(self.trigger(Operation::NextPage, key, params));
            }
            LoaderRequest::Update {
                key,
                params,
                respond_to,
            } => {
                let _ = respond_to.send(self.trigger(Operation::Update, key, params));
            }
            LoaderRequest::Unload {
                key,
                params,
                subscriber,
                respond_to,
            } => {
                let _ = respond_to.send(self.unload(key, params, subscriber));
            }
            LoaderRequest::GetState { respond_to } => {
                let _ = respond_to.send(Ok(self.state.clone()));
            }
            LoaderRequest::AddListener {
                listener,
                respond_to,
            } => {
                let id = self.subscriptions.add_listener(listener);
                debug!(?id, "Listener added");
                let _ = respond_to.send(Ok(id));
            }
            LoaderRequest::RemoveListener { id, respond_to } => {
                let removed = self.subscriptions.remove_listener(id);
                debug!(?id, removed, "Listener removed");
                let _ = respond_to.send(Ok(removed));
            }
        }
    }

    /// Registers `subscriber`; true when it is the first consumer of `key`.
    fn attach(&mut self, key: &ResourceKey, subscriber: Subscriber) -> bool {
        self.subscriptions.register(key, subscriber) == 1
    }

    /// Unregisters `subscriber`; true when it was the last consumer of `key`.
    fn detach(&mut self, key: &ResourceKey, subscriber: &Subscriber) -> bool {
        matches!(self.subscriptions.unregister(key, subscriber), Some(0))
    }

    fn load_if_needed(
        &mut self,
        key: ResourceKey,
        params: Value,
        subscriber: Subscriber,
    ) -> Result<LoadOutcome, LoaderError> {
        let resource = Arc::clone(self.resources.get(&key.resource_type)?);
        let cache_key = resource.derive_key(&params);
        debug!(
            resource_type = %key.resource_type,
            resource_id = %key.resource_id,
            cache_key = %cache_key,
            "LoadIfNeeded"
        );

        let first = self.attach(&key, subscriber.clone());
        let loader = self.state.loader_state(&key);
        let should_load = first
            && match self.config.mode {
                RenderMode::Server => {
                    !loader.data.has_data() && !loader.last_action.is_failure()
                }
                RenderMode::Client => {
                    loader.status.is_idle()
                        && (!loader.data.has_data()
                            || (loader.data.from_server_render()
                                && resource.refetch_after_hydration()))
                }
            };

        if !should_load {
            debug!(resource_id = %key.resource_id, first, "Delivering existing state");
            subscriber.deliver(&loader, &self.state);
            return Ok(LoadOutcome::Delivered);
        }

        Ok(self.perform_and_dispatch(&resource, key, params, cache_key, LoadKind::InitialFetch))
    }

    /// Starts a follow-up load. Ignored when nobody is attached or a fetch is in flight.
    fn trigger(
        &mut self,
        operation: Operation,
        key: ResourceKey,
        params: Value,
    ) -> Result<bool, LoaderError> {
        let resource = Arc::clone(self.resources.get(&key.resource_type)?);
        if !resource.capabilities().supports(operation) {
            return Err(LoaderError::Unsupported {
                resource_type: key.resource_type,
                operation,
            });
        }
        let cache_key = resource.derive_key(&params);
        debug!(
            %operation,
            resource_type = %key.resource_type,
            resource_id = %key.resource_id,
            cache_key = %cache_key,
            "Trigger"
        );

        if !self.subscriptions.has_any(&key) {
            debug!(%operation, resource_id = %key.resource_id, "Ignored: no consumer attached");
            return Ok(false);
        }
        if self.state.loader_state(&key).is_busy() {
            debug!(%operation, resource_id = %key.resource_id, "Ignored: load in flight");
            return Ok(false);
        }

        let kind = match operation {
            Operation::Refresh => LoadKind::Refresh,
            Operation::NextPage => LoadKind::Page,
            Operation::Update => LoadKind::InitialFetch,
        };
        self.perform_and_dispatch(&resource, key, params, cache_key, kind);
        Ok(true)
    }

    fn unload(
        &mut self,
        key: ResourceKey,
        params: Value,
        subscriber: Subscriber,
    ) -> Result<bool, LoaderError> {
        let cache_key = self.resources.derive_key(&key.resource_type, &params)?;
        let last = self.detach(&key, &subscriber);
        debug!(
            resource_type = %key.resource_type,
            resource_id = %key.resource_id,
            cache_key = %cache_key,
            last,
            "Unload"
        );
        if last {
            self.dispatch(Action::UnloadData { key });
        }
        Ok(last)
    }

    /// Invokes the fetch function and routes its result. Never fails: every error ends
    /// up as a `load-error` event and, if anyone is still attached, a failed load.
    fn perform_and_dispatch(
        &mut self,
        resource: &RegisteredResource,
        key: ResourceKey,
        params: Value,
        cache_key: String,
        kind: LoadKind,
    ) -> LoadOutcome {
        let existing_data = match kind {
            LoadKind::Page => self.state.get(&key).and_then(|l| l.data.result().cloned()),
            LoadKind::InitialFetch | LoadKind::Refresh => None,
        };
        let ctx = LoadContext {
            resource_id: key.resource_id.clone(),
            params,
            cache_key,
            existing_data,
            trigger: kind,
            mode: self.config.mode,
        };

        let attempt = catch_unwind(AssertUnwindSafe(|| resource.fetch(ctx)))
            .map_err(LoadError::from_panic);
        // Refresh and paging always go through the async path.
        let fast_path = kind == LoadKind::InitialFetch;

        let future: BoxFuture<'static, Result<Value, LoadError>> = match attempt {
            Ok(Fetch::Ready(Ok(result))) if fast_path => {
                trace!(resource_id = %key.resource_id, "Synchronous result");
                self.dispatch(Action::LoadDataCompleted {
                    key,
                    result,
                    from_server_render: self.config.mode.is_server(),
                    trigger: kind,
                });
                return LoadOutcome::Completed;
            }
            Ok(Fetch::Ready(Err(error))) if fast_path => {
                self.report_failure(&key, kind, LoadError::from_boxed(error));
                return LoadOutcome::Failed;
            }
            Err(error) if fast_path => {
                self.report_failure(&key, kind, error);
                return LoadOutcome::Failed;
            }
            Ok(fetch) => AssertUnwindSafe(fetch.into_future())
                .catch_unwind()
                .map(|outcome| match outcome {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(error)) => Err(LoadError::from_boxed(error)),
                    Err(payload) => Err(LoadError::from_panic(payload)),
                })
                .boxed(),
            Err(error) => future::ready(Err(error)).boxed(),
        };

        self.dispatch(Action::begin(kind, key.clone()));
        self.number_loading += 1;
        self.events.emit(LoaderEvent::BeginLoading(LoadingProgress::new(
            &key,
            self.number_loading,
        )));
        self.publish_loading();

        self.in_flight.push(
            async move {
                Settled {
                    key,
                    kind,
                    result: future.await,
                }
            }
            .boxed(),
        );
        LoadOutcome::Started
    }

    fn settle(&mut self, settled: Settled) {
        let Settled { key, kind, result } = settled;
        match result {
            Ok(result) if self.subscriptions.has_any(&key) => {
                debug!(resource_id = %key.resource_id, ?kind, "Load completed");
                self.dispatch(Action::LoadDataCompleted {
                    key: key.clone(),
                    result,
                    from_server_render: self.config.mode.is_server(),
                    trigger: kind,
                });
            }
            Ok(_) => {
                debug!(
                    resource_type = %key.resource_type,
                    resource_id = %key.resource_id,
                    "Discarding result: no consumer attached"
                );
            }
            Err(error) => self.report_failure(&key, kind, error),
        }

        self.events.emit(LoaderEvent::EndLoading(LoadingProgress::new(
            &key,
            self.number_loading,
        )));
        self.number_loading = self.number_loading.saturating_sub(1);
        if self.number_loading == 0 {
            self.events
                .emit(LoaderEvent::DataLoadCompleted(LoadingProgress::new(&key, 0)));
        }
        self.publish_loading();
    }

    fn report_failure(&mut self, key: &ResourceKey, kind: LoadKind, error: LoadError) {
        let error = error.with_context(key);
        warn!(
            resource_type = %key.resource_type,
            resource_id = %key.resource_id,
            error = %error,
            "Load failed"
        );
        self.events.emit(LoaderEvent::LoadError(LoadErrorEvent {
            error_message: error.message.clone(),
            error: error.clone(),
            resource_type: key.resource_type.clone(),
            resource_id: key.resource_id.clone(),
        }));
        if self.subscriptions.has_any(key) {
            self.dispatch(Action::LoadDataFailed {
                key: key.clone(),
                error,
                trigger: kind,
            });
        }
    }

    fn publish_loading(&self) {
        self.loading_tx.send_replace(self.number_loading);
    }

    /// Runs `action` through the reducer, then notifies consumers and the event sink.
    fn dispatch(&mut self, action: Action) {
        trace!(action = action.name(), "Dispatch");
        self.state = Arc::new(reduce(&self.state, &action));
        match action.key() {
            Some(key) => self.subscriptions.notify(&self.state, key),
            None => self.subscriptions.notify_listeners(&self.state),
        }
        self.events.emit(LoaderEvent::StateChanged {
            state: self.state.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{EventRecorder, ManualResource};
    use crate::state::LoaderStatus;
    use serde_json::json;
    use std::sync::Mutex;

    fn spawn(
        config: LoaderConfig,
        resource: ManualResource,
        initial: Option<AggregateState>,
    ) -> (LoaderClient, EventRecorder) {
        let recorder = EventRecorder::new();
        let resources = ResourceRegistry::new().with(resource).unwrap();
        let (mut actor, client) = LoaderActor::new(config, resources);
        actor = actor.with_event_sink(Arc::new(recorder.clone()));
        if let Some(state) = initial {
            actor = actor.with_initial_state(state);
        }
        tokio::spawn(actor.run());
        (client, recorder)
    }

    fn key() -> ResourceKey {
        ResourceKey::new("data", "1")
    }

    #[tokio::test]
    async fn test_second_consumer_does_not_refetch() {
        let (resource, control) = ManualResource::new();
        let (client, _) = spawn(LoaderConfig::client(), resource, None);

        let outcome = client
            .load_if_needed(key(), json!({}), Subscriber::noop())
            .await
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Started);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let second = Subscriber::new(move |loader, _| record.lock().unwrap().push(loader.status));
        let outcome = client
            .load_if_needed(key(), json!({}), second)
            .await
            .unwrap();

        assert_eq!(outcome, LoadOutcome::Delivered);
        assert_eq!(control.call_count(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![LoaderStatus::Fetching]);
    }

    #[tokio::test]
    async fn test_unknown_resource_is_rejected() {
        let (resource, _control) = ManualResource::new();
        let (client, _) = spawn(LoaderConfig::client(), resource, None);
        let err = client
            .load_if_needed(ResourceKey::new("nope", "1"), json!({}), Subscriber::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::UnknownResource(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_sync_panic_becomes_failed_load() {
        let (resource, control) = ManualResource::new();
        control.panic_on_load("kaboom");
        let (client, recorder) = spawn(LoaderConfig::client(), resource, None);

        let outcome = client
            .load_if_needed(key(), json!({}), Subscriber::noop())
            .await
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Failed);

        let loader = client.loader_state(key()).await.unwrap();
        let error = loader.last_action.error.unwrap();
        assert_eq!(error.message, "kaboom");
        assert_eq!(error.kind, crate::error::LoadErrorKind::Panic);
        assert_eq!(
            recorder.names(),
            vec!["state-changed", "load-error", "state-changed"]
        );
    }

    #[tokio::test]
    async fn test_refresh_of_sync_resource_takes_async_path() {
        let (resource, control) = ManualResource::new();
        control.answer_immediately(json!(1));
        let (client, recorder) = spawn(LoaderConfig::client(), resource, None);

        client
            .load_if_needed(key(), json!({}), Subscriber::noop())
            .await
            .unwrap();
        recorder.clear();

        control.answer_immediately(json!(2));
        assert!(client.refresh(key(), json!({})).await.unwrap());
        client.wait_until_settled().await.unwrap();

        assert_eq!(
            recorder.names(),
            vec![
                "state-changed",
                "begin-loading-event",
                "state-changed",
                "end-loading-event",
                "data-load-completed"
            ]
        );
        let loader = client.loader_state(key()).await.unwrap();
        assert_eq!(loader.data.result(), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_trigger_without_consumer_is_ignored() {
        let (resource, control) = ManualResource::new();
        let (client, _) = spawn(LoaderConfig::client(), resource, None);
        assert!(!client.refresh(key(), json!({})).await.unwrap());
        assert_eq!(control.call_count(), 0);
    }

    #[tokio::test]
    async fn test_hydrated_state_emits_state_changed_for_hydrate() {
        let mut state = AggregateState::new();
        state.loading_count = 3;
        let (resource, _control) = ManualResource::new();
        let (client, recorder) = spawn(LoaderConfig::client(), resource, Some(state));

        let current = client.state().await.unwrap();
        assert_eq!(current.loading_count, 0);
        assert_eq!(recorder.names(), vec!["state-changed"]);
    }
}
