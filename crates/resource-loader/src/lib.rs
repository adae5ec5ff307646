//! # Resource Loader
//!
//! This crate manages asynchronously loaded resources for applications that render a
//! view on a server and then resume it on a client (hydration).
//!
//! A *resource* is a named kind of loadable data with a fetch function. A *resource
//! instance* is one `(resource type, resource id)` pair with its own load state. The
//! loader decides when to fetch, makes sure at most one fetch is in flight per
//! instance, reference-counts the consumers of each instance and reports the whole
//! lifecycle through one event sink.
//!
//! ## Architecture Overview
//!
//! 1. **State** ([`state`], [`reducer`]): the serializable [`AggregateState`] and the pure
//!    [`reduce`](reducer::reduce) function that moves it forward one [`Action`] at a time.
//! 2. **Runtime** ([`LoaderActor`]): owns the state, the [`SubscriptionRegistry`] and the
//!    fetches in flight, and handles requests one at a time.
//! 3. **Interface** ([`LoaderClient`], [`ResourceHandle`]): the explicit handle the binding
//!    layer passes around. There is no ambient global loader.
//!
//! ## Per-instance state machine
//!
//! ```text
//!          LoadData / Refresh / NextPage
//!   Idle ─────────────────────────────────▶ Fetching | Refreshing | Paging
//!    ▲                                                 │
//!    └──────────── LoadDataCompleted / LoadDataFailed ─┘
//! ```
//!
//! `UnloadData` removes an instance entirely once its last consumer detaches.
//!
//! ## Quick Start
//!
//! ```rust
//! use resource_loader::{Fetch, LoadContext, LoaderActor, LoaderConfig, Resource, ResourceHandle, ResourceRegistry, Subscriber};
//!
//! struct Greeting;
//!
//! impl Resource for Greeting {
//!     const NAME: &'static str = "greeting";
//!     type Params = String;
//!     type Output = String;
//!
//!     fn load(&self, ctx: LoadContext<String, String>) -> Fetch<String> {
//!         Fetch::pending(async move { Ok(format!("Hello, {}!", ctx.params)) })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let resources = ResourceRegistry::new().with(Greeting).unwrap();
//!     let (actor, client) = LoaderActor::new(LoaderConfig::client(), resources);
//!     tokio::spawn(actor.run());
//!
//!     let greetings = ResourceHandle::<Greeting>::new(client.clone());
//!     let consumer = Subscriber::noop();
//!     greetings.load_if_needed("home", &"Ada".to_string(), &consumer).await.unwrap();
//!     client.wait_until_settled().await.unwrap();
//!
//!     assert_eq!(greetings.data("home").await.unwrap().as_deref(), Some("Hello, Ada!"));
//! }
//! ```
//!
//! ## Hydration
//!
//! A server-mode loader stamps completed data as server-rendered. Serialize its state
//! with [`AggregateState::to_json`], then start the client loader with
//! [`LoaderActor::with_initial_state`]. Instances whose data is present are not fetched
//! again unless their resource asks for it through
//! [`Resource::refetch_after_hydration`].
//!
//! ## Testing
//!
//! See [`mock`] for an event recorder, a hand-settled resource and a mock client.

pub mod action;
pub mod actor;
pub mod cache_key;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod handle;
pub mod message;
pub mod mock;
pub mod reducer;
pub mod resource;
pub mod state;
pub mod subscription;
pub mod tracing;

// Re-export core types for convenience
pub use action::Action;
pub use actor::LoaderActor;
pub use cache_key::derive_key;
pub use client::LoaderClient;
pub use config::{LoaderConfig, RenderMode};
pub use error::{BoxError, LoadError, LoadErrorKind, LoaderError, SinkError};
pub use events::{EventSink, LoaderEvent, LoadingProgress};
pub use fetch::{Fetch, FetchResult, LoadContext};
pub use handle::ResourceHandle;
pub use message::{LoadOutcome, LoaderRequest, Response};
pub use resource::{Capabilities, Operation, Resource, ResourceRegistry};
pub use state::{
    AggregateState, Data, LastAction, LastActionKind, LoadKind, LoaderState, LoaderStatus,
    ResourceKey,
};
pub use subscription::{ListenerId, StateListenerFn, Subscriber, SubscriptionRegistry};
