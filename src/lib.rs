//! # Hydrate Recipe
//!
//! A sample application for the [`resource_loader`] crate: a page with a user profile,
//! a paged feed and site settings, rendered on the server and hydrated on the client.
//!
//! ## Module Tour
//!
//! - **[`model`]**: Plain data returned by the backend ([`Profile`](model::Profile),
//!   [`FeedPage`](model::FeedPage), [`Settings`](model::Settings)).
//! - **[`backend`]**: The [`ContentBackend`](backend::ContentBackend) trait and an
//!   in-memory implementation with simulated latency.
//! - **[`resources`]**: The [`Resource`](resource_loader::Resource) implementations that
//!   tell the loader how to fetch each kind.
//! - **[`views`]**: View bindings that mount, render and unmount against the loader.
//! - **[`lifecycle`]**: Starts and stops loaders, and runs the server render.
//!
//! ## Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=debug cargo run   # every loader event
//! ```
//!
//! ## Testing
//!
//! See [`resource_loader::mock`] for a scripted loader client that tests views without
//! spawning an actor.

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod resources;
pub mod views;
