//! # Render Lifecycle
//!
//! Starting, wiring and stopping the loader for one render pass.
//!
//! A page is rendered twice. On the server, [`RenderSystem::server_render`] runs a loader in
//! [`RenderMode::Server`](resource_loader::RenderMode::Server), mounts the page's views,
//! waits for every fetch to settle and serializes the aggregate state next to the HTML.
//! In the browser, [`RenderSystem::hydrate`] starts a client-mode loader from that
//! snapshot, so views mounted afterwards see the server's data without fetching again.
//!
//! ```rust,ignore
//! let page = RenderSystem::server_render(backend.clone(), &PageRequest::new("ada", "rust", 3)).await?;
//! let system = RenderSystem::hydrate(backend, &page.state)?;
//! let feed = FeedView::mount(&system.client, "rust", 3).await?; // no refetch
//! ```
//!
//! Shutdown follows the usual actor pattern: drop every client, then await the task.

pub mod render_system;

pub use render_system::*;
pub use resource_loader::tracing::setup_tracing;
