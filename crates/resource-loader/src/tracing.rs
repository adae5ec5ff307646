//! # Tracing Setup
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter whose verbosity
//! is taken from `RUST_LOG`.
//!
//! ## What Gets Logged
//!
//! - **Loader lifecycle** at `info`: startup (render mode, registered resources) and
//!   shutdown (fetches still in flight, instances held).
//! - **Requests** at `debug`: every `LoadIfNeeded`, `Trigger` and `Unload` with its
//!   `resource_type`, `resource_id` and derived `cache_key`.
//! - **Failures** at `warn`: failed loads, failing event sinks and panicking consumers.
//! - **Dispatches and events** at `trace`.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=resource_loader=debug cargo run
//! ```
//!
//! A failed load looks like this:
//!
//! ```text
//! WARN Load failed resource_type="profile" resource_id="42" error=backend unavailable
//! ```

/// Installs the global subscriber. Call once, at process start.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
