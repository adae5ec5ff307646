//! # Views
//!
//! Minimal bindings between a "view" and the loader. They follow the binding contract:
//!
//! - attach on mount through `load_if_needed`, detach on unmount through `unload`;
//! - forward the current params on every call;
//! - treat each delivered [`LoaderState`](resource_loader::LoaderState) as an immutable
//!   snapshot and re-render from it.
//!
//! A view keeps the last snapshot its subscriber was handed and renders it to a string.

pub mod feed;
pub mod profile;

pub use feed::FeedView;
pub use profile::ProfileView;

use resource_loader::{LoaderState, Subscriber};
use std::sync::{Arc, Mutex, PoisonError};

/// The last state delivered to a view, plus how often it was delivered.
#[derive(Clone, Default)]
pub(crate) struct Snapshot {
    inner: Arc<Mutex<(Option<LoaderState>, usize)>>,
}

impl Snapshot {
    /// A subscriber that stores every delivered state here.
    pub(crate) fn subscriber(&self) -> Subscriber {
        let inner = self.inner.clone();
        Subscriber::new(move |loader, _| {
            let mut slot = inner.lock().unwrap_or_else(PoisonError::into_inner);
            slot.0 = Some(loader.clone());
            slot.1 += 1;
        })
    }

    pub(crate) fn latest(&self) -> LoaderState {
        let slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        slot.0.clone().unwrap_or_default()
    }

    pub(crate) fn deliveries(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).1
    }
}
