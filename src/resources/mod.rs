//! # Resources
//!
//! The loadable resource kinds of the sample application:
//!
//! | resource | name | fetch | operations |
//! |---|---|---|---|
//! | [`UserProfile`] | `profile` | async | refresh, update |
//! | [`Feed`] | `feed` | async, paged | refresh, next page |
//! | [`SiteSettings`] | `settings` | synchronous | none |

pub mod feed;
pub mod profile;
pub mod settings;

pub use feed::{Feed, FeedParams};
pub use profile::{ProfileParams, UserProfile};
pub use settings::SiteSettings;

use crate::backend::ContentBackend;
use resource_loader::{LoaderError, ResourceRegistry};
use std::sync::Arc;

/// Registers every sample resource against `backend`.
pub fn registry(backend: Arc<dyn ContentBackend>) -> Result<ResourceRegistry, LoaderError> {
    ResourceRegistry::new()
        .with(UserProfile::new(backend.clone()))?
        .with(Feed::new(backend.clone()))?
        .with(SiteSettings::new(backend))
}
