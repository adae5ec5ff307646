use crate::backend::ContentBackend;
use crate::model::Settings;
use resource_loader::{Capabilities, Fetch, LoadContext, Resource};
use std::sync::Arc;

/// Site-wide settings. The fetch answers synchronously, so the instance never shows a
/// loading state.
pub struct SiteSettings {
    backend: Arc<dyn ContentBackend>,
}

impl SiteSettings {
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        Self { backend }
    }
}

impl Resource for SiteSettings {
    const NAME: &'static str = "settings";
    type Params = ();
    type Output = Settings;

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    fn load(&self, _ctx: LoadContext<(), Settings>) -> Fetch<Settings> {
        Fetch::ready(self.backend.settings())
    }
}
