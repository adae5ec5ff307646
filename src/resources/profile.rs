use crate::backend::ContentBackend;
use crate::model::Profile;
use resource_loader::{BoxError, Fetch, LoadContext, Resource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileParams {
    pub user_id: String,
}

impl ProfileParams {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// A user's public profile.
pub struct UserProfile {
    backend: Arc<dyn ContentBackend>,
}

impl UserProfile {
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        Self { backend }
    }
}

impl Resource for UserProfile {
    const NAME: &'static str = "profile";
    type Params = ProfileParams;
    type Output = Profile;

    fn load(&self, ctx: LoadContext<ProfileParams, Profile>) -> Fetch<Profile> {
        let backend = self.backend.clone();
        Fetch::pending(async move {
            backend
                .profile(&ctx.params.user_id)
                .await
                .map_err(BoxError::from)
        })
    }
}
