use super::Snapshot;
use crate::error::AppError;
use crate::model::Profile;
use crate::resources::{ProfileParams, UserProfile};
use resource_loader::{LoaderClient, LoaderState, ResourceHandle, Subscriber};
use tracing::debug;

/// Shows one user's profile in a named slot of the page.
pub struct ProfileView {
    handle: ResourceHandle<UserProfile>,
    slot: String,
    params: ProfileParams,
    subscriber: Subscriber,
    snapshot: Snapshot,
}

impl ProfileView {
    /// Mounts the view, attaching it to the `profile` resource under `slot`.
    pub async fn mount(client: &LoaderClient, slot: &str, user_id: &str) -> Result<Self, AppError> {
        let snapshot = Snapshot::default();
        let view = Self {
            handle: ResourceHandle::new(client.clone()),
            slot: slot.to_string(),
            params: ProfileParams::new(user_id),
            subscriber: snapshot.subscriber(),
            snapshot,
        };
        let outcome = view
            .handle
            .load_if_needed(&view.slot, &view.params, &view.subscriber)
            .await?;
        debug!(slot, user_id, ?outcome, "ProfileView mounted");
        Ok(view)
    }

    pub fn state(&self) -> LoaderState {
        self.snapshot.latest()
    }

    /// How many times the loader has handed this view a new state.
    pub fn deliveries(&self) -> usize {
        self.snapshot.deliveries()
    }

    pub fn render(&self) -> String {
        let loader = self.state();
        match loader.data.decode::<Profile>() {
            Ok(Some(profile)) if loader.is_busy() => format!("{} (updating)", profile.name),
            Ok(Some(profile)) => format!("{}: {}", profile.name, profile.bio),
            Ok(None) => match loader.last_action.error {
                Some(error) => format!("Profile unavailable: {}", error.message),
                None => "Loading profile".to_string(),
            },
            Err(e) => format!("Invalid profile: {e}"),
        }
    }

    pub async fn refresh(&self) -> Result<bool, AppError> {
        Ok(self.handle.refresh(&self.slot, &self.params).await?)
    }

    /// Points the view at another user, reloading the slot.
    pub async fn show_user(&mut self, user_id: &str) -> Result<bool, AppError> {
        self.params = ProfileParams::new(user_id);
        Ok(self.handle.update(&self.slot, &self.params).await?)
    }

    /// Detaches the view. Returns true when it was the slot's last consumer.
    pub async fn unmount(self) -> Result<bool, AppError> {
        Ok(self
            .handle
            .unload(&self.slot, &self.params, &self.subscriber)
            .await?)
    }
}
