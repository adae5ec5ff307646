use super::Snapshot;
use crate::error::AppError;
use crate::model::FeedPage;
use crate::resources::{Feed, FeedParams};
use resource_loader::{LoaderClient, LoaderState, LoaderStatus, ResourceHandle, Subscriber};
use tracing::debug;

/// An infinitely scrolling list of a topic's posts.
pub struct FeedView {
    handle: ResourceHandle<Feed>,
    id: String,
    params: FeedParams,
    subscriber: Subscriber,
    snapshot: Snapshot,
}

impl FeedView {
    pub async fn mount(client: &LoaderClient, topic: &str, page_size: u32) -> Result<Self, AppError> {
        let snapshot = Snapshot::default();
        let view = Self {
            handle: ResourceHandle::new(client.clone()),
            id: topic.to_string(),
            params: FeedParams::new(topic, page_size),
            subscriber: snapshot.subscriber(),
            snapshot,
        };
        let outcome = view
            .handle
            .load_if_needed(&view.id, &view.params, &view.subscriber)
            .await?;
        debug!(topic, page_size, ?outcome, "FeedView mounted");
        Ok(view)
    }

    pub fn state(&self) -> LoaderState {
        self.snapshot.latest()
    }

    /// The items loaded so far.
    pub fn page(&self) -> Result<Option<FeedPage>, AppError> {
        Ok(self.state().data.decode()?)
    }

    pub fn render(&self) -> String {
        let loader = self.state();
        let page = match loader.data.decode::<FeedPage>() {
            Ok(Some(page)) => page,
            Ok(None) => return "Loading feed".to_string(),
            Err(e) => return format!("Invalid feed: {e}"),
        };
        let mut lines: Vec<String> = page
            .items
            .iter()
            .map(|item| format!("- {}", item.title))
            .collect();
        match loader.status {
            LoaderStatus::Paging => lines.push("Loading more".to_string()),
            _ if page.exhausted => lines.push("End of feed".to_string()),
            _ => {}
        }
        lines.join("\n")
    }

    /// Asks for the next page. Returns false once the feed is exhausted, or when the
    /// loader ignored the request because a load is in flight.
    pub async fn scroll(&self) -> Result<bool, AppError> {
        if self.page()?.is_some_and(|page| page.exhausted) {
            return Ok(false);
        }
        Ok(self.handle.next_page(&self.id, &self.params).await?)
    }

    pub async fn refresh(&self) -> Result<bool, AppError> {
        Ok(self.handle.refresh(&self.id, &self.params).await?)
    }

    pub async fn unmount(self) -> Result<bool, AppError> {
        Ok(self
            .handle
            .unload(&self.id, &self.params, &self.subscriber)
            .await?)
    }
}
