use crate::backend::ContentBackend;
use crate::model::FeedPage;
use resource_loader::{BoxError, Capabilities, Fetch, LoadContext, LoadKind, Resource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedParams {
    pub topic: String,
    pub page_size: u32,
    /// Where the request came from. Not part of the cache key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl FeedParams {
    pub fn new(topic: impl Into<String>, page_size: u32) -> Self {
        Self {
            topic: topic.into(),
            page_size,
            referrer: None,
        }
    }
}

/// A topic feed loaded one page at a time.
///
/// A page load appends to the items already held; an initial fetch or refresh starts
/// over from the first page.
pub struct Feed {
    backend: Arc<dyn ContentBackend>,
}

impl Feed {
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        Self { backend }
    }
}

impl Resource for Feed {
    const NAME: &'static str = "feed";
    type Params = FeedParams;
    type Output = FeedPage;

    fn included_fields(&self) -> Option<&'static [&'static str]> {
        Some(&["topic", "pageSize"])
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            refresh: true,
            next_page: true,
            update: false,
        }
    }

    fn load(&self, ctx: LoadContext<FeedParams, FeedPage>) -> Fetch<FeedPage> {
        let backend = self.backend.clone();
        let so_far = match ctx.trigger {
            LoadKind::Page => ctx.existing_data.unwrap_or_default(),
            LoadKind::InitialFetch | LoadKind::Refresh => FeedPage::default(),
        };
        if so_far.exhausted {
            return Fetch::ready(so_far);
        }
        let params = ctx.params;
        Fetch::pending(async move {
            let items = backend
                .feed_page(&params.topic, so_far.next_page, params.page_size)
                .await
                .map_err(BoxError::from)?;
            Ok(so_far.append(items, params.page_size))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use resource_loader::derive_key;
    use serde_json::json;

    #[test]
    fn test_referrer_does_not_change_cache_key() {
        let feed = Feed::new(Arc::new(InMemoryBackend::seeded()));
        let fields = feed.included_fields();
        let a = derive_key(
            Feed::NAME,
            &json!({ "topic": "rust", "pageSize": 3, "referrer": "home" }),
            fields,
        );
        let b = derive_key(
            Feed::NAME,
            &json!({ "topic": "rust", "pageSize": 3, "referrer": "search" }),
            fields,
        );
        let c = derive_key(Feed::NAME, &json!({ "topic": "go", "pageSize": 3 }), fields);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
