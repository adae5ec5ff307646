use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: u32,
    pub title: String,
}

/// Every item loaded so far for a feed, across pages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    /// Zero-based index of the next page to request.
    pub next_page: u32,
    /// True once the backend returned a short page.
    pub exhausted: bool,
}

impl FeedPage {
    /// Appends one backend page.
    pub fn append(mut self, items: Vec<FeedItem>, page_size: u32) -> Self {
        self.exhausted = items.len() < page_size as usize;
        self.items.extend(items);
        self.next_page += 1;
        self
    }
}
