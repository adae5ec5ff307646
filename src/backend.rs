//! # Content Backend
//!
//! The data source the sample resources fetch from. [`InMemoryBackend`] simulates a
//! remote service: calls take a configurable latency, are counted, and can be made to
//! fail on demand.

use crate::model::{FeedItem, Profile, Settings};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors returned by a content backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ContentBackend: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Profile, BackendError>;

    /// One page of a topic's feed. A page shorter than `page_size` is the last one.
    async fn feed_page(
        &self,
        topic: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<FeedItem>, BackendError>;

    /// Settings are served from local configuration and never wait.
    fn settings(&self) -> Settings;
}

pub struct InMemoryBackend {
    profiles: Mutex<HashMap<String, Profile>>,
    feeds: HashMap<String, Vec<FeedItem>>,
    settings: Settings,
    latency: Duration,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            feeds: HashMap::new(),
            settings: Settings::default(),
            latency,
            calls: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// A backend with a couple of users and a `rust` feed of seven items.
    pub fn seeded() -> Self {
        let mut backend = Self::new(Duration::from_millis(5));
        backend.add_profile(Profile::new("ada", "Ada Lovelace", "First programmer"));
        backend.add_profile(Profile::new("grace", "Grace Hopper", "Compiler pioneer"));
        backend.add_feed(
            "rust",
            (1..=7)
                .map(|id| FeedItem {
                    id,
                    title: format!("Rust post #{id}"),
                })
                .collect(),
        );
        backend
    }

    pub fn add_profile(&mut self, profile: Profile) {
        self.profiles
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(profile.id.clone(), profile);
    }

    pub fn add_feed(&mut self, topic: &str, items: Vec<FeedItem>) {
        self.feeds.insert(topic.to_string(), items);
    }

    /// Replaces a stored profile, as an edit made elsewhere would.
    pub fn rename(&self, user_id: &str, name: &str) {
        let mut profiles = self.profiles.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(profile) = profiles.get_mut(user_id) {
            profile.name = name.to_string();
        }
    }

    /// Makes every async call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of async calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn round_trip(&self, what: &str) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(what, "Backend call");
        tokio::time::sleep(self.latency).await;
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(what.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentBackend for InMemoryBackend {
    async fn profile(&self, user_id: &str) -> Result<Profile, BackendError> {
        self.round_trip("profile").await?;
        self.profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("user {user_id}")))
    }

    async fn feed_page(
        &self,
        topic: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<FeedItem>, BackendError> {
        self.round_trip("feed").await?;
        let items = self
            .feeds
            .get(topic)
            .ok_or_else(|| BackendError::NotFound(format!("topic {topic}")))?;
        let start = (page * page_size) as usize;
        Ok(items
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    fn settings(&self) -> Settings {
        self.settings.clone()
    }
}
