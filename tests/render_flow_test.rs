use hydrate_recipe::backend::InMemoryBackend;
use hydrate_recipe::lifecycle::{PageRequest, RenderSystem};
use hydrate_recipe::resources::SiteSettings;
use hydrate_recipe::views::{FeedView, ProfileView};
use resource_loader::{
    AggregateState, LoaderConfig, LoaderError, LoaderStatus, ResourceHandle, ResourceKey,
};
use std::sync::Arc;

/// Full server render followed by a client hydration, with real actors on both sides.
#[tokio::test]
async fn test_server_render_then_hydrate_without_refetch() {
    let backend = Arc::new(InMemoryBackend::seeded());
    let request = PageRequest::new("ada", "rust", 3);

    let page = RenderSystem::server_render(backend.clone(), &request)
        .await
        .expect("Server render failed");
    assert!(page.html.contains("class=\"light\""));
    assert!(page.html.contains("Ada Lovelace: First programmer"));
    assert!(page.html.contains("- Rust post #3"));
    assert!(!page.html.contains("Rust post #4"));
    // Settings answer synchronously and never reach the backend's async path.
    assert_eq!(backend.call_count(), 2);

    let snapshot = AggregateState::from_json(&page.state).expect("Invalid snapshot");
    assert_eq!(snapshot.loading_count, 0);
    assert_eq!(snapshot.instance_count(), 3);
    let profile_state = snapshot.loader_state(&ResourceKey::new("profile", "main"));
    assert_eq!(profile_state.status, LoaderStatus::Idle);
    assert!(profile_state.data.from_server_render());

    let system = RenderSystem::hydrate(backend.clone(), &page.state).expect("Hydrate failed");
    let profile = ProfileView::mount(&system.client, "main", "ada").await.unwrap();
    let feed = FeedView::mount(&system.client, "rust", 3).await.unwrap();

    assert_eq!(backend.call_count(), 2, "hydrated views must not refetch");
    assert_eq!(system.client.number_loading(), 0);
    assert_eq!(profile.render(), "Ada Lovelace: First programmer");
    assert_eq!(feed.page().unwrap().unwrap().items.len(), 3);

    // Refresh picks up an edit made on the backend.
    backend.rename("ada", "Ada King");
    assert!(profile.refresh().await.unwrap());
    system.client.wait_until_settled().await.unwrap();
    assert_eq!(profile.render(), "Ada King: First programmer");
    assert_eq!(backend.call_count(), 3);

    // Scroll to the end of the feed.
    let mut pages = 0;
    while feed.scroll().await.unwrap() {
        system.client.wait_until_settled().await.unwrap();
        pages += 1;
    }
    assert_eq!(pages, 2);
    let loaded = feed.page().unwrap().unwrap();
    assert_eq!(loaded.items.len(), 7);
    assert!(loaded.exhausted);
    assert!(feed.render().ends_with("End of feed"));

    assert!(profile.unmount().await.unwrap());
    assert!(feed.unmount().await.unwrap());
    let state = system.client.state().await.unwrap();
    assert!(!state.contains(&ResourceKey::new("profile", "main")));
    assert!(!state.contains(&ResourceKey::new("feed", "rust")));
    // Hydrated but never mounted on the client: left as is.
    assert!(state.contains(&ResourceKey::new("settings", "site")));

    system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_client_retries_what_the_server_failed() {
    let backend = Arc::new(InMemoryBackend::seeded());
    backend.set_unavailable(true);

    let page = RenderSystem::server_render(backend.clone(), &PageRequest::new("ada", "rust", 3))
        .await
        .expect("Failed fetches must not fail the render");
    assert!(page.html.contains("Profile unavailable"));
    assert_eq!(backend.call_count(), 2);

    let snapshot = AggregateState::from_json(&page.state).unwrap();
    let profile_state = snapshot.loader_state(&ResourceKey::new("profile", "main"));
    assert!(profile_state.last_action.is_failure());
    assert!(!profile_state.data.has_data());

    backend.set_unavailable(false);
    let system = RenderSystem::hydrate(backend.clone(), &page.state).unwrap();
    let profile = ProfileView::mount(&system.client, "main", "ada").await.unwrap();
    system.client.wait_until_settled().await.unwrap();

    assert_eq!(backend.call_count(), 3);
    assert_eq!(profile.render(), "Ada Lovelace: First programmer");

    profile.unmount().await.unwrap();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_views_share_one_instance() {
    let backend = Arc::new(InMemoryBackend::seeded());
    let system = RenderSystem::start(LoaderConfig::client(), backend.clone(), None).unwrap();

    let header = ProfileView::mount(&system.client, "main", "ada").await.unwrap();
    let sidebar = ProfileView::mount(&system.client, "main", "ada").await.unwrap();
    system.client.wait_until_settled().await.unwrap();

    assert_eq!(backend.call_count(), 1);
    assert_eq!(header.render(), "Ada Lovelace: First programmer");
    assert_eq!(sidebar.render(), header.render());

    assert!(!header.unmount().await.unwrap());
    assert!(sidebar.unmount().await.unwrap());
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_show_user_reloads_slot() {
    let backend = Arc::new(InMemoryBackend::seeded());
    let system = RenderSystem::start(LoaderConfig::client(), backend.clone(), None).unwrap();

    let mut profile = ProfileView::mount(&system.client, "main", "ada").await.unwrap();
    system.client.wait_until_settled().await.unwrap();
    assert!(profile.show_user("grace").await.unwrap());
    system.client.wait_until_settled().await.unwrap();

    assert_eq!(profile.render(), "Grace Hopper: Compiler pioneer");
    assert_eq!(backend.call_count(), 2);

    profile.unmount().await.unwrap();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_settings_reject_refresh() {
    let backend = Arc::new(InMemoryBackend::seeded());
    let system = RenderSystem::start(LoaderConfig::client(), backend, None).unwrap();
    let settings = ResourceHandle::<SiteSettings>::new(system.client.clone());

    let result = settings.refresh("site", &()).await;
    assert!(matches!(result, Err(LoaderError::Unsupported { .. })));

    drop(settings);
    system.shutdown().await.unwrap();
}
