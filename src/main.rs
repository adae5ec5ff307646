//! Renders a page on the server, hydrates it on the client and keeps using it there.

use hydrate_recipe::backend::InMemoryBackend;
use hydrate_recipe::error::AppError;
use hydrate_recipe::lifecycle::{setup_tracing, PageRequest, RenderSystem};
use hydrate_recipe::views::{FeedView, ProfileView};
use std::sync::Arc;
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_tracing();

    let backend = Arc::new(InMemoryBackend::seeded());
    let request = PageRequest::new("ada", "rust", 3);

    let page = RenderSystem::server_render(backend.clone(), &request)
        .instrument(tracing::info_span!("server"))
        .await?;
    info!(calls = backend.call_count(), "Server HTML:\n{}", page.html);

    let span = tracing::info_span!("client");
    async {
        let system = RenderSystem::hydrate(backend.clone(), &page.state)?;
        let before = backend.call_count();

        let mut profile = ProfileView::mount(&system.client, "main", &request.user_id).await?;
        let feed = FeedView::mount(&system.client, &request.topic, request.page_size).await?;
        info!(
            refetched = backend.call_count() - before,
            "Hydrated: {}",
            profile.render()
        );

        backend.rename("ada", "Ada King");
        profile.refresh().await?;
        system.client.wait_until_settled().await?;
        info!("After refresh: {}", profile.render());

        while feed.scroll().await? {
            system.client.wait_until_settled().await?;
        }
        info!("Full feed:\n{}", feed.render());

        profile.show_user("grace").await?;
        system.client.wait_until_settled().await?;
        info!("Switched user: {}", profile.render());

        profile.unmount().await?;
        feed.unmount().await?;
        system.shutdown().await
    }
    .instrument(span)
    .await?;

    info!(calls = backend.call_count(), "Application completed successfully");
    Ok(())
}
