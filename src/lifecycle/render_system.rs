use crate::backend::ContentBackend;
use crate::error::AppError;
use crate::resources::{self, SiteSettings};
use crate::views::{FeedView, ProfileView};
use resource_loader::{
    AggregateState, EventSink, LoaderActor, LoaderClient, LoaderConfig, LoaderEvent,
    ResourceHandle, SinkError, Subscriber,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Logs every loader event at debug level.
pub struct LogSink;

impl EventSink for LogSink {
    fn on_event(&self, event: &LoaderEvent) -> Result<(), SinkError> {
        match event {
            LoaderEvent::StateChanged { state } => {
                debug!(loading = state.loading_count, "state-changed")
            }
            LoaderEvent::BeginLoading(p)
            | LoaderEvent::EndLoading(p)
            | LoaderEvent::DataLoadCompleted(p) => debug!(
                event = event.name(),
                resource_type = %p.resource_type,
                resource_id = %p.resource_id,
                number_loading = p.number_loading,
                "Loader event"
            ),
            LoaderEvent::LoadError(e) => debug!(error = %e.error, "load-error"),
        }
        Ok(())
    }
}

/// A running loader and the task that drives it.
pub struct RenderSystem {
    pub client: LoaderClient,
    handle: JoinHandle<()>,
}

impl RenderSystem {
    /// Spawns a loader for the sample resources.
    pub fn start(
        config: LoaderConfig,
        backend: Arc<dyn ContentBackend>,
        initial: Option<AggregateState>,
    ) -> Result<Self, AppError> {
        let (actor, client) = LoaderActor::new(config, resources::registry(backend)?);
        let mut actor = actor.with_event_sink(Arc::new(LogSink));
        if let Some(state) = initial {
            actor = actor.with_initial_state(state);
        }
        Ok(Self {
            client,
            handle: tokio::spawn(actor.run()),
        })
    }

    pub fn server(backend: Arc<dyn ContentBackend>) -> Result<Self, AppError> {
        Self::start(LoaderConfig::server(), backend, None)
    }

    /// Starts a client-mode loader from a serialized server snapshot.
    pub fn hydrate(backend: Arc<dyn ContentBackend>, snapshot: &str) -> Result<Self, AppError> {
        let state = AggregateState::from_json(snapshot)?;
        info!(instances = state.instance_count(), "Hydrating");
        Self::start(LoaderConfig::client(), backend, Some(state))
    }

    /// Renders a page on the server.
    #[instrument(skip(backend))]
    pub async fn server_render(
        backend: Arc<dyn ContentBackend>,
        request: &PageRequest,
    ) -> Result<RenderedPage, AppError> {
        let system = Self::server(backend)?;

        let settings = ResourceHandle::<SiteSettings>::new(system.client.clone());
        let settings_subscriber = Subscriber::noop();
        settings
            .load_if_needed("site", &(), &settings_subscriber)
            .await?;
        let profile = ProfileView::mount(&system.client, "main", &request.user_id).await?;
        let feed = FeedView::mount(&system.client, &request.topic, request.page_size).await?;

        system.client.wait_until_settled().await?;

        let theme = settings
            .data("site")
            .await?
            .map(|s| s.theme)
            .unwrap_or_default();
        let html = format!(
            "<body class=\"{theme}\">\n<header>{}</header>\n<main>\n{}\n</main>\n</body>",
            profile.render(),
            feed.render()
        );
        let state = system.client.state().await?.to_json()?;
        info!(bytes = state.len(), "Server render complete");

        profile.unmount().await?;
        feed.unmount().await?;
        settings
            .unload("site", &(), &settings_subscriber)
            .await?;
        drop(settings);
        system.shutdown().await?;

        Ok(RenderedPage { html, state })
    }

    /// Drops the client and waits for the loader task to finish.
    ///
    /// The loader only stops once every clone of the client is gone, so views must be
    /// unmounted or dropped first.
    pub async fn shutdown(self) -> Result<(), AppError> {
        info!("Shutting down loader...");
        drop(self.client);
        if let Err(e) = self.handle.await {
            error!("Loader task failed: {:?}", e);
            return Err(AppError::Task(e.to_string()));
        }
        info!("Loader shutdown complete.");
        Ok(())
    }
}

/// What a page shows.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub user_id: String,
    pub topic: String,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(user_id: &str, topic: &str, page_size: u32) -> Self {
        Self {
            user_id: user_id.to_string(),
            topic: topic.to_string(),
            page_size,
        }
    }
}

/// Output of a server render: markup plus the state to hydrate from.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub state: String,
}
