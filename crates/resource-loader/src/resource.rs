//! # Resource Trait & Registry
//!
//! The [`Resource`] trait is the contract every loadable resource kind implements to be
//! managed by the loader. It names the kind, fixes its params and result types, and
//! supplies the fetch function.
//!
//! # Architecture Note
//! The orchestrator works on JSON values so one aggregate state can hold every kind of
//! resource and still serialize for hydration. [`ResourceRegistry::register`] erases a
//! typed resource into that JSON form once; typed access comes back through
//! [`ResourceHandle`](crate::handle::ResourceHandle).
//!
//! # Provided Methods
//! - [`Resource::included_fields`]: restrict the cache key to some params fields.
//! - [`Resource::capabilities`]: which follow-up operations the kind supports.
//! - [`Resource::refetch_after_hydration`]: treat server-rendered data as stale.

use crate::cache_key::derive_key;
use crate::error::{BoxError, LoaderError};
use crate::fetch::{Fetch, LoadContext};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;
use tracing::debug;

/// Follow-up operations a consumer can ask for on an attached resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Refresh,
    NextPage,
    Update,
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Refresh => "refresh",
            Operation::NextPage => "next_page",
            Operation::Update => "update",
        })
    }
}

/// The set of [`Operation`]s a resource kind supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub refresh: bool,
    pub next_page: bool,
    pub update: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        refresh: false,
        next_page: false,
        update: false,
    };

    pub const ALL: Capabilities = Capabilities {
        refresh: true,
        next_page: true,
        update: true,
    };

    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Refresh => self.refresh,
            Operation::NextPage => self.next_page,
            Operation::Update => self.update,
        }
    }
}

/// Refresh and update, no paging.
impl Default for Capabilities {
    fn default() -> Self {
        Self {
            refresh: true,
            next_page: false,
            update: true,
        }
    }
}

/// A named kind of loadable data.
///
/// # Fetching
/// [`load`](Resource::load) returns a [`Fetch`]: [`Fetch::Ready`] when the answer is
/// known on the spot, [`Fetch::Pending`] otherwise. A ready initial load never shows a
/// loading state. Errors and panics are both turned into a failed load.
pub trait Resource: Send + Sync + 'static {
    /// The resource type name. Must be unique within a registry.
    const NAME: &'static str;

    type Params: Serialize + DeserializeOwned + Debug + Send + 'static;

    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Params fields that feed the cache key. `None` means all of them.
    fn included_fields(&self) -> Option<&'static [&'static str]> {
        None
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Whether a client should refetch data that came from a server render.
    fn refetch_after_hydration(&self) -> bool {
        false
    }

    fn load(&self, ctx: LoadContext<Self::Params, Self::Output>) -> Fetch<Self::Output>;
}

type ErasedLoad = dyn Fn(LoadContext<Value, Value>) -> Fetch<Value> + Send + Sync;

/// A resource registered with the loader, working on JSON values.
pub struct RegisteredResource {
    name: &'static str,
    included_fields: Option<&'static [&'static str]>,
    capabilities: Capabilities,
    refetch_after_hydration: bool,
    load: Box<ErasedLoad>,
}

impl RegisteredResource {
    fn erase<R: Resource>(resource: R) -> Self {
        let included_fields = resource.included_fields();
        let capabilities = resource.capabilities();
        let refetch_after_hydration = resource.refetch_after_hydration();
        let load = move |ctx: LoadContext<Value, Value>| -> Fetch<Value> {
            let typed = match ctx.decode::<R::Params, R::Output>() {
                Ok(typed) => typed,
                Err(e) => return Fetch::failed(e),
            };
            resource
                .load(typed)
                .map(|output| serde_json::to_value(output).map_err(BoxError::from))
        };
        Self {
            name: R::NAME,
            included_fields,
            capabilities,
            refetch_after_hydration,
            load: Box::new(load),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn refetch_after_hydration(&self) -> bool {
        self.refetch_after_hydration
    }

    pub fn derive_key(&self, params: &Value) -> String {
        derive_key(self.name, params, self.included_fields)
    }

    /// Invokes the fetch function.
    pub fn fetch(&self, ctx: LoadContext<Value, Value>) -> Fetch<Value> {
        (self.load)(ctx)
    }
}

impl Debug for RegisteredResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredResource")
            .field("name", &self.name)
            .field("included_fields", &self.included_fields)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Maps resource type names to their registered loaders.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: HashMap<&'static str, Arc<RegisteredResource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resource` under [`Resource::NAME`].
    ///
    /// Registering the same name twice is a configuration error and fails immediately.
    pub fn register<R: Resource>(&mut self, resource: R) -> Result<&mut Self, LoaderError> {
        if self.resources.contains_key(R::NAME) {
            return Err(LoaderError::DuplicateResource(R::NAME.to_string()));
        }
        debug!(resource_type = R::NAME, "Registered");
        self.resources
            .insert(R::NAME, Arc::new(RegisteredResource::erase(resource)));
        Ok(self)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<R: Resource>(mut self, resource: R) -> Result<Self, LoaderError> {
        self.register(resource)?;
        Ok(self)
    }

    pub fn get(&self, resource_type: &str) -> Result<&Arc<RegisteredResource>, LoaderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| LoaderError::UnknownResource(resource_type.to_string()))
    }

    /// Derives the cache key for params of a registered resource type.
    pub fn derive_key(&self, resource_type: &str, params: &Value) -> Result<String, LoaderError> {
        Ok(self.get(resource_type)?.derive_key(params))
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.resources.contains_key(resource_type)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderMode;
    use crate::state::LoadKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Query {
        term: String,
        #[serde(default)]
        page: u32,
    }

    struct Search;

    impl Resource for Search {
        const NAME: &'static str = "search";
        type Params = Query;
        type Output = Vec<String>;

        fn included_fields(&self) -> Option<&'static [&'static str]> {
            Some(&["term"])
        }

        fn load(&self, ctx: LoadContext<Query, Vec<String>>) -> Fetch<Vec<String>> {
            let mut hits = ctx.existing_data.unwrap_or_default();
            hits.push(format!("{}#{}", ctx.params.term, ctx.params.page));
            Fetch::ready(hits)
        }
    }

    struct Other;

    impl Resource for Other {
        const NAME: &'static str = "search";
        type Params = ();
        type Output = ();

        fn load(&self, _ctx: LoadContext<(), ()>) -> Fetch<()> {
            Fetch::ready(())
        }
    }

    fn context(params: Value, existing_data: Option<Value>) -> LoadContext<Value, Value> {
        LoadContext {
            resource_id: "1".to_string(),
            params,
            cache_key: String::new(),
            existing_data,
            trigger: LoadKind::InitialFetch,
            mode: RenderMode::Client,
        }
    }

    #[test]
    fn test_duplicate_registration_fails_immediately() {
        let mut registry = ResourceRegistry::new();
        registry.register(Search).unwrap();
        let err = registry.register(Other).unwrap_err();
        assert!(matches!(err, LoaderError::DuplicateResource(name) if name == "search"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_resource() {
        let registry = ResourceRegistry::new();
        let err = registry.derive_key("missing", &json!({})).unwrap_err();
        assert!(matches!(err, LoaderError::UnknownResource(name) if name == "missing"));
    }

    #[test]
    fn test_registered_key_uses_included_fields() {
        let registry = ResourceRegistry::new().with(Search).unwrap();
        let a = registry
            .derive_key("search", &json!({ "term": "rust", "page": 1 }))
            .unwrap();
        let b = registry
            .derive_key("search", &json!({ "term": "rust", "page": 2 }))
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_erased_fetch_round_trips_json() {
        let registry = ResourceRegistry::new().with(Search).unwrap();
        let resource = registry.get("search").unwrap();
        let fetch = resource.fetch(context(
            json!({ "term": "rust", "page": 2 }),
            Some(json!(["rust#1"])),
        ));
        assert!(!fetch.is_pending());
        assert_eq!(
            fetch.into_future().await.unwrap(),
            json!(["rust#1", "rust#2"])
        );
    }

    #[tokio::test]
    async fn test_bad_params_fail_the_fetch() {
        let registry = ResourceRegistry::new().with(Search).unwrap();
        let fetch = registry
            .get("search")
            .unwrap()
            .fetch(context(json!({ "page": 2 }), None));
        assert!(fetch.into_future().await.is_err());
    }

    #[test]
    fn test_default_capabilities() {
        let caps = Capabilities::default();
        assert!(caps.supports(Operation::Refresh));
        assert!(caps.supports(Operation::Update));
        assert!(!caps.supports(Operation::NextPage));
        assert!(!Capabilities::NONE.supports(Operation::Refresh));
        assert!(Capabilities::ALL.supports(Operation::NextPage));
    }
}
