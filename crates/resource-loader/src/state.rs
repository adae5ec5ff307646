//! # Loader State
//!
//! The data model shared by the reducer, the subscription registry and the orchestrator.
//!
//! Everything here serializes to plain nested JSON with the field names a browser-side
//! consumer expects (`loadingCount`, `lastAction`, `hasData`, ...), so a state computed
//! during a server render can be handed to a client loader with no transformation.
//!
//! ```text
//! AggregateState
//! ├── loadingCount
//! └── data
//!     └── <resourceType>
//!         └── <resourceId> → LoaderState { status, lastAction, data }
//! ```

use crate::error::LoadError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// Identifies one logical loadable entity.
///
/// `resource_id` is chosen by the caller and is independent of the cache key derived
/// from params: one id may move through many cache keys over its life (pagination).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKey {
    pub resource_type: String,
    pub resource_id: String,
}

impl ResourceKey {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.resource_id)
    }
}

/// Load status of a single resource instance.
///
/// `Idle` is both the initial state and the end of every cycle. The other variants
/// mean exactly one fetch is outstanding for the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderStatus {
    #[default]
    Idle,
    Fetching,
    Refreshing,
    Paging,
}

impl LoaderStatus {
    pub fn is_idle(self) -> bool {
        self == LoaderStatus::Idle
    }

    /// The kind of load in flight, or `None` when idle.
    pub fn in_flight(self) -> Option<LoadKind> {
        match self {
            LoaderStatus::Idle => None,
            LoaderStatus::Fetching => Some(LoadKind::InitialFetch),
            LoaderStatus::Refreshing => Some(LoadKind::Refresh),
            LoaderStatus::Paging => Some(LoadKind::Page),
        }
    }
}

/// The kind of load a triggering action starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadKind {
    InitialFetch,
    Refresh,
    Page,
}

impl LoadKind {
    /// The status a resource instance sits in while this kind of load is in flight.
    pub fn status(self) -> LoaderStatus {
        match self {
            LoadKind::InitialFetch => LoaderStatus::Fetching,
            LoadKind::Refresh => LoaderStatus::Refreshing,
            LoadKind::Page => LoaderStatus::Paging,
        }
    }
}

/// The `type` of a [`LastAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LastActionKind {
    #[default]
    None,
    InitialFetch,
    Refresh,
    Page,
}

impl From<LoadKind> for LastActionKind {
    fn from(kind: LoadKind) -> Self {
        match kind {
            LoadKind::InitialFetch => LastActionKind::InitialFetch,
            LoadKind::Refresh => LastActionKind::Refresh,
            LoadKind::Page => LastActionKind::Page,
        }
    }
}

/// Outcome of the most recently *completed* load of a resource instance.
///
/// Serialized as `{type, success}` or `{type, success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastAction {
    #[serde(rename = "type")]
    pub kind: LastActionKind,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LoadError>,
}

impl LastAction {
    pub fn none() -> Self {
        Self::succeeded(LastActionKind::None)
    }

    pub fn succeeded(kind: impl Into<LastActionKind>) -> Self {
        Self {
            kind: kind.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(kind: impl Into<LastActionKind>, error: LoadError) -> Self {
        Self {
            kind: kind.into(),
            success: false,
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }
}

impl Default for LastAction {
    fn default() -> Self {
        Self::none()
    }
}

/// Data held for a resource instance.
///
/// Consumers must check [`Data::has_data`] (or match) before reading the result.
/// Serialized as `{hasData: false}` or `{hasData: true, result, dataFromServerSideRender}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "DataRepr", from = "DataRepr")]
pub enum Data {
    #[default]
    Empty,
    Loaded {
        result: Value,
        from_server_render: bool,
    },
}

impl Data {
    pub fn loaded(result: Value, from_server_render: bool) -> Self {
        Data::Loaded {
            result,
            from_server_render,
        }
    }

    pub fn has_data(&self) -> bool {
        matches!(self, Data::Loaded { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Data::Empty => None,
            Data::Loaded { result, .. } => Some(result),
        }
    }

    /// Whether the held data was produced during a server render.
    pub fn from_server_render(&self) -> bool {
        matches!(
            self,
            Data::Loaded {
                from_server_render: true,
                ..
            }
        )
    }

    /// Decodes the held result into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.result()
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataRepr {
    has_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_from_server_side_render: Option<bool>,
}

impl From<Data> for DataRepr {
    fn from(data: Data) -> Self {
        match data {
            Data::Empty => DataRepr {
                has_data: false,
                result: None,
                data_from_server_side_render: None,
            },
            Data::Loaded {
                result,
                from_server_render,
            } => DataRepr {
                has_data: true,
                result: Some(result),
                data_from_server_side_render: Some(from_server_render),
            },
        }
    }
}

impl From<DataRepr> for Data {
    fn from(repr: DataRepr) -> Self {
        if !repr.has_data {
            return Data::Empty;
        }
        // A JSON `null` result deserializes as `None`.
        Data::Loaded {
            result: repr.result.unwrap_or(Value::Null),
            from_server_render: repr.data_from_server_side_render.unwrap_or(false),
        }
    }
}

/// State of one resource instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderState {
    pub status: LoaderStatus,
    pub last_action: LastAction,
    pub data: Data,
}

impl LoaderState {
    /// True while a fetch is outstanding for the instance.
    pub fn is_busy(&self) -> bool {
        !self.status.is_idle()
    }
}

/// `resourceType → resourceId → LoaderState`.
pub type ResourceMap = BTreeMap<String, BTreeMap<String, LoaderState>>;

/// The whole loader state. Owned by the orchestrator; replaced, never mutated, on dispatch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateState {
    /// Resource instances with a fetch in flight.
    pub loading_count: usize,
    pub data: ResourceMap,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&LoaderState> {
        self.data
            .get(&key.resource_type)
            .and_then(|ids| ids.get(&key.resource_id))
    }

    /// The state of `key`, or the default idle state when nothing is recorded for it.
    pub fn loader_state(&self, key: &ResourceKey) -> LoaderState {
        self.get(key).cloned().unwrap_or_default()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of recorded resource instances across all types.
    pub fn instance_count(&self) -> usize {
        self.data.values().map(|ids| ids.len()).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loader_state_wire_format() {
        let state = LoaderState {
            status: LoaderStatus::Idle,
            last_action: LastAction::succeeded(LoadKind::InitialFetch),
            data: Data::loaded(json!(42), true),
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "idle",
                "lastAction": { "type": "initial-fetch", "success": true },
                "data": { "hasData": true, "result": 42, "dataFromServerSideRender": true }
            })
        );
    }

    #[test]
    fn test_empty_data_serializes_without_result() {
        let value = serde_json::to_value(Data::Empty).unwrap();
        assert_eq!(value, json!({ "hasData": false }));
    }

    #[test]
    fn test_null_result_survives_round_trip() {
        let data = Data::loaded(Value::Null, false);
        let back: Data = serde_json::from_value(serde_json::to_value(&data).unwrap()).unwrap();
        assert_eq!(back, data);
        assert!(back.has_data());
    }

    #[test]
    fn test_failed_last_action_carries_error() {
        let action = LastAction::failed(LoadKind::Refresh, LoadError::new("boom"));
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "refresh");
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["message"], "boom");
        assert!(action.is_failure());
    }

    #[test]
    fn test_aggregate_state_hydrates_from_json() {
        let json = r#"{
            "loadingCount": 0,
            "data": {
                "data": {
                    "1": {
                        "status": "idle",
                        "lastAction": { "type": "initial-fetch", "success": true },
                        "data": { "hasData": true, "result": { "n": 1 }, "dataFromServerSideRender": true }
                    }
                }
            }
        }"#;
        let state = AggregateState::from_json(json).unwrap();
        let key = ResourceKey::new("data", "1");
        let loader = state.get(&key).unwrap();
        assert!(loader.data.from_server_render());
        assert_eq!(loader.data.result(), Some(&json!({ "n": 1 })));
        assert_eq!(state.instance_count(), 1);

        let again = AggregateState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(again, state);
    }

    #[test]
    fn test_missing_key_defaults_to_idle() {
        let state = AggregateState::new();
        let loader = state.loader_state(&ResourceKey::new("data", "missing"));
        assert_eq!(loader.status, LoaderStatus::Idle);
        assert_eq!(loader.last_action, LastAction::none());
        assert!(!loader.data.has_data());
    }

    #[test]
    fn test_decode_typed_result() {
        let data = Data::loaded(json!([1, 2, 3]), false);
        let decoded: Option<Vec<u32>> = data.decode().unwrap();
        assert_eq!(decoded, Some(vec![1, 2, 3]));
        assert_eq!(Data::Empty.decode::<u32>().unwrap(), None);
    }
}
