//! # Loader Configuration
//!
//! A loader runs either as part of a server render or in a client that may resume a
//! server-rendered state. The mode decides when `load_if_needed` actually fetches and
//! how completed data is stamped.

use serde::{Deserialize, Serialize};

/// Where the loader is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Server-side render: compute initial state before first observation.
    Server,
    #[default]
    Client,
}

impl RenderMode {
    pub fn is_server(self) -> bool {
        self == RenderMode::Server
    }
}

/// Settings for a [`LoaderActor`](crate::actor::LoaderActor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub mode: RenderMode,
    /// Capacity of the request channel. Clients wait when it is full.
    pub buffer_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::Client,
            buffer_size: 64,
        }
    }
}

impl LoaderConfig {
    pub fn server() -> Self {
        Self {
            mode: RenderMode::Server,
            ..Self::default()
        }
    }

    pub fn client() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: LoaderConfig = serde_json::from_str(r#"{ "mode": "server" }"#).unwrap();
        assert_eq!(config.mode, RenderMode::Server);
        assert_eq!(config.buffer_size, 64);
    }

    #[test]
    fn test_buffer_size_never_zero() {
        assert_eq!(LoaderConfig::client().with_buffer_size(0).buffer_size, 1);
    }
}
