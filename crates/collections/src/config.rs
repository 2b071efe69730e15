//! Connection configuration for the search engine.
//!
//! # Example
//!
//! ```rust
//! use helios_collections::ConnectionConfig;
//!
//! let config = ConnectionConfig {
//!     nodes: vec!["http://es.internal:9200".to_string()],
//!     timeout: "2s".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CollectionError, CollectionResult};

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Configuration for the connection behind a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Elasticsearch node URLs (e.g., `["http://localhost:9200"]`).
    /// Currently uses the first node (single-node connection pool).
    pub nodes: Vec<String>,

    /// Timeout sent with every document write (default: `"1s"`).
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Transport request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

/// Write timeout used when none is configured.
pub const DEFAULT_WRITE_TIMEOUT: &str = "1s";

fn default_timeout() -> String {
    DEFAULT_WRITE_TIMEOUT.to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["http://localhost:9200".to_string()],
            timeout: default_timeout(),
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}

impl ConnectionConfig {
    /// Creates a config targeting a single node with default settings.
    pub fn with_node(node: impl Into<String>) -> Self {
        Self {
            nodes: vec![node.into()],
            ..Default::default()
        }
    }

    /// Returns the node the client connects to.
    pub fn primary_node(&self) -> Option<&str> {
        self.nodes
            .iter()
            .map(|n| n.trim())
            .find(|n| !n.is_empty())
    }

    /// Checks that a connection target is present.
    pub fn validate(&self) -> CollectionResult<()> {
        if self.primary_node().is_none() {
            return Err(CollectionError::ConfigInvalid {
                message: "please provide at least one Elasticsearch node".to_string(),
            });
        }
        Ok(())
    }
}
