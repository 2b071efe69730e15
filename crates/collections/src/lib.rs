//! Helios Collections
//!
//! Typed document collections over Elasticsearch. A collection declares its
//! index, field mapping and settings; a [`CollectionClient`] bound to it
//! offers a fluent query builder plus search, count, delete, insert and
//! mapping operations.
//!
//! # Architecture
//!
//! - [`schema`] - collection declarations and index bootstrap bodies
//! - [`query`] - the condition DSL and the stateful query builder
//! - [`result`] - normalization of raw engine responses
//! - [`gateway`] - the engine seam and its Elasticsearch implementation
//! - [`client`] - request lifecycle, strict and legacy operations
//! - [`diagnostics`] - reporting of failures swallowed by legacy operations
//! - [`config`] - connection configuration
//! - [`error`] - error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! use helios_collections::{AfterExecute, ClientBuilder, ConnectionConfig};
//! use helios_collections::schema::{Collection, FieldMap, FieldMapping};
//! use serde_json::json;
//!
//! struct Users;
//!
//! impl Collection for Users {
//!     fn index(&self) -> &str {
//!         "users"
//!     }
//!
//!     fn map(&self) -> FieldMap {
//!         FieldMap::from([
//!             ("name".to_string(), FieldMapping::new("text")),
//!             ("age".to_string(), FieldMapping::new("integer")),
//!         ])
//!     }
//! }
//!
//! # async fn run() -> Result<(), helios_collections::CollectionError> {
//! let mut users = ClientBuilder::new(Users)
//!     .try_connect(&ConnectionConfig::default())
//!     .await?;
//!
//! users.try_insert(&json!({ "name": "Ann", "age": 21 }), true).await?;
//!
//! let adults = users
//!     .find()
//!     .filter(("age", ">=", 18))
//!     .order_by("name")
//!     .try_search(AfterExecute::Reset)
//!     .await?;
//! assert!(adults.total >= 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Conditions
//!
//! | Operator | Clause |
//! |----------|--------|
//! | `=` | `match` in `must` |
//! | `<>` | `term` in `must_not` |
//! | `>` `>=` `<` `<=` | `range` in `must` |
//! | `IN` | `terms` as the whole `filter` |
//! | `NOT_IN` | `terms` as the whole `must_not` |
//! | `BETWEEN` | inclusive `range` in `must` |
//! | `LIKE` | `match` with `operator: and`, `minimum_should_match: 65%` |
//!
//! Unknown operators fall back to `=`.

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gateway;
pub mod query;
pub mod result;
pub mod schema;

pub use client::{AfterExecute, ClientBuilder, CollectionClient, Query};
pub use config::{ConnectionConfig, ElasticsearchAuth};
pub use diagnostics::{Diagnostic, DiagnosticsSink, Severity, TracingSink};
pub use error::{CollectionError, CollectionResult, GatewayError};
pub use gateway::{ElasticsearchGateway, SearchGateway};
pub use query::{Condition, Operator, SortDirection};
pub use result::SearchEnvelope;
pub use schema::{Collection, DynamicCollection, FieldMap, FieldMapping};

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level` when set.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "helios_collections={level},collections={level},elasticsearch=warn"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
