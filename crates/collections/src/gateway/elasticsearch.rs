//! [`SearchGateway`] backed by the official Elasticsearch client.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{IndicesCreateParts, IndicesExistsParts};
use elasticsearch::params::Refresh;
use elasticsearch::{CountParts, DeleteByQueryParts, Elasticsearch, IndexParts, SearchParts};
use serde_json::Value;

use super::{CreateIndexRequest, IndexRequest, SearchGateway, SearchRequest};
use crate::config::{ConnectionConfig, ElasticsearchAuth};
use crate::error::{CollectionError, CollectionResult, GatewayError, GatewayResult};
use crate::schema::DEFAULT_DOC_TYPE;

/// Gateway over an Elasticsearch cluster.
pub struct ElasticsearchGateway {
    client: Elasticsearch,
    node: String,
}

impl Debug for ElasticsearchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchGateway")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchGateway {
    /// Builds the client from configuration. Does not contact the engine.
    pub fn new(config: &ConnectionConfig) -> CollectionResult<Self> {
        config.validate()?;
        let node = config
            .primary_node()
            .map(str::to_string)
            .unwrap_or_default();

        let parsed_url: elasticsearch::http::Url =
            node.parse().map_err(|e| CollectionError::ConfigInvalid {
                message: format!("invalid node URL {node}: {e}"),
            })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                ElasticsearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                ElasticsearchAuth::Bearer { token } => {
                    builder.auth(Credentials::Bearer(token.clone()))
                }
            };
        }

        let transport = builder
            .build()
            .map_err(|e| CollectionError::EngineUnavailable {
                message: format!("failed to build transport: {e}"),
            })?;

        tracing::debug!(node = %node, "Built Elasticsearch client");

        Ok(Self {
            client: Elasticsearch::new(transport),
            node,
        })
    }

    /// Returns the node this gateway talks to.
    pub fn node(&self) -> &str {
        &self.node
    }
}

fn transport_error(e: elasticsearch::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

/// Returns the JSON body of a successful response, or the rejection.
async fn decode(response: Response) -> GatewayResult<Value> {
    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

#[async_trait]
impl SearchGateway for ElasticsearchGateway {
    async fn ping(&self) -> GatewayResult<bool> {
        let response = self.client.ping().send().await.map_err(transport_error)?;
        Ok(response.status_code().is_success())
    }

    async fn index_exists(&self, index: &str) -> GatewayResult<bool> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(GatewayError::Rejected {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn search(&self, request: SearchRequest) -> GatewayResult<Value> {
        let indices = [request.index.as_str()];
        let mut call = self.client.search(SearchParts::Index(&indices));
        if let Some(size) = request.size {
            call = call.size(size);
        }
        if let Some(from) = request.from {
            call = call.from(from);
        }

        let response = call
            .body(request.body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn count(&self, request: SearchRequest) -> GatewayResult<Value> {
        let response = self
            .client
            .count(CountParts::Index(&[&request.index]))
            .body(request.body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn delete_by_query(&self, request: SearchRequest) -> GatewayResult<Value> {
        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[&request.index]))
            .body(request.body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn index(&self, request: IndexRequest) -> GatewayResult<Value> {
        if request.doc_type != DEFAULT_DOC_TYPE {
            // mapping types were removed in 8.x; every write goes through _doc
            tracing::debug!(
                doc_type = %request.doc_type,
                index = %request.index,
                "Ignoring custom document type"
            );
        }

        let mut call = self
            .client
            .index(IndexParts::IndexId(&request.index, &request.id))
            .timeout(&request.timeout);
        if let Some(refresh) = request.refresh {
            call = call.refresh(if refresh { Refresh::True } else { Refresh::False });
        }

        let response = call
            .body(request.body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn create_index(&self, request: CreateIndexRequest) -> GatewayResult<Value> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&request.index))
            .body(request.body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_creation_does_not_connect() {
        let gateway = ElasticsearchGateway::new(&ConnectionConfig::default()).unwrap();
        assert_eq!(gateway.node(), "http://localhost:9200");
    }

    #[test]
    fn test_gateway_rejects_empty_config() {
        let config = ConnectionConfig {
            nodes: vec![],
            ..Default::default()
        };
        assert!(matches!(
            ElasticsearchGateway::new(&config),
            Err(CollectionError::ConfigInvalid { .. })
        ));
    }

    #[tokio::test]
    async fn test_paginated_search_without_engine_is_transport_error() {
        // nothing listens on this port
        let gateway = ElasticsearchGateway::new(&ConnectionConfig::with_node("http://127.0.0.1:1"))
            .unwrap();
        let request = SearchRequest {
            index: "users".to_string(),
            size: Some(10),
            from: Some(20),
            body: serde_json::json!({ "query": { "match_all": {} } }),
        };
        assert!(matches!(
            gateway.search(request).await,
            Err(GatewayError::Transport(_))
        ));
    }

    #[test]
    fn test_gateway_rejects_invalid_url() {
        let config = ConnectionConfig::with_node("not a url");
        assert!(matches!(
            ElasticsearchGateway::new(&config),
            Err(CollectionError::ConfigInvalid { .. })
        ));
    }
}
