// src/api/client.rs
//! Thin HTTP client for the Omeka S REST API.
//!
//! It knows how to build an authenticated URL and send it through a pooled
//! connection. Caching, pacing and retries live one layer up, in
//! [`ApiFetcher`](super::ApiFetcher).

use super::connection_pool::ConnectionPool;
use super::parser;
use super::types::{ApiRequest, ApiResponse};
use super::Transport;
use crate::constants::DEFAULT_POOL_KEY;
use crate::error::FetchError;
use crate::types::{BaseUrl, Credentials};
use std::sync::Arc;
use url::Url;

/// Sends authenticated GETs through a shared [`ConnectionPool`].
#[derive(Clone)]
pub struct OmekaHttpClient {
    base_url: BaseUrl,
    credentials: Credentials,
    pool: Arc<ConnectionPool>,
    pool_key: String,
}

impl OmekaHttpClient {
    pub fn new(base_url: BaseUrl, credentials: Credentials, pool: Arc<ConnectionPool>) -> Self {
        Self {
            base_url,
            credentials,
            pool,
            pool_key: DEFAULT_POOL_KEY.to_string(),
        }
    }

    /// Routes requests through a different pool entry.
    pub fn with_pool_key(mut self, pool_key: impl Into<String>) -> Self {
        self.pool_key = pool_key.into();
        self
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Full URL including credentials. Never log the result.
    fn request_url(&self, request: &ApiRequest) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(request.endpoint())
            .map_err(|e| FetchError::ClientSetup {
                reason: e.to_string(),
            })?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in self.credentials.as_query() {
                query.append_pair(name, value);
            }
            for (name, value) in request.params() {
                query.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Transport for OmekaHttpClient {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse, FetchError> {
        let label = request.to_string();
        let url = self.request_url(request)?;
        let connection = self.pool.get_connection(&self.pool_key)?;

        log::debug!("GET {}/{}", self.base_url, label);
        let raw = connection.fetch(url, &label).await?;
        parser::parse_response(raw, &label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OmekaHttpClient {
        OmekaHttpClient::new(
            BaseUrl::parse("https://islam.zmo.de/api").unwrap(),
            Credentials::new("ident", "secret").unwrap(),
            Arc::new(ConnectionPool::default()),
        )
    }

    #[test]
    fn test_request_url_appends_credentials_then_params() {
        let request = ApiRequest::new("items")
            .param("resource_class_id", 49)
            .param("page", 2);
        let url = client().request_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://islam.zmo.de/api/items?key_identity=ident&key_credential=secret&resource_class_id=49&page=2"
        );
    }

    #[test]
    fn test_label_has_no_credentials() {
        let request = ApiRequest::new("items").param("page", 1);
        assert_eq!(request.to_string(), "items?page=1");
    }

    #[tokio::test]
    async fn test_get_after_pool_close_fails() {
        let client = client();
        client.pool().close_all();
        let err = client.get(&ApiRequest::new("items")).await.unwrap_err();
        assert_eq!(err, FetchError::PoolClosed);
    }
}
