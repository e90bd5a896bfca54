// src/api/omeka.rs
//! The client a harvest run owns from start to finish.
//!
//! `OmekaClient` builds and holds the connection pool, the cache, the rate
//! limiter and the request bound. Nothing here is global: dropping or
//! closing the client releases every session it opened.

use super::cache::{CacheStats, CacheStore};
use super::client::OmekaHttpClient;
use super::collector::{BulkCollector, FailurePolicy};
use super::connection_pool::{ConnectionPool, PoolStats};
use super::categories::Category;
use super::fetcher::{ApiFetcher, FetchStats};
use super::pagination::PaginatedFetcher;
use super::rate_limit::RateLimiter;
use super::types::{Listing, ListingQuery};
use super::Transport;
use crate::config::HarvestConfig;
use crate::error::{AppError, FetchError};
use crate::model::Record;
use crate::types::RecordId;
use std::sync::Arc;

/// Counters from every layer, for `--profile` output.
#[derive(Debug)]
pub struct ClientReport {
    pub fetch: FetchStats,
    pub cache: Option<CacheStats>,
    pub pool: PoolStats,
}

pub struct OmekaClient {
    pool: Arc<ConnectionPool>,
    fetcher: Arc<ApiFetcher>,
    pager: PaginatedFetcher,
}

impl OmekaClient {
    /// Opens the cache (when enabled) and prepares the HTTP stack.
    pub async fn connect(config: &HarvestConfig) -> Result<Self, AppError> {
        let pool = Arc::new(ConnectionPool::new(config.pool_config()));
        let http = OmekaHttpClient::new(
            config.base_url.clone(),
            config.credentials.clone(),
            Arc::clone(&pool),
        );

        let cache = if config.cache.enabled {
            let store = CacheStore::open(&config.cache.dir, config.cache.ttl)
                .await
                .map_err(|e| AppError::InternalError {
                    message: format!(
                        "Failed to initialize cache at {}: {}",
                        config.cache.dir.display(),
                        e
                    ),
                    source: Some(Box::new(e)),
                })?;
            if config.cache.refresh {
                store.clear().await;
            }
            log::info!(
                "Cache enabled at {} (TTL: {}s)",
                config.cache.dir.display(),
                config.cache.ttl.as_secs()
            );
            Some(Arc::new(store))
        } else {
            log::info!("Cache disabled, all requests go to the Omeka S API");
            None
        };

        Ok(Self::from_parts(pool, Arc::new(http), cache, config))
    }

    /// Assembles a client around any transport.
    pub fn from_parts(
        pool: Arc<ConnectionPool>,
        transport: Arc<dyn Transport>,
        cache: Option<Arc<CacheStore>>,
        config: &HarvestConfig,
    ) -> Self {
        let fetcher = Arc::new(
            ApiFetcher::new(transport)
                .with_cache(cache)
                .with_rate_limiter(Arc::new(RateLimiter::new(config.min_interval)))
                .with_retry_policy(config.retry_policy())
                .with_max_concurrent(config.max_concurrent),
        );
        let pager = PaginatedFetcher::new(Arc::clone(&fetcher), config.pagination);
        Self {
            pool,
            fetcher,
            pager,
        }
    }

    /// Every record of one listing.
    pub async fn list(&self, query: &ListingQuery) -> Result<Listing, FetchError> {
        self.pager.fetch_all(query, None).await
    }

    pub async fn item(&self, id: RecordId) -> Result<Record, FetchError> {
        self.fetcher.fetch_resource("items", id).await
    }

    pub async fn item_set(&self, id: RecordId) -> Result<Record, FetchError> {
        self.fetcher.fetch_resource("item_sets", id).await
    }

    pub async fn media(&self, id: RecordId) -> Result<Record, FetchError> {
        self.fetcher.fetch_resource("media", id).await
    }

    pub fn collector(&self, categories: Vec<Category>, policy: FailurePolicy) -> BulkCollector {
        BulkCollector::new(self.pager.clone(), categories).with_policy(policy)
    }

    pub fn report(&self) -> ClientReport {
        ClientReport {
            fetch: self.fetcher.stats(),
            cache: self.fetcher.cache().map(|cache| cache.stats()),
            pool: self.pool.stats(),
        }
    }

    /// Closes every pooled session. Safe to call more than once.
    pub fn close(&self) {
        self.pool.close_all();
    }
}
