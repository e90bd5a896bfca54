// src/api/fetcher.rs
//! The single path every request takes.
//!
//! Every fetch runs: cache lookup, global concurrency permit, then retries of
//! { rate-limiter wait, transport GET }, then decoding, then a cache write.
//! Cache hits skip everything after the lookup, rate budget included. Only
//! payloads that decoded cleanly reach the cache.

use super::cache::CacheStore;
use super::parser;
use super::rate_limit::RateLimiter;
use super::types::{ApiRequest, ApiResponse};
use super::Transport;
use crate::constants::DEFAULT_MAX_CONCURRENT_REQUESTS;
use crate::error::FetchError;
use crate::error_recovery::RetryPolicy;
use crate::model::Record;
use crate::types::RecordId;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Request counters, reported when profiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub network_attempts: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    network_attempts: AtomicU64,
    failures: AtomicU64,
}

pub struct ApiFetcher {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<CacheStore>>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
    counters: Counters,
}

impl ApiFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: None,
            limiter: Arc::new(RateLimiter::default()),
            retry: RetryPolicy::default(),
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_REQUESTS)),
            counters: Counters::default(),
        }
    }

    pub fn with_cache(mut self, cache: Option<Arc<CacheStore>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Upper bound on simultaneous network requests through this fetcher.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
        self
    }

    pub fn cache(&self) -> Option<&Arc<CacheStore>> {
        self.cache.as_ref()
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            network_attempts: self.counters.network_attempts.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Raw JSON for any request. Every well-formed payload is cacheable.
    pub async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse, FetchError> {
        let decoded = self.fetch_decoded(request, |payload, _| Ok(payload)).await?;
        Ok(ApiResponse {
            payload: decoded.value,
            total_results: decoded.total_results,
            from_cache: decoded.from_cache,
        })
    }

    /// One listing page decoded into records, plus the total-count hint.
    pub async fn fetch_page(
        &self,
        request: &ApiRequest,
    ) -> Result<(Vec<Record>, Option<u64>), FetchError> {
        let decoded = self.fetch_decoded(request, parser::parse_listing).await?;
        Ok((decoded.value, decoded.total_results))
    }

    /// A single resource such as `items/42`.
    pub async fn fetch_resource(&self, endpoint: &str, id: RecordId) -> Result<Record, FetchError> {
        let request = ApiRequest::resource(endpoint, id);
        let decoded = self.fetch_decoded(&request, parser::parse_resource).await?;
        Ok(decoded.value)
    }

    /// Cache lookup, then network. A payload is written to the cache only
    /// once `decode` has accepted it, and a cached payload that `decode`
    /// rejects counts as a miss.
    async fn fetch_decoded<T, D>(
        &self,
        request: &ApiRequest,
        decode: D,
    ) -> Result<Decoded<T>, FetchError>
    where
        D: Fn(Value, &str) -> Result<T, FetchError>,
    {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        let key = request.cache_key();
        let label = request.to_string();

        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.get(&key).await {
                match decode(payload, &label) {
                    Ok(value) => {
                        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                        return Ok(Decoded {
                            value,
                            total_results: None,
                            from_cache: true,
                        });
                    }
                    Err(e) => log::warn!("Ignoring unusable cache entry for {}: {}", label, e),
                }
            }
        }

        let outcome = match self.send(request).await {
            Ok(response) => {
                let keep = self.cache.as_ref().map(|_| response.payload.clone());
                decode(response.payload, &label).map(|value| (value, response.total_results, keep))
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok((value, total_results, keep)) => {
                if let (Some(cache), Some(payload)) = (&self.cache, keep) {
                    cache.set(&key, &payload).await;
                }
                Ok(Decoded {
                    value,
                    total_results,
                    from_cache: false,
                })
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Permit, then retries of { rate-limiter wait, transport GET }.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::PoolClosed)?;

        self.retry
            .run(|attempt| {
                let limiter = &self.limiter;
                let transport = &self.transport;
                let counters = &self.counters;
                async move {
                    if attempt > 1 {
                        log::debug!("Retrying {} (attempt {})", request, attempt);
                    }
                    limiter.acquire().await;
                    counters.network_attempts.fetch_add(1, Ordering::Relaxed);
                    transport.get(request).await
                }
            })
            .await
    }
}

struct Decoded<T> {
    value: T,
    total_results: Option<u64>,
    from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::StubTransport;
    use serde_json::json;
    use std::time::Duration;
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
    use tempfile::TempDir;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(max_attempts)
            .with_base_delay(Duration::from_millis(10))
            .with_jitter(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_then_succeed() {
        let stub = Arc::new(
            StubTransport::new(|_| Ok(json!([{"o:id": 1}]))).failing_first(2),
        );
        let fetcher = ApiFetcher::new(stub.clone()).with_retry_policy(fast_retry(3));

        let (records, _) = fetcher
            .fetch_page(&ApiRequest::new("items").param("page", 1))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(stub.calls(), 3);
        assert_eq!(fetcher.stats().network_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let stub = Arc::new(StubTransport::new(|_| Ok(json!([]))).failing_first(10));
        let fetcher = ApiFetcher::new(stub.clone()).with_retry_policy(fast_retry(3));

        let err = fetcher.fetch(&ApiRequest::new("items")).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(stub.calls(), 3);
        assert_eq!(fetcher.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_transport() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(
            CacheStore::open(dir.path(), Duration::from_secs(3600))
                .await
                .unwrap(),
        );
        let stub = Arc::new(StubTransport::new(|_| Ok(json!([{"o:id": 7}]))));
        let fetcher = ApiFetcher::new(stub.clone())
            .with_cache(Some(cache))
            .with_rate_limiter(Arc::new(RateLimiter::new(Duration::ZERO)));
        let request = ApiRequest::new("items").param("page", 1);

        let first = fetcher.fetch(&request).await.unwrap();
        let second = fetcher.fetch(&request).await.unwrap();
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.payload, second.payload);
        assert_eq!(stub.calls(), 1);
        assert_eq!(fetcher.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_fetch_resource_decodes_object() {
        let stub = Arc::new(StubTransport::new(|request| {
            assert_eq!(request.endpoint(), "item_sets/12");
            Ok(json!({"o:id": 12, "o:title": "Niger"}))
        }));
        let fetcher = ApiFetcher::new(stub);
        let record = fetcher
            .fetch_resource("item_sets", RecordId::new(12))
            .await
            .unwrap();
        assert_eq!(record.title(), Some("Niger"));
    }

    #[tokio::test]
    async fn test_malformed_listing_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(
            CacheStore::open(dir.path(), Duration::from_secs(3600))
                .await
                .unwrap(),
        );
        let recovered = AtomicBool::new(false);
        let stub = Arc::new(StubTransport::new(move |_| {
            if recovered.swap(true, AtomicOrdering::SeqCst) {
                Ok(json!([{"o:id": 1}]))
            } else {
                Ok(json!({"errors": {"error": "Site under maintenance"}}))
            }
        }));
        let fetcher = ApiFetcher::new(stub.clone())
            .with_cache(Some(cache))
            .with_rate_limiter(Arc::new(RateLimiter::new(Duration::ZERO)));
        let request = ApiRequest::new("items").param("page", 1);

        let err = fetcher.fetch_page(&request).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));

        let (records, _) = fetcher.fetch_page(&request).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(stub.calls(), 2);

        // The good page is cached now
        fetcher.fetch_page(&request).await.unwrap();
        assert_eq!(stub.calls(), 2);
        assert_eq!(fetcher.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_unusable_cache_entry_is_refetched() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(
            CacheStore::open(dir.path(), Duration::from_secs(3600))
                .await
                .unwrap(),
        );
        let request = ApiRequest::new("items").param("page", 1);
        cache
            .set(&request.cache_key(), &json!({"errors": "stale"}))
            .await;

        let stub = Arc::new(StubTransport::new(|_| Ok(json!([{"o:id": 3}]))));
        let fetcher = ApiFetcher::new(stub.clone())
            .with_cache(Some(Arc::clone(&cache)))
            .with_rate_limiter(Arc::new(RateLimiter::new(Duration::ZERO)));

        let (records, _) = fetcher.fetch_page(&request).await.unwrap();
        assert_eq!(records[0].id(), Some(RecordId::new(3)));
        assert_eq!(stub.calls(), 1);
        assert_eq!(cache.get(&request.cache_key()).await, Some(json!([{"o:id": 3}])));
    }
}
