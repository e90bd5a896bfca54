// src/api/connection_pool.rs
//! Connection pooling for efficient HTTP client usage.
//!
//! The pool owns every `reqwest::Client` the harvester uses. Handles are
//! created lazily per pool key and live until `close_all`, which the owner
//! calls exactly once at shutdown. There is no process-wide pool: whoever
//! builds a `ConnectionPool` controls its lifetime.

use crate::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_POOL_KEY, POOL_IDLE_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS,
    TOTAL_RESULTS_HEADER,
};
use crate::error::FetchError;
use health::{HealthMetrics, HealthStats};
use parking_lot::Mutex;
use reqwest::{Client, ClientBuilder};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use url::Url;

/// Connection pool configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Maximum distinct handles (one `reqwest::Client` each)
    pub max_handles: usize,
    /// Maximum in-flight requests per destination host, per handle
    pub max_per_host: usize,
    /// Maximum in-flight requests across the whole pool
    pub max_total: usize,
    /// Maximum idle connections kept per host
    pub max_idle_per_host: usize,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout, body included
    pub request_timeout: Duration,
    /// Idle connection timeout
    pub idle_timeout: Duration,
    /// Enable connection keep-alive
    pub tcp_keepalive: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_handles: 4,
            max_per_host: 10,
            max_total: 100,
            max_idle_per_host: 10,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(POOL_IDLE_TIMEOUT_SECS),
            tcp_keepalive: Some(Duration::from_secs(60)),
        }
    }
}

/// What came back from one GET, before any JSON decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Parsed `Omeka-S-Total-Results` header, when the server sends one.
    pub total_results: Option<u64>,
    pub body: Vec<u8>,
}

struct HandleInner {
    key: String,
    client: Client,
    max_per_host: usize,
    per_host: Mutex<HashMap<String, Arc<Semaphore>>>,
    total: Arc<Semaphore>,
    closed: AtomicBool,
    metrics: Arc<HealthMetrics>,
}

/// A pooled client plus the permits that bound its in-flight requests.
///
/// Cloning is cheap and every clone refers to the same session.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("key", &self.inner.key)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ConnectionHandle {
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Whether both handles share one underlying session.
    pub fn same_as(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Issues a GET and reads the whole body while holding both permits.
    ///
    /// `label` is the credential-free description used in errors.
    pub async fn fetch(&self, url: Url, label: &str) -> Result<RawResponse, FetchError> {
        if self.is_closed() {
            return Err(FetchError::PoolClosed);
        }

        let _total_permit = Arc::clone(&self.inner.total)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::PoolClosed)?;
        let _host_permit = self
            .host_permits(url.host_str().unwrap_or_default())
            .acquire_owned()
            .await
            .map_err(|_| FetchError::PoolClosed)?;
        if self.is_closed() {
            return Err(FetchError::PoolClosed);
        }

        let started = Instant::now();
        let result = self.send(url, label).await;
        match &result {
            Ok(_) => self
                .inner
                .metrics
                .record_success(started.elapsed().as_millis() as u64),
            Err(FetchError::Transient { status: None, .. }) => {
                self.inner.metrics.record_connection_error();
                self.inner.metrics.record_failure();
            }
            Err(_) => self.inner.metrics.record_failure(),
        }
        result
    }

    async fn send(&self, url: Url, label: &str) -> Result<RawResponse, FetchError> {
        let response = self
            .inner
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_transport(label, e))?;

        let status = response.status().as_u16();
        let total_results = response
            .headers()
            .get(TOTAL_RESULTS_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_transport(label, e))?
            .to_vec();

        Ok(RawResponse {
            status,
            total_results,
            body,
        })
    }

    fn host_permits(&self, host: &str) -> Arc<Semaphore> {
        let mut per_host = self.inner.per_host.lock();
        Arc::clone(
            per_host
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.inner.max_per_host))),
        )
    }

    fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for permits in self.inner.per_host.lock().values() {
            permits.close();
        }
        log::debug!("Closed connection handle '{}'", self.inner.key);
    }
}

/// Pool statistics
#[derive(Debug)]
pub struct PoolStats {
    pub open_handles: usize,
    pub closed: bool,
    pub health: HealthStats,
}

/// Owner of every HTTP session the harvester opens.
pub struct ConnectionPool {
    config: PoolConfig,
    handles: Mutex<HashMap<String, ConnectionHandle>>,
    total: Arc<Semaphore>,
    metrics: Arc<HealthMetrics>,
    closed: AtomicBool,
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        let total = Arc::new(Semaphore::new(config.max_total.max(1)));
        Self {
            config,
            handles: Mutex::new(HashMap::new()),
            total,
            metrics: Arc::new(HealthMetrics::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Build a client with the given configuration
    fn build_client(config: &PoolConfig) -> Result<Client, reqwest::Error> {
        let mut builder = ClientBuilder::new()
            .user_agent(concat!("omeka-harvest/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_idle_timeout(config.idle_timeout);

        if let Some(keepalive) = config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        builder.build()
    }

    /// Returns the handle for `key`, creating it on first use.
    pub fn get_connection(&self, key: &str) -> Result<ConnectionHandle, FetchError> {
        if self.is_closed() {
            return Err(FetchError::PoolClosed);
        }

        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(key) {
            return Ok(handle.clone());
        }
        if handles.len() >= self.config.max_handles {
            return Err(FetchError::ClientSetup {
                reason: format!(
                    "connection pool is limited to {} handles",
                    self.config.max_handles
                ),
            });
        }

        let client = Self::build_client(&self.config).map_err(|e| FetchError::ClientSetup {
            reason: e.to_string(),
        })?;
        let handle = ConnectionHandle {
            inner: Arc::new(HandleInner {
                key: key.to_string(),
                client,
                max_per_host: self.config.max_per_host.max(1),
                per_host: Mutex::new(HashMap::new()),
                total: Arc::clone(&self.total),
                closed: AtomicBool::new(false),
                metrics: Arc::clone(&self.metrics),
            }),
        };
        handles.insert(key.to_string(), handle.clone());
        log::debug!("Opened connection handle '{}'", key);
        Ok(handle)
    }

    /// The handle under [`DEFAULT_POOL_KEY`].
    pub fn default_connection(&self) -> Result<ConnectionHandle, FetchError> {
        self.get_connection(DEFAULT_POOL_KEY)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes every handle. Safe to call more than once.
    pub fn close_all(&self) {
        let was_closed = self.closed.swap(true, Ordering::AcqRel);
        let drained: Vec<ConnectionHandle> =
            self.handles.lock().drain().map(|(_, handle)| handle).collect();
        for handle in &drained {
            handle.close();
        }
        self.total.close();
        if !was_closed {
            log::debug!("Connection pool closed ({} handle(s))", drained.len());
        }
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            open_handles: self.handles.lock().len(),
            closed: self.is_closed(),
            health: self.metrics.get_stats(),
        }
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        if !self.is_closed() {
            log::debug!("Connection pool dropped without close_all; closing now");
            self.close_all();
        }
    }
}

/// Connection health monitoring
pub mod health {
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Health metrics for connection monitoring
    #[derive(Debug, Default)]
    pub struct HealthMetrics {
        successful_requests: AtomicU64,
        failed_requests: AtomicU64,
        total_latency_ms: AtomicU64,
        connection_errors: AtomicU64,
    }

    impl HealthMetrics {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn record_success(&self, latency_ms: u64) {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
            self.total_latency_ms
                .fetch_add(latency_ms, Ordering::Relaxed);
        }

        pub fn record_failure(&self) {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }

        pub fn record_connection_error(&self) {
            self.connection_errors.fetch_add(1, Ordering::Relaxed);
        }

        pub fn get_stats(&self) -> HealthStats {
            let successful = self.successful_requests.load(Ordering::Relaxed);
            let failed = self.failed_requests.load(Ordering::Relaxed);
            let total_latency = self.total_latency_ms.load(Ordering::Relaxed);
            let connection_errors = self.connection_errors.load(Ordering::Relaxed);

            let avg_latency = total_latency.checked_div(successful).unwrap_or(0);

            HealthStats {
                successful_requests: successful,
                failed_requests: failed,
                average_latency_ms: avg_latency,
                connection_errors,
                success_rate: if successful + failed > 0 {
                    (successful as f64) / ((successful + failed) as f64)
                } else {
                    0.0
                },
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct HealthStats {
        pub successful_requests: u64,
        pub failed_requests: u64,
        pub average_latency_ms: u64,
        pub connection_errors: u64,
        pub success_rate: f64,
    }
}
