// src/api/mod.rs
//! Omeka S API interaction: the ability to harvest records from a
//! digital-library instance.
//!
//! Layers, bottom-up: a pooled HTTP [`Transport`], the [`ApiFetcher`] that
//! adds caching, pacing and retries, the [`PaginatedFetcher`] that walks
//! listings, and the [`BulkCollector`] that runs every category at once.

pub mod cache;
pub mod categories;
pub mod client;
mod collector;
pub mod connection_pool;
mod fetcher;
mod omeka;
mod pagination;
pub mod parser;
mod rate_limit;
mod types;

use crate::error::FetchError;

/// The ability to send one GET to the API.
///
/// Everything above this seam depends on the trait, never on HTTP details.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse, FetchError>;
}

// Re-export the public interface
pub use cache::{CacheStats, CacheStore};
pub use categories::Category;
pub use client::OmekaHttpClient;
pub use collector::{BulkCollector, FailurePolicy};
pub use connection_pool::{ConnectionHandle, ConnectionPool, PoolConfig};
pub use fetcher::{ApiFetcher, FetchStats};
pub use omeka::{ClientReport, OmekaClient};
pub use pagination::PaginatedFetcher;
pub use rate_limit::RateLimiter;
pub use types::{ApiRequest, ApiResponse, Listing, ListingQuery, PaginationOptions};
