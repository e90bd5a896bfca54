// src/lib.rs
//! omeka-harvest library: harvests item records from an Omeka S instance.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `FetchError`, `ValidationError`
//! - **Configuration**: `CommandLineInput`, `HarvestConfig`
//! - **Domain model**: `Record`, `Harvest`, `Bucket`
//! - **Domain types**: `BaseUrl`, `Credentials`, `RecordId`, `RequestKey`
//! - **API client**: `OmekaClient`, `ApiFetcher`, `PaginatedFetcher`, `BulkCollector`
//! - **Output**: `RecordMapper`, `export`, `write_partial`

pub mod analytics;
pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod error_recovery;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, FetchError, Result};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CacheSettings, CommandLineInput, HarvestConfig};

// --- Domain Model ---
pub use crate::model::{Bucket, Harvest, Record};

// --- Domain Types ---
pub use crate::types::{BaseUrl, Credentials, RecordId, RequestKey, ResourceClassId};

// --- API Client ---
pub use crate::api::{
    ApiFetcher, ApiRequest, ApiResponse, BulkCollector, CacheStore, Category, ConnectionPool,
    FailurePolicy, Listing, ListingQuery, OmekaClient, OmekaHttpClient, PaginatedFetcher,
    PaginationOptions, RateLimiter, Transport,
};
pub use crate::error_recovery::RetryPolicy;

// --- Output ---
pub use crate::output::{export, write_partial, ExportReport, PassThroughMapper, RecordMapper};

// --- Statistics ---
pub use crate::analytics::{measure_harvest, HarvestStats};

// --- Pipeline Traits ---
pub use crate::pipeline::{RecordExporter, RecordSource};
