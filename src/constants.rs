// src/constants.rs
//! Domain constants that define the operational boundaries of the harvester.
//!
//! Each constant is named for the concept it constrains. Reading them top
//! to bottom tells you how the harvester talks to Omeka S: how much it asks
//! for per page, how hard it leans on the server, and how long it trusts
//! what it already has on disk.

// ---------------------------------------------------------------------------
// Omeka S API boundaries
// ---------------------------------------------------------------------------

/// How many records each listing page asks for.
///
/// Omeka S caps `per_page` by server configuration; 100 is the value the
/// collection scripts have always used.
pub const OMEKA_PAGE_SIZE: u32 = 100;

/// Response header some Omeka S deployments use to report the listing size.
pub const TOTAL_RESULTS_HEADER: &str = "Omeka-S-Total-Results";

/// Query parameters that carry the API credentials.
///
/// They are appended to every request but never part of a cache key.
pub const AUTH_PARAMS: [&str; 2] = ["key_identity", "key_credential"];

/// Upper bound on pages read from a single listing.
///
/// A listing that keeps returning full pages past this point is treated as
/// misbehaving rather than followed forever.
pub const MAX_PAGES_PER_LISTING: u32 = 10_000;

// ---------------------------------------------------------------------------
// Concurrency and pacing
// ---------------------------------------------------------------------------

/// Simultaneous in-flight requests across every category.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;

/// Pages requested together once the first page proves there is more data.
pub const DEFAULT_PAGE_BATCH_SIZE: u32 = 5;

/// Minimum spacing between two outgoing requests, in milliseconds.
pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 100;

/// Name of the connection pool entry used when callers do not pick one.
pub const DEFAULT_POOL_KEY: &str = "default";

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Attempts per request, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay before the second attempt; doubles for each attempt after that.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Ceiling on a single backoff sleep.
pub const MAX_RETRY_DELAY_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// How long a cached response is trusted: 24 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Entries mirrored in memory before the memory tier stops accepting more.
pub const MEMORY_CACHE_CAPACITY: usize = 1000;

/// Directory name under the user cache directory.
pub const CACHE_DIR_NAME: &str = "omeka-harvest";

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Total time budget for one HTTP request, body included.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Time budget for establishing a TCP/TLS connection.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// How long an idle pooled connection is kept open.
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing a malformed response body.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
