// src/config.rs
use crate::api::categories::{self, Category};
use crate::api::connection_pool::PoolConfig;
use crate::api::{FailurePolicy, PaginationOptions};
use crate::api::cache::CacheStore;
use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DEFAULT_MIN_REQUEST_INTERVAL_MS, DEFAULT_PAGE_BATCH_SIZE, MAX_PAGES_PER_LISTING,
    OMEKA_PAGE_SIZE,
};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::types::{BaseUrl, Credentials, ValidationError};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "OMEKA_BASE_URL";
pub const ENV_KEY_IDENTITY: &str = "OMEKA_KEY_IDENTITY";
pub const ENV_KEY_CREDENTIAL: &str = "OMEKA_KEY_CREDENTIAL";

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Use cached API responses without asking
    #[arg(long, conflicts_with = "no_cache")]
    pub cache: bool,

    /// Disable response caching (always fetch fresh data)
    #[arg(long)]
    pub no_cache: bool,

    /// Clear the cache before harvesting
    #[arg(long)]
    pub refresh_cache: bool,

    /// Cache directory (default: $XDG_CACHE_HOME/omeka-harvest)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Cache TTL in seconds
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl: u64,

    /// Log timings and request/cache statistics
    #[arg(long)]
    pub profile: bool,

    /// Maximum simultaneous API requests
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_REQUESTS)]
    pub max_concurrent: usize,

    /// Records requested per page
    #[arg(long, default_value_t = OMEKA_PAGE_SIZE)]
    pub page_size: u32,

    /// Pages fetched concurrently once a listing spans several pages
    #[arg(long, default_value_t = DEFAULT_PAGE_BATCH_SIZE)]
    pub batch_size: u32,

    /// Minimum milliseconds between two outgoing requests
    #[arg(long, default_value_t = DEFAULT_MIN_REQUEST_INTERVAL_MS)]
    pub min_interval_ms: u64,

    /// Attempts per request before giving up, the first one included
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_retries: u32,

    /// Directory for exported files and the log file
    #[arg(short, long, default_value = "./output")]
    pub output_dir: PathBuf,

    /// Restrict the harvest to these categories or buckets (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Abort the whole harvest when one category fails
    #[arg(long)]
    pub fail_fast: bool,

    /// Hide progress bars
    #[arg(long)]
    pub quiet: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Cache behaviour for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub dir: PathBuf,
    pub ttl: Duration,
    /// Clear existing entries before harvesting.
    pub refresh: bool,
}

/// Resolved harvest configuration, validated and ready to drive a run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub base_url: BaseUrl,
    pub credentials: Credentials,
    pub cache: CacheSettings,
    pub max_concurrent: usize,
    pub pagination: PaginationOptions,
    pub min_interval: Duration,
    pub max_attempts: u32,
    pub output_dir: PathBuf,
    pub categories: Vec<Category>,
    pub failure_policy: FailurePolicy,
    pub profile: bool,
    pub show_progress: bool,
    pub verbose: bool,
}

impl HarvestConfig {
    /// Resolves a complete configuration from CLI input and the environment.
    ///
    /// Asks on the terminal whether to use the cache when neither `--cache`
    /// nor `--no-cache` was given.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        Self::resolve_with(cli, |name| std::env::var(name).ok(), prompt_cache_usage)
    }

    /// [`resolve`](Self::resolve) with the environment and the cache prompt
    /// supplied by the caller.
    pub fn resolve_with(
        cli: CommandLineInput,
        env: impl Fn(&str) -> Option<String>,
        ask_cache: impl FnOnce() -> bool,
    ) -> Result<Self, AppError> {
        let required = |name: &str| {
            env(name).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                AppError::MissingConfiguration(format!("{} environment variable not set", name))
            })
        };

        let base_url = BaseUrl::parse(&required(ENV_BASE_URL)?)?;
        let credentials =
            Credentials::new(required(ENV_KEY_IDENTITY)?, required(ENV_KEY_CREDENTIAL)?)?;

        let max_concurrent = bounded("max_concurrent", cli.max_concurrent as u64, 1, 100)? as usize;
        let page_size = bounded("page_size", u64::from(cli.page_size), 1, 1000)? as u32;
        let batch_size = bounded("batch_size", u64::from(cli.batch_size), 1, 50)? as u32;
        let max_attempts = bounded("max_retries", u64::from(cli.max_retries), 1, 10)? as u32;
        let categories = categories::select(&cli.categories)?;

        let enabled = if cli.no_cache {
            false
        } else if cli.cache {
            true
        } else {
            ask_cache()
        };

        Ok(Self {
            base_url,
            credentials,
            cache: CacheSettings {
                enabled,
                dir: cli.cache_dir.unwrap_or_else(CacheStore::default_cache_dir),
                ttl: Duration::from_secs(cli.cache_ttl),
                refresh: cli.refresh_cache,
            },
            max_concurrent,
            pagination: PaginationOptions {
                page_size,
                batch_size,
                max_pages: MAX_PAGES_PER_LISTING,
            },
            min_interval: Duration::from_millis(cli.min_interval_ms),
            max_attempts,
            output_dir: cli.output_dir,
            categories,
            failure_policy: if cli.fail_fast {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::FailSoft
            },
            profile: cli.profile,
            show_progress: !cli.quiet && std::io::stderr().is_terminal(),
            verbose: cli.verbose,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.max_attempts)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_per_host: self.max_concurrent,
            ..PoolConfig::default()
        }
    }
}

fn bounded(field: &'static str, value: u64, min: u64, max: u64) -> Result<u64, ValidationError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfBounds {
            field,
            value,
            min,
            max,
        })
    }
}

/// Asks whether to reuse cached responses; non-interactive runs use the cache.
fn prompt_cache_usage() -> bool {
    if !std::io::stdin().is_terminal() {
        return true;
    }
    dialoguer::Confirm::new()
        .with_prompt("Use cached API responses where available?")
        .default(true)
        .interact()
        .unwrap_or(true)
}
