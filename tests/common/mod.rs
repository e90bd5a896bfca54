// tests/common/mod.rs
//! Shared helpers for tests that talk to a mock Omeka S server.

#![allow(dead_code)]

use clap::Parser;
use omeka_harvest::{
    ApiFetcher, BaseUrl, CommandLineInput, ConnectionPool, Credentials, HarvestConfig,
    OmekaHttpClient, RetryPolicy,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const KEY_IDENTITY: &str = "test-identity";
pub const KEY_CREDENTIAL: &str = "test-credential";

pub fn base_url(server: &MockServer) -> BaseUrl {
    BaseUrl::parse(&format!("{}/api", server.uri())).unwrap()
}

pub fn http_client(server: &MockServer) -> OmekaHttpClient {
    OmekaHttpClient::new(
        base_url(server),
        Credentials::new(KEY_IDENTITY, KEY_CREDENTIAL).unwrap(),
        Arc::new(ConnectionPool::default()),
    )
}

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::from_millis(5))
        .with_jitter(false)
}

/// An `ApiFetcher` over real HTTP with quick retries and no pacing.
pub fn fetcher(server: &MockServer, max_attempts: u32) -> ApiFetcher {
    ApiFetcher::new(Arc::new(http_client(server)))
        .with_rate_limiter(Arc::new(omeka_harvest::RateLimiter::new(Duration::ZERO)))
        .with_retry_policy(fast_retry(max_attempts))
}

/// Resolves a configuration pointing at `server`, as the binary would.
pub fn config(server: &MockServer, output_dir: &Path, extra: &[&str]) -> HarvestConfig {
    let mut args = vec![
        "omeka-harvest".to_string(),
        "--min-interval-ms".to_string(),
        "0".to_string(),
        "--quiet".to_string(),
        "-o".to_string(),
        output_dir.display().to_string(),
    ];
    args.extend(extra.iter().map(|arg| arg.to_string()));
    let cli = CommandLineInput::parse_from(args);

    let env: HashMap<&str, String> = HashMap::from([
        ("OMEKA_BASE_URL", format!("{}/api", server.uri())),
        ("OMEKA_KEY_IDENTITY", KEY_IDENTITY.to_string()),
        ("OMEKA_KEY_CREDENTIAL", KEY_CREDENTIAL.to_string()),
    ]);
    HarvestConfig::resolve_with(cli, |name| env.get(name).cloned(), || false).unwrap()
}
