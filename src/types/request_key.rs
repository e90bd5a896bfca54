// src/types/request_key.rs
//! Canonical request fingerprints.
//!
//! A key is `endpoint?k1=v1&k2=v2` with the parameters sorted by name and
//! then value, so two requests that differ only in parameter insertion order
//! share a cache entry. Credential parameters never take part in the key.

use crate::constants::AUTH_PARAMS;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new<K, V>(endpoint: &str, params: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .filter(|(k, _)| !AUTH_PARAMS.contains(k))
            .collect();
        pairs.sort_unstable();

        let endpoint = endpoint.trim_matches('/');
        if pairs.is_empty() {
            return Self(endpoint.to_string());
        }

        let query = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        Self(format!("{}?{}", endpoint, query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase hex SHA-256 of the canonical form; names the durable file.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

/// Free-form keys, used when callers manage their own naming.
impl From<&str> for RequestKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_ignores_parameter_order() {
        let a = RequestKey::new("items", &[("page", "2"), ("resource_class_id", "49")]);
        let b = RequestKey::new("items", &[("resource_class_id", "49"), ("page", "2")]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "items?page=2&resource_class_id=49");
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_key_excludes_credentials() {
        let with_auth = RequestKey::new(
            "items",
            &[("key_identity", "id"), ("page", "1"), ("key_credential", "c")],
        );
        assert_eq!(with_auth.as_str(), "items?page=1");
    }

    #[test]
    fn test_distinct_requests_have_distinct_digests() {
        let a = RequestKey::new("items", &[("page", "1")]);
        let b = RequestKey::new("items", &[("page", "2")]);
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_bare_endpoint_key() {
        let key = RequestKey::new::<&str, &str>("/item_sets/", &[]);
        assert_eq!(key.as_str(), "item_sets");
    }
}
