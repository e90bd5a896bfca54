// src/types/domain_types.rs
//! Domain-specific newtypes for type safety and validation.

use super::ValidationError;
use std::fmt;
use url::Url;

/// Omeka S API key pair.
///
/// Both halves travel as query parameters on every request, so the pair is
/// kept out of `Display`/`Debug` output entirely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identity: String,
    credential: String,
}

impl Credentials {
    /// Create a key pair, rejecting empty or whitespace-padded halves.
    pub fn new(
        identity: impl Into<String>,
        credential: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let identity = identity.into();
        let credential = credential.into();

        if identity.is_empty() {
            return Err(ValidationError::EmptyField("key_identity"));
        }
        if credential.is_empty() {
            return Err(ValidationError::EmptyField("key_credential"));
        }
        if identity.trim() != identity || credential.trim() != credential {
            return Err(ValidationError::InvalidCredentials {
                reason: "keys must not contain leading or trailing whitespace".to_string(),
            });
        }

        Ok(Self {
            identity,
            credential,
        })
    }

    /// Query parameters in the order Omeka S documents them.
    pub fn as_query(&self) -> [(&'static str, &str); 2] {
        [
            ("key_identity", self.identity.as_str()),
            ("key_credential", self.credential.as_str()),
        ]
    }

    fn redacted_identity(&self) -> String {
        let prefix: String = self.identity.chars().take(4).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Redact both halves in display
        write!(f, "{}", self.redacted_identity())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.redacted_identity())
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Validated API root such as `https://islam.zmo.de/api`.
///
/// Stored without a trailing slash so endpoints join predictably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(Url);

impl BaseUrl {
    pub fn parse(url: &str) -> Result<Self, ValidationError> {
        let trimmed = url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField("base_url"));
        }

        let parsed = Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: "Only HTTP and HTTPS URLs are supported".to_string(),
            });
        }
        if parsed.query().is_some() {
            return Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: "Base URL must not carry a query string".to_string(),
            });
        }

        Ok(Self(parsed))
    }

    /// Resolves `endpoint` (e.g. `items` or `items/42`) under the API root.
    pub fn join(&self, endpoint: &str) -> Result<Url, ValidationError> {
        let joined = format!(
            "{}/{}",
            self.0.as_str().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| ValidationError::InvalidUrl {
            url: joined.clone(),
            reason: e.to_string(),
        })
    }

    /// Host name used as the per-destination key in the connection pool.
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str().trim_end_matches('/')
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_reject_empty_halves() {
        assert_eq!(
            Credentials::new("", "secret"),
            Err(ValidationError::EmptyField("key_identity"))
        );
        assert_eq!(
            Credentials::new("ident", ""),
            Err(ValidationError::EmptyField("key_credential"))
        );
        assert!(Credentials::new(" ident", "secret").is_err());
    }

    #[test]
    fn test_credentials_never_print_the_secret() {
        let creds = Credentials::new("abcdef123456", "topsecretvalue").unwrap();
        let shown = format!("{} {:?}", creds, creds);
        assert!(!shown.contains("topsecretvalue"));
        assert!(!shown.contains("abcdef123456"));
        assert!(shown.contains("abcd..."));
    }

    #[test]
    fn test_base_url_join_strips_slashes() {
        let base = BaseUrl::parse("https://islam.zmo.de/api/").unwrap();
        assert_eq!(base.as_str(), "https://islam.zmo.de/api");
        assert_eq!(
            base.join("/items").unwrap().as_str(),
            "https://islam.zmo.de/api/items"
        );
        assert_eq!(base.host(), "islam.zmo.de");
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        assert!(matches!(
            BaseUrl::parse("ftp://example.com/api"),
            Err(ValidationError::InvalidUrl { .. })
        ));
        assert!(matches!(
            BaseUrl::parse("   "),
            Err(ValidationError::EmptyField("base_url"))
        ));
    }
}
