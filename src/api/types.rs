// src/api/types.rs
//! Type definitions for the Omeka S API module.
//!
//! Requests never carry credentials; the transport adds them at send time.
//! That keeps cache keys, log lines and error messages free of secrets.

use crate::constants::{DEFAULT_PAGE_BATCH_SIZE, MAX_PAGES_PER_LISTING, OMEKA_PAGE_SIZE};
use crate::model::Record;
use crate::types::{RecordId, RequestKey, ResourceClassId};
use serde_json::Value;
use std::fmt;

// --- Requests and responses ---

/// One GET against the API: endpoint plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_matches('/').to_string(),
            params: Vec::new(),
        }
    }

    /// Single resource such as `items/42`.
    pub fn resource(endpoint: &str, id: RecordId) -> Self {
        Self::new(format!("{}/{}", endpoint.trim_matches('/'), id))
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// The `page` parameter, when this request is one page of a listing.
    pub fn page(&self) -> Option<u32> {
        self.params
            .iter()
            .find(|(name, _)| name == "page")
            .and_then(|(_, value)| value.parse().ok())
    }

    pub fn cache_key(&self) -> RequestKey {
        RequestKey::new(&self.endpoint, &self.params)
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}

/// Decoded JSON payload of one successful request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub payload: Value,
    /// `Omeka-S-Total-Results`, when the server reported it.
    pub total_results: Option<u64>,
    pub from_cache: bool,
}

// --- Listings ---

/// A listing endpoint with its filters, independent of paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub endpoint: String,
    pub resource_class_id: Option<ResourceClassId>,
    pub item_set_id: Option<RecordId>,
    /// Drop records whose `o:is_public` is false.
    pub public_only: bool,
}

impl ListingQuery {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            resource_class_id: None,
            item_set_id: None,
            public_only: false,
        }
    }

    /// `items?resource_class_id=<id>`.
    pub fn items_of_class(class_id: u32) -> Self {
        Self::new("items").with_resource_class(ResourceClassId::new(class_id))
    }

    pub fn with_resource_class(mut self, class_id: ResourceClassId) -> Self {
        self.resource_class_id = Some(class_id);
        self
    }

    pub fn with_item_set(mut self, item_set_id: RecordId) -> Self {
        self.item_set_id = Some(item_set_id);
        self
    }

    pub fn public_only(mut self) -> Self {
        self.public_only = true;
        self
    }

    pub fn page_request(&self, page: u32, per_page: u32) -> ApiRequest {
        let mut request = ApiRequest::new(self.endpoint.as_str());
        if let Some(class_id) = self.resource_class_id {
            request = request.param("resource_class_id", class_id);
        }
        if let Some(item_set_id) = self.item_set_id {
            request = request.param("item_set_id", item_set_id);
        }
        request.param("page", page).param("per_page", per_page)
    }
}

impl fmt::Display for ListingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)?;
        if let Some(class_id) = self.resource_class_id {
            write!(f, "[class {}]", class_id)?;
        }
        if let Some(item_set_id) = self.item_set_id {
            write!(f, "[set {}]", item_set_id)?;
        }
        Ok(())
    }
}

/// Paging knobs shared by every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOptions {
    pub page_size: u32,
    /// Pages requested concurrently after the first; 1 means sequential.
    pub batch_size: u32,
    pub max_pages: u32,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            page_size: OMEKA_PAGE_SIZE,
            batch_size: DEFAULT_PAGE_BATCH_SIZE,
            max_pages: MAX_PAGES_PER_LISTING,
        }
    }
}

/// Everything a listing produced, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub records: Vec<Record>,
    pub pages_fetched: u32,
    pub total_hint: Option<u64>,
    pub duplicates_dropped: usize,
    pub hidden_dropped: usize,
    /// True when `max_pages` stopped the walk before a short page.
    pub truncated: bool,
}
