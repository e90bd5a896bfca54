// src/api/pagination.rs
//! Page-numbered listing traversal.
//!
//! Omeka S listings have no cursor and no "has more" flag: a page with fewer
//! records than `per_page` is the last one. Page 1 is always fetched alone.
//! If it is full, later pages go out in concurrent batches. A batch is capped
//! at the last page the total-count header predicts, and past that page the
//! walk continues one page at a time.

use super::fetcher::ApiFetcher;
use super::types::{Listing, ListingQuery, PaginationOptions};
use crate::error::FetchError;
use crate::model::Record;
use crate::types::RecordId;
use futures::future::try_join_all;
use indicatif::ProgressBar;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Walks listings through a shared [`ApiFetcher`].
#[derive(Clone)]
pub struct PaginatedFetcher {
    fetcher: Arc<ApiFetcher>,
    options: PaginationOptions,
}

impl PaginatedFetcher {
    pub fn new(fetcher: Arc<ApiFetcher>, options: PaginationOptions) -> Self {
        Self { fetcher, options }
    }

    /// Fetches every page of `query`, in page order.
    ///
    /// Any failed page fails the whole listing.
    pub async fn fetch_all(
        &self,
        query: &ListingQuery,
        progress: Option<&ProgressBar>,
    ) -> Result<Listing, FetchError> {
        let per_page = self.options.page_size.max(1);
        let batch_size = self.options.batch_size.max(1);
        let max_pages = self.options.max_pages.max(1);

        let mut pages: BTreeMap<u32, Vec<Record>> = BTreeMap::new();
        let (first, mut total_hint) = self.fetch_page(query, 1, per_page).await?;
        let mut done = is_short(&first, per_page);
        track(progress, &first, total_hint);
        pages.insert(1, first);

        let mut truncated = false;
        let mut next = 2;
        while !done {
            if next > max_pages {
                log::warn!(
                    "Reached maximum page limit ({}) for {}; remaining pages skipped",
                    max_pages,
                    query
                );
                truncated = true;
                break;
            }

            let end = batch_end(next, batch_size, last_page(total_hint, per_page), max_pages);
            let batch = try_join_all(
                (next..=end).map(|page| async move {
                    self.fetch_page(query, page, per_page)
                        .await
                        .map(|(records, hint)| (page, records, hint))
                }),
            )
            .await?;

            for (page, records, hint) in batch {
                done |= is_short(&records, per_page);
                total_hint = total_hint.or(hint);
                track(progress, &records, total_hint);
                pages.insert(page, records);
            }
            next = end + 1;
        }

        let pages_fetched = pages.len() as u32;
        let mut listing = assemble(pages, per_page, query.public_only);
        listing.pages_fetched = pages_fetched;
        listing.total_hint = total_hint;
        listing.truncated = truncated;

        log::info!(
            "Fetched {} records from {} in {} page(s)",
            listing.records.len(),
            query,
            pages_fetched
        );
        if listing.duplicates_dropped > 0 {
            log::debug!(
                "Dropped {} duplicate record(s) from {}",
                listing.duplicates_dropped,
                query
            );
        }
        Ok(listing)
    }

    async fn fetch_page(
        &self,
        query: &ListingQuery,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Record>, Option<u64>), FetchError> {
        self.fetcher
            .fetch_page(&query.page_request(page, per_page))
            .await
    }
}

fn is_short(records: &[Record], per_page: u32) -> bool {
    records.len() < per_page as usize
}

fn track(progress: Option<&ProgressBar>, records: &[Record], total_hint: Option<u64>) {
    if let Some(bar) = progress {
        if let Some(total) = total_hint {
            bar.set_length(total);
        }
        bar.inc(records.len() as u64);
    }
}

/// Last page predicted by the total-count header.
fn last_page(total_hint: Option<u64>, per_page: u32) -> Option<u32> {
    total_hint.map(|total| {
        let pages = total.div_ceil(u64::from(per_page));
        u32::try_from(pages).unwrap_or(u32::MAX)
    })
}

/// Last page number of the batch starting at `next`.
fn batch_end(next: u32, batch_size: u32, last_page: Option<u32>, max_pages: u32) -> u32 {
    let end = match last_page {
        Some(last) if next <= last => next.saturating_add(batch_size - 1).min(last),
        // Past the predicted end: one page at a time
        Some(_) => next,
        None => next.saturating_add(batch_size - 1),
    };
    end.min(max_pages)
}

/// Concatenates pages in order up to the first short page, then removes
/// duplicate ids (first occurrence wins) and, if asked, hidden records.
fn assemble(pages: BTreeMap<u32, Vec<Record>>, per_page: u32, public_only: bool) -> Listing {
    let mut listing = Listing::default();
    let mut seen: HashSet<RecordId> = HashSet::new();

    for (_, records) in pages {
        let short = is_short(&records, per_page);
        for record in records {
            if let Some(id) = record.id() {
                if !seen.insert(id) {
                    listing.duplicates_dropped += 1;
                    continue;
                }
            }
            if public_only && !record.is_public() {
                listing.hidden_dropped += 1;
                continue;
            }
            listing.records.push(record);
        }
        if short {
            break;
        }
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::StubTransport;
    use crate::error_recovery::RetryPolicy;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Pages of `sizes[page-1]` records with ids unique across pages.
    fn paged(sizes: &'static [usize]) -> impl Fn(u32) -> Value + Send + Sync {
        move |page| {
            let count = sizes.get(page as usize - 1).copied().unwrap_or(0);
            let base = (page as usize - 1) * 1000;
            Value::Array(
                (0..count)
                    .map(|i| json!({"o:id": base + i, "o:is_public": i % 10 != 0}))
                    .collect(),
            )
        }
    }

    fn pager(stub: Arc<StubTransport>, page_size: u32, batch_size: u32) -> PaginatedFetcher {
        let fetcher = ApiFetcher::new(stub)
            .with_rate_limiter(Arc::new(crate::api::RateLimiter::new(Duration::ZERO)))
            .with_retry_policy(RetryPolicy::default().with_max_attempts(1));
        PaginatedFetcher::new(
            Arc::new(fetcher),
            PaginationOptions {
                page_size,
                batch_size,
                max_pages: 1000,
            },
        )
    }

    #[test]
    fn test_batch_end_respects_hint_and_limits() {
        assert_eq!(batch_end(2, 5, None, 100), 6);
        assert_eq!(batch_end(2, 5, Some(3), 100), 3);
        assert_eq!(batch_end(4, 5, Some(3), 100), 4);
        assert_eq!(batch_end(2, 5, None, 4), 4);
        assert_eq!(last_page(Some(250), 100), Some(3));
        assert_eq!(last_page(Some(0), 100), Some(0));
    }

    #[tokio::test]
    async fn test_full_pages_then_empty_page_terminates() {
        let stub = Arc::new(StubTransport::paged(paged(&[10, 10, 10, 10])));
        let listing = pager(stub.clone(), 10, 1)
            .fetch_all(&ListingQuery::new("items"), None)
            .await
            .unwrap();

        // Four full pages, then one empty page
        assert_eq!(stub.calls(), 5);
        assert_eq!(listing.records.len(), 40);
        assert_eq!(listing.pages_fetched, 5);
        assert!(!listing.truncated);
    }

    #[tokio::test]
    async fn test_short_last_page_needs_three_requests() {
        let stub = Arc::new(StubTransport::paged(paged(&[100, 100, 50])));
        let listing = pager(stub.clone(), 100, 1)
            .fetch_all(&ListingQuery::items_of_class(49), None)
            .await
            .unwrap();

        assert_eq!(stub.calls(), 3);
        assert_eq!(listing.records.len(), 250);
    }

    #[tokio::test]
    async fn test_total_header_caps_the_batch() {
        let stub = Arc::new(StubTransport::paged(paged(&[100, 100, 50])).with_total_results(250));
        let listing = pager(stub.clone(), 100, 5)
            .fetch_all(&ListingQuery::items_of_class(49), None)
            .await
            .unwrap();

        assert_eq!(stub.calls(), 3);
        assert_eq!(listing.records.len(), 250);
        assert_eq!(listing.total_hint, Some(250));

        let mut pages: Vec<u32> = stub.requests().iter().filter_map(|r| r.page()).collect();
        pages.sort_unstable();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_batched_pages_keep_page_order() {
        let stub = Arc::new(StubTransport::paged(paged(&[5, 5, 5, 5, 5, 2])));
        let listing = pager(stub.clone(), 5, 3)
            .fetch_all(&ListingQuery::new("items"), None)
            .await
            .unwrap();

        let ids: Vec<u64> = listing
            .records
            .iter()
            .filter_map(|r| r.id().map(RecordId::get))
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(listing.records.len(), 27);
        // Page 1, then pages 2-4 and 5-7 in two batches
        assert_eq!(stub.calls(), 7);
    }

    #[tokio::test]
    async fn test_duplicates_and_hidden_records_are_dropped() {
        let stub = Arc::new(StubTransport::paged(|page| match page {
            1 => json!([{"o:id": 1}, {"o:id": 2, "o:is_public": false}]),
            2 => json!([{"o:id": 1}]),
            _ => json!([]),
        }));
        let listing = pager(stub, 2, 1)
            .fetch_all(&ListingQuery::new("media").public_only(), None)
            .await
            .unwrap();

        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.duplicates_dropped, 1);
        assert_eq!(listing.hidden_dropped, 1);
    }

    #[tokio::test]
    async fn test_max_pages_truncates() {
        let stub = Arc::new(StubTransport::paged(|_| json!([{"o:id": 1}])));
        let fetcher = ApiFetcher::new(stub.clone())
            .with_rate_limiter(Arc::new(crate::api::RateLimiter::new(Duration::ZERO)));
        let pager = PaginatedFetcher::new(
            Arc::new(fetcher),
            PaginationOptions {
                page_size: 1,
                batch_size: 2,
                max_pages: 3,
            },
        );
        let listing = pager
            .fetch_all(&ListingQuery::new("items"), None)
            .await
            .unwrap();

        assert!(listing.truncated);
        assert_eq!(stub.calls(), 3);
        assert_eq!(listing.pages_fetched, 3);
    }

    #[tokio::test]
    async fn test_failed_page_fails_listing() {
        let stub = Arc::new(StubTransport::new(|request| match request.page() {
            Some(2) => Err(FetchError::from_status("items?page=2", 404)),
            _ => Ok(Value::Array(vec![json!({"o:id": 1}); 2])),
        }));
        let err = pager(stub, 2, 1)
            .fetch_all(&ListingQuery::new("items"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Rejected { status: 404, .. }));
    }
}
